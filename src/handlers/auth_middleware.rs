use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use std::sync::Arc;

use crate::handlers::auth_dtos::Claims;
use crate::AppState;

/// An authenticated dashboard operator. Extraction fails unless the token
/// is valid AND the subject is still present in the admin allow-list, so a
/// removed operator is locked out on their next request.
#[derive(Clone)]
pub struct AuthUser {
    pub admin_id: i32,
    pub email: String,
    pub role: String,
}

#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        let token = auth_header.ok_or(AuthError {
            status: StatusCode::UNAUTHORIZED,
            message: "No authorization token provided".to_string(),
        })?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(
                std::env::var("JWT_SECRET_KEY")
                    .expect("JWT_SECRET_KEY must be set in environment")
                    .as_bytes(),
            ),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AuthError {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid token".to_string(),
        })?
        .claims;

        let admin = state
            .admin_core
            .find_by_id(claims.sub)
            .map_err(|_| AuthError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Failed to check admin status".to_string(),
            })?
            .ok_or(AuthError {
                status: StatusCode::FORBIDDEN,
                message: "Not an authorized admin account".to_string(),
            })?;

        Ok(AuthUser {
            admin_id: admin.id,
            email: admin.email,
            role: admin.role,
        })
    }
}

// Middleware for the dashboard routes: resolving AuthUser is the gate
pub async fn require_admin(
    State(_state): State<Arc<AppState>>,
    _auth_user: AuthUser,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    Ok(next.run(request).await)
}
