use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use governor::{Quota, RateLimiter};
use jsonwebtoken::{encode, EncodingKey, Header};
use nonzero_ext::nonzero;
use serde_json::json;

use crate::handlers::auth_dtos::{AdminResponse, LoginRequest};
use crate::handlers::auth_middleware::AuthUser;
use crate::AppState;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(login_req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    println!("Login attempt for email: {}", login_req.email);

    // 5 attempts per minute per email
    let quota = Quota::per_minute(nonzero!(5u32));
    let limiter_key = login_req.email.clone();

    let entry = state
        .login_limiter
        .entry(limiter_key.clone())
        .or_insert_with(|| RateLimiter::keyed(quota));
    let limiter = entry.value();

    if limiter.check_key(&limiter_key).is_err() {
        println!("Rate limit exceeded for email: [redacted]");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Too many login attempts, try again later"})),
        ));
    }

    let admin = match state.admin_core.find_by_email(&login_req.email) {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            ));
        }
        Err(e) => {
            tracing::error!("Database error while fetching admin: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Database error"})),
            ));
        }
    };

    match bcrypt::verify(&login_req.password, &admin.password_hash) {
        Ok(true) => {
            let token = generate_access_token(admin.id)?;
            Ok(Json(json!({"message": "Login successful", "token": token})))
        }
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )),
    }
}

pub fn generate_access_token(
    admin_id: i32,
) -> Result<String, (StatusCode, Json<serde_json::Value>)> {
    encode(
        &Header::default(),
        &json!({
            "sub": admin_id,
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
            "type": "access"
        }),
        &EncodingKey::from_secret(
            std::env::var("JWT_SECRET_KEY")
                .expect("JWT_SECRET_KEY must be set in environment")
                .as_bytes(),
        ),
    )
    .map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Token generation failed"})),
        )
    })
}

/// Who the dashboard is signed in as, for the header display.
pub async fn get_profile(auth_user: AuthUser) -> Json<AdminResponse> {
    Json(AdminResponse {
        email: auth_user.email,
        role: auth_user.role,
    })
}
