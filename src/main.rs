use dotenvy::dotenv;
use axum::{
    routing::{get, post},
    Router,
    middleware
};
use chrono_tz::Tz;
use dashmap::DashMap;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use governor::{RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, AllowOrigin};
use tower_http::services::ServeDir;
use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnResponse};
use tracing::Level;
mod handlers {
    pub mod auth_middleware;
    pub mod auth_dtos;
    pub mod auth_handlers;
    pub mod lead_handlers;
    pub mod admin_handlers;
}
mod utils {
    pub mod countdown;
    pub mod lead_stats;
}
mod api {
    pub mod brevo;
}
mod models {
    pub mod lead_models;
}
mod repositories {
    pub mod lead_repository;
    pub mod admin_core;
}
mod schema;
use api::brevo::BrevoClient;
use handlers::{admin_handlers, auth_handlers, lead_handlers};
use repositories::admin_core::AdminCore;
use repositories::lead_repository::LeadRepository;
use utils::countdown::{self, CountdownClock};
pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

async fn health_check() -> &'static str {
    "OK"
}
pub struct AppState {
    lead_repository: Arc<LeadRepository>,
    admin_core: Arc<AdminCore>,
    brevo: BrevoClient,
    countdown: CountdownClock,
    dashboard_tz: Tz,
    login_limiter: DashMap<String, RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>,
}
pub fn validate_env() {
    let required_vars = [
        "JWT_SECRET_KEY", "DATABASE_URL", "FRONTEND_URL",
        "COUNTDOWN_TARGET", "ENVIRONMENT",
    ];
    for var in required_vars.iter() {
        std::env::var(var).expect(&format!("{} must be set", var));
    }
}
#[tokio::main]
async fn main() {
    dotenv().ok();
    let _guard = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((dsn, sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        }))
    });
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shoc_backend=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in environment");
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .build(manager)
        .expect("Failed to create pool");
    {
        let mut conn = pool.get().expect("Failed to get DB connection");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Failed to run migrations");
    }
    // the welcome trigger validates its own config per send; warn early so a
    // broken deploy is visible before the first signup
    if let Err(e) = api::brevo::BrevoConfig::from_env() {
        tracing::warn!("Welcome email trigger not configured: {}", e);
    }
    let dashboard_tz: Tz = std::env::var("DASHBOARD_TIMEZONE")
        .unwrap_or_else(|_| "America/Argentina/Buenos_Aires".to_string())
        .parse()
        .expect("Invalid DASHBOARD_TIMEZONE");
    let state = Arc::new(AppState {
        lead_repository: Arc::new(LeadRepository::new(pool.clone())),
        admin_core: Arc::new(AdminCore::new(pool)),
        brevo: BrevoClient::new(),
        countdown: CountdownClock::from_env(),
        dashboard_tz,
        login_limiter: DashMap::new(),
    });
    // Public routes that don't need authentication. login is ratelimited though
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/leads", post(lead_handlers::submit_lead))
        .route("/api/analytics/event", post(lead_handlers::track_event))
        .route("/api/countdown", get(lead_handlers::countdown_status))
        .route("/api/login", post(auth_handlers::login));
    // Dashboard routes that need an allow-listed admin
    let admin_routes = Router::new()
        .route("/api/admin/leads", get(admin_handlers::get_leads))
        .route("/api/admin/leads/export", get(admin_handlers::export_leads))
        .route("/api/admin/stats", get(admin_handlers::get_stats))
        .route("/api/admin/profile", get(auth_handlers::get_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), handlers::auth_middleware::require_admin));
    let app = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // landing, auth and dashboard pages are static client-side routes
        .fallback_service(ServeDir::new("static"))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
        )
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
                .allow_origin(AllowOrigin::exact(std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()).parse().expect("Invalid FRONTEND_URL")))
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                ])
                .expose_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::CONTENT_DISPOSITION,
                ])
                .allow_credentials(true)
        )
        .with_state(state.clone());
    tokio::spawn(countdown::run_ticker(state.countdown, || {
        tracing::info!("Registration countdown reached zero");
    }));
    use tokio::net::TcpListener;
    let port = match std::env::var("ENVIRONMENT").as_deref() {
        Ok("staging") => 3100,
        _ => 3000,
    };
    validate_env();
    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await.unwrap();
    axum::serve(listener, app.into_make_service()).await.unwrap();
}
