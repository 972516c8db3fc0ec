use crate::{
    handlers::{app, cas, health},
    state::AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// CAS protocol endpoints
pub fn cas_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(cas::login_page).post(cas::login_submit))
        .route("/logout", get(cas::logout))
        .route("/validate", get(cas::validate))
        .route("/p3/serviceValidate", get(cas::service_validate))
        .route("/p3/proxyValidate", get(cas::proxy_validate))
}

/// Demo CAS client
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(app::login))
        .route("/validate", get(app::validate))
        .route("/logout", get(app::logout))
        .route("/slo", post(app::single_logout))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .nest("/cas", cas_routes())
        .nest("/app", app_routes())
}
