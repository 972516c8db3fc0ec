//! MockCAS server - CAS 1.0/3.0 protocol over HTTP
//!
//! The routes here are thin adapters: they pull parameters and the TGT cookie
//! out of the request, call [`auth_ticket::TicketAuthority`], and encode the
//! answer the way CAS clients expect it. A small demo client under `/app`
//! exercises the full redirect, validate and single logout cycle against
//! this same process.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::*;
pub use error::*;
pub use state::AppState;

use axum::{middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(state)
}
