pub mod app;
pub mod cas;
pub mod health;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 302 Found, which is what CAS clients expect for every redirect
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
