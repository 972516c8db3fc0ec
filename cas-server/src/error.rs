use auth_ticket::AuthorityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Error body returned by the non-protocol endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    pub error_type: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Authentication { message: String },

    #[error("{message}")]
    Authorization { message: String },

    #[error("not implemented")]
    NotImplemented,

    #[error("{message}")]
    Network { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ApiError::Network { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotImplemented => "not_implemented",
            ApiError::Network { .. } => "network_error",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl From<AuthorityError> for ApiError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::InvalidCredentials => ApiError::Authentication {
                message: "invalid username or password".to_string(),
            },
            AuthorityError::UnauthorizedService(_) => ApiError::Authorization {
                message: "unauthorized service".to_string(),
            },
            AuthorityError::InvalidTicket => ApiError::bad_request("invalid ticket"),
            AuthorityError::Directory(e) => {
                error!(error = %e, "User directory error");
                ApiError::internal("user directory unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "Request rejected"
            );
        }

        let body = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_identity::IdentityError;

    #[test]
    fn test_authority_error_statuses() {
        let cases = [
            (AuthorityError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthorityError::UnauthorizedService("ftp://x".to_string()), StatusCode::FORBIDDEN),
            (AuthorityError::InvalidTicket, StatusCode::BAD_REQUEST),
            (
                AuthorityError::Directory(IdentityError::Backend("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_response_carries_error_id() {
        let response = ApiError::bad_request("ticket or service is empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
