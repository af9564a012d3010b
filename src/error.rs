use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::common::ApiResponse;
use crate::services::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("payment gateway request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    /// Message sent to the client. Gateway and store details stay in the
    /// logs unless this is a debug build.
    fn public_message(&self) -> String {
        match self {
            AppError::Gateway(_) => "Failed to create payment order".to_string(),
            AppError::Internal(e) if cfg!(debug_assertions) => e.to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join(", "))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::Gateway(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Internal(e) => log::error!("internal error: {:#}", e),
            AppError::Gateway(e) => log::error!("gateway error: {}", e),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(ApiResponse::error(self.public_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::not_found("Class").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Gateway(GatewayError::Rejected { status: 502, body: "down".into() }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("db")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_gateway_details_are_not_exposed() {
        let err = AppError::Gateway(GatewayError::Rejected { status: 401, body: "bad key rzp_live".into() });
        assert_eq!(err.public_message(), "Failed to create payment order");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("Class").to_string(), "Class not found");
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let request = crate::models::user::LoginRequest {
            email: "nope".to_string(),
            password: String::new(),
        };
        let err: AppError = request.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Invalid email format, Password is required");
    }
}
