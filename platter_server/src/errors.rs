use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use platter_engine::{traits::CacheError, ErrorKind, IdentityMergeError, OrderFlowError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("{0}")]
    IdentityMerge(#[from] IdentityMergeError),
    #[error("{0}")]
    Cache(#[from] CacheError),
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => ErrorKind::InvalidInput,
            Self::AuthenticationError(_) => ErrorKind::Unauthorized,
            Self::OrderFlow(e) => e.kind(),
            Self::IdentityMerge(e) => e.kind(),
            Self::InitializeError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) |
            Self::Cache(_) => ErrorKind::Internal,
        }
    }
}

/// The body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::OutOfServiceWindow => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        status_for_kind(self.kind())
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                error!("💻️ Internal error while handling request. {self}");
                "An internal error occurred. Please try again later.".to_string()
            },
            _ => self.to_string(),
        };
        let body = ErrorResponse { error: kind, message };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).json(body)
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("The x-guest-client-id header is missing or empty.")]
    MissingGuestId,
}
