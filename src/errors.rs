use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::error::Error;
use std::fmt;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ServerError(String),

    Any(u16, String),

    Sqlx(sqlx::Error),

    Anyhow(anyhow::Error),
}

impl ApiError {
    fn code(&self) -> StatusCode {
        use ApiError::*;

        match self {
            BadRequest(_) => StatusCode::BAD_REQUEST,
            Any(code, _) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ServerError(_) | Sqlx(_) | Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // What the caller is allowed to see; internal causes stay in the logs.
    fn message(&self) -> String {
        use ApiError::*;

        match self {
            BadRequest(msg) | ServerError(msg) | Any(_, msg) => msg.clone(),
            Sqlx(_) | Anyhow(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;

        match &self {
            Sqlx(error) => tracing::error!("sqlx error: {:?}", error),
            Anyhow(error) => tracing::error!("generic error: {:?}", error),
            ServerError(msg) => tracing::error!("request failed: {}", msg),
            BadRequest(_) | Any(_, _) => {}
        }

        (
            self.code(),
            Json(ErrorMessage {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Sqlx(err) => Some(err),
            ApiError::Anyhow(err) => err.source(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Sqlx(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Anyhow(err)
    }
}

pub fn bad_request(msg: &str) -> ApiError {
    ApiError::BadRequest(msg.to_string())
}

pub fn server_error(msg: &str) -> ApiError {
    ApiError::ServerError(msg.to_string())
}

pub fn any_error(code: u16, msg: &str) -> ApiError {
    ApiError::Any(code, msg.to_string())
}
