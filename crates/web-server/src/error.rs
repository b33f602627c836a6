use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with. The `IntoResponse` impl below is
/// the single place where failures become HTTP responses: handlers return
/// `Result<_, ApiError>` and never build error responses themselves, so
/// each request gets exactly one classified response no matter where in
/// the handler's future the failure happened.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Token is missing.")]
    TokenMissing,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ApiError {
    /// Pure status/message classification, delegating database failures
    /// to [`DbError::classify`].
    pub fn classify(&self) -> (u16, String) {
        match self {
            ApiError::TokenMissing => (400, "Token is missing.".to_string()),
            ApiError::InvalidToken => (401, "Invalid token.".to_string()),
            ApiError::InvalidCredentials => (401, "Invalid username or password.".to_string()),
            ApiError::Db(db_err) => db_err.classify(),
        }
    }
}

/// Converts our custom `ApiError` into an HTTP response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();
        if status >= 500 {
            tracing::error!(error = ?self, "Request failed.");
        }
        let status =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": message }))).into_response()
    }
}
