//! Request error taxonomy and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::providers::completion::CompletionError;
use crate::providers::valyu::ResearchError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0} is missing. Set it in the environment before using this endpoint.")]
    MissingCredential(&'static str),
    #[error("No user question provided.")]
    MissingQuestion,
    #[error(transparent)]
    Research(#[from] ResearchError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("{0}")]
    ResearchFailed(String),
}

impl ChatError {
    fn status(&self) -> StatusCode {
        match self {
            ChatError::MissingQuestion => StatusCode::BAD_REQUEST,
            ChatError::Research(ResearchError::Auth) => StatusCode::BAD_GATEWAY,
            ChatError::Completion(CompletionError::Auth) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
