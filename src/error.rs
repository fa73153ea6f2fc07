use std::{io, path::PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),
    #[error("template data must serialize to an object")]
    NotAnObject,
    #[error("template references unknown field {0:?}")]
    MissingField(String),
    #[error("failed to serialize template data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {self}");

        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
