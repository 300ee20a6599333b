//! Error type returned by the HTTP handlers
//!
//! Every failure is rendered in the same envelope the dashboard reads:
//! `{"success": false, "message": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected input, shown to the user as-is
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ClienteNotFound(_) => ApiError::NotFound("Cliente no encontrado".into()),
            StoreError::CanjeNotFound(_) => ApiError::NotFound("Canje no encontrado".into()),
            StoreError::DuplicateCedula(cedula) => {
                ApiError::Conflict(format!("Ya existe un cliente con la cédula {}", cedula))
            }
            StoreError::ClienteHasCanjes(_) => ApiError::Conflict(
                "No se puede eliminar un cliente con canjes registrados".into(),
            ),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
