use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as AxumJson, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::bridge::ControlError;

pub const NOT_RUNNING_DETAIL: &str = "Slideshow not running or not found.";

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    /// Every bridge failure looks the same to the remote
    #[error("Slideshow unavailable: {0}")]
    SlideshowUnavailable(#[from] ControlError),

    #[error("Automation did not answer within {0:?}")]
    RequestTimeout(std::time::Duration),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::SlideshowUnavailable(ControlError::NoActiveShow) => {
                tracing::debug!("no running slideshow");
            }
            AppError::SlideshowUnavailable(err) => {
                tracing::warn!(error = %err, "control request failed");
            }
            AppError::RequestTimeout(limit) => {
                tracing::warn!(?limit, "control request timed out");
            }
        }

        let body = AxumJson(json!({ "detail": NOT_RUNNING_DETAIL }));
        (StatusCode::NOT_FOUND, body).into_response()
    }
}
