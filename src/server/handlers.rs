use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::state::AppState;
use crate::bridge::{controller, CommandOutcome, ControlCommand, ControlError, SlideNotesCache};
use crate::common::AppError;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SlideIndexResponse {
    pub slide_index: i32,
}

pub async fn next_slide(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    run(&state, ControlCommand::Next).await?;
    Ok(Json(StatusResponse {
        status: "advanced to next",
    }))
}

pub async fn previous_slide(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, AppError> {
    run(&state, ControlCommand::Previous).await?;
    Ok(Json(StatusResponse {
        status: "returned to previous",
    }))
}

pub async fn current_slide(
    State(state): State<AppState>,
) -> Result<Json<SlideIndexResponse>, AppError> {
    match run(&state, ControlCommand::GetIndex).await? {
        CommandOutcome::SlideIndex(slide_index) => Ok(Json(SlideIndexResponse { slide_index })),
        other => Err(AppError::SlideshowUnavailable(ControlError::Fault {
            step: "get_current_slide_index",
            detail: format!("unexpected outcome {other:?}"),
        })),
    }
}

/// Served from the startup cache, never touches the office
pub async fn all_notes(State(state): State<AppState>) -> Json<SlideNotesCache> {
    Json(state.notes.clone())
}

// fresh session per request, bounded as a whole
async fn run(state: &AppState, command: ControlCommand) -> Result<CommandOutcome, AppError> {
    let limit = state.request_timeout;
    let outcome = tokio::time::timeout(limit, controller::execute(state.office.as_ref(), command))
        .await
        .map_err(|_| AppError::RequestTimeout(limit))??;
    Ok(outcome)
}
