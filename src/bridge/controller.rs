use thiserror::Error;

use super::negotiator::{self, Negotiated, SessionError};
use crate::automation::{BridgeError, Connector, ObjectRef, OfficeSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Next,
    Previous,
    GetIndex,
}

impl ControlCommand {
    fn step(self) -> &'static str {
        match self {
            ControlCommand::Next => "goto_next_effect",
            ControlCommand::Previous => "goto_previous_effect",
            ControlCommand::GetIndex => "get_current_slide_index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Advanced,
    Retreated,
    SlideIndex(i32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("No slideshow is running")]
    NoActiveShow,

    #[error("Controller call {step} failed: {detail}")]
    Fault { step: &'static str, detail: String },
}

/// Live show controller of a negotiated document; `NoActiveShow` when the
/// document is not being presented.
pub async fn show_controller(negotiated: &mut Negotiated) -> Result<ObjectRef, ControlError> {
    let session = negotiated.session.as_mut();
    let presentation = session
        .presentation(&negotiated.document)
        .await
        .map_err(|err| fault("get_presentation", err))?;

    match session.controller(&presentation).await {
        Ok(Some(controller)) => Ok(controller),
        Ok(None) => {
            tracing::debug!(step = "get_controller", "presentation has no running show");
            Err(ControlError::NoActiveShow)
        }
        Err(err) => Err(fault("get_controller", err)),
    }
}

pub async fn dispatch(
    session: &mut dyn OfficeSession,
    controller: &ObjectRef,
    command: ControlCommand,
) -> Result<CommandOutcome, ControlError> {
    let result = match command {
        ControlCommand::Next => session
            .goto_next_effect(controller)
            .await
            .map(|()| CommandOutcome::Advanced),
        ControlCommand::Previous => session
            .goto_previous_effect(controller)
            .await
            .map(|()| CommandOutcome::Retreated),
        ControlCommand::GetIndex => session
            .current_slide_index(controller)
            .await
            .map(CommandOutcome::SlideIndex),
    };
    result.map_err(|err| fault(command.step(), err))
}

/// Negotiate a fresh session, find the controller and run one command.
/// The session is dropped on return.
pub async fn execute(
    connector: &dyn Connector,
    command: ControlCommand,
) -> Result<CommandOutcome, ControlError> {
    let mut negotiated = negotiator::negotiate(connector).await?;
    let controller = show_controller(&mut negotiated).await?;
    let outcome = dispatch(negotiated.session.as_mut(), &controller, command).await?;
    tracing::debug!(?command, ?outcome, "command executed");
    Ok(outcome)
}

fn fault(step: &'static str, err: BridgeError) -> ControlError {
    tracing::warn!(step, error = %err, "controller call failed");
    ControlError::Fault {
        step,
        detail: err.to_string(),
    }
}
