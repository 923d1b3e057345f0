use thiserror::Error;

use crate::automation::{BridgeError, Connector, DocumentKind, ObjectRef, OfficeSession};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Automation endpoint {0} is unreachable")]
    EndpointUnreachable(String),

    #[error("No document is loaded")]
    NoCurrentDocument,

    #[error("The current document is not a presentation")]
    NotAPresentationDocument,

    #[error("Unexpected automation fault: {0}")]
    UnexpectedFault(String),
}

/// A live session together with the presentation document it resolved to
pub struct Negotiated {
    pub session: Box<dyn OfficeSession>,
    pub document: ObjectRef,
    pub title: Option<String>,
}

impl std::fmt::Debug for Negotiated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiated")
            .field("document", &self.document)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// connect -> desktop -> current document -> presentation check
pub async fn negotiate(connector: &dyn Connector) -> Result<Negotiated, SessionError> {
    let session = open(connector).await?;
    current_document(session).await
}

/// Connect and resolve the remote context and service manager only.
pub async fn open(connector: &dyn Connector) -> Result<Box<dyn OfficeSession>, SessionError> {
    let endpoint = connector.endpoint();
    match connector.connect().await {
        Ok(session) => {
            tracing::debug!(step = "connect", %endpoint, "resolved service manager");
            Ok(session)
        }
        Err(err) if err.is_unreachable() => {
            tracing::debug!(step = "connect", %endpoint, error = %err, "endpoint unreachable");
            Err(SessionError::EndpointUnreachable(endpoint))
        }
        Err(err) => Err(fault("connect", err)),
    }
}

/// Resolve the desktop's current component and check that it is a presentation.
pub async fn current_document(
    mut session: Box<dyn OfficeSession>,
) -> Result<Negotiated, SessionError> {
    let desktop = session
        .desktop()
        .await
        .map_err(|err| fault("desktop", err))?;
    tracing::debug!(step = "desktop", %desktop, "created desktop");

    let document = session
        .current_component(&desktop)
        .await
        .map_err(|err| fault("current_component", err))?
        .ok_or_else(|| {
            tracing::debug!(step = "current_component", "desktop has no current document");
            SessionError::NoCurrentDocument
        })?;

    classify(session, document).await
}

/// Capability check plus best-effort title lookup
pub async fn classify(
    mut session: Box<dyn OfficeSession>,
    document: ObjectRef,
) -> Result<Negotiated, SessionError> {
    // title is diagnostic only
    let title = match session.title(&document).await {
        Ok(title) => title,
        Err(err) => {
            tracing::debug!(step = "title", error = %err, "could not read document title");
            None
        }
    };
    let shown = title.as_deref().unwrap_or("<untitled>");

    let kind = session
        .document_kind(&document)
        .await
        .map_err(|err| fault("supports_service", err))?;
    if kind != DocumentKind::Presentation {
        tracing::debug!(step = "supports_service", title = shown, "document is not a presentation");
        return Err(SessionError::NotAPresentationDocument);
    }
    tracing::debug!(step = "supports_service", title = shown, "document is a presentation");

    Ok(Negotiated {
        session,
        document,
        title,
    })
}

fn fault(step: &'static str, err: BridgeError) -> SessionError {
    tracing::warn!(step, error = %err, "automation call failed");
    SessionError::UnexpectedFault(format!("{step}: {err}"))
}
