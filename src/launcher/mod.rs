//! Launch sequencing: start the office, wait for its automation endpoint and
//! the document, start the show, then hand the live session to the server.

mod process;

pub use process::{OfficeProcess, SofficeProcess};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::automation::{BridgeError, Connector, ObjectRef, OfficeSession};
use crate::bridge::negotiator::{self, Negotiated, SessionError};
use crate::common::BridgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Idle,
    ApplicationLaunching,
    AwaitingEndpoint,
    DocumentStarting,
    PresentationStarting,
    HandoffToServer,
    Aborted,
}

impl LaunchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchPhase::HandoffToServer | LaunchPhase::Aborted)
    }
}

impl fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LaunchPhase::Idle => "Idle",
            LaunchPhase::ApplicationLaunching => "Launching LibreOffice",
            LaunchPhase::AwaitingEndpoint => "Waiting for the automation port",
            LaunchPhase::DocumentStarting => "Waiting for the document to load",
            LaunchPhase::PresentationStarting => "Starting the slideshow",
            LaunchPhase::HandoffToServer => "Slideshow running",
            LaunchPhase::Aborted => "Launch aborted",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not connect to {endpoint} after {attempts} attempts")]
    EndpointTimeout { endpoint: String, attempts: u32 },

    #[error("No document was loaded within {0:?}")]
    DocumentTimeout(Duration),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{step} failed: {detail}")]
    Automation { step: &'static str, detail: String },
}

/// Polling bounds of the launch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchSettings {
    pub endpoint_attempts: u32,
    pub endpoint_interval: Duration,
    pub document_timeout: Duration,
    pub document_interval: Duration,
}

impl From<&BridgeConfig> for LaunchSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            endpoint_attempts: config.endpoint_attempts,
            endpoint_interval: Duration::from_millis(config.endpoint_interval_ms),
            document_timeout: Duration::from_millis(config.document_timeout_ms),
            document_interval: Duration::from_millis(config.document_interval_ms),
        }
    }
}

pub struct Launcher {
    connector: Arc<dyn Connector>,
    process: Arc<dyn OfficeProcess>,
    accept: String,
    settings: LaunchSettings,
    phase: watch::Sender<LaunchPhase>,
}

impl Launcher {
    /// `accept` is the office's `--accept` descriptor for the connector's endpoint
    pub fn new(
        connector: Arc<dyn Connector>,
        process: Arc<dyn OfficeProcess>,
        accept: impl Into<String>,
        settings: LaunchSettings,
    ) -> Self {
        let (phase, _) = watch::channel(LaunchPhase::Idle);
        Self {
            connector,
            process,
            accept: accept.into(),
            settings,
            phase,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LaunchPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> LaunchPhase {
        *self.phase.borrow()
    }

    /// Run the whole sequence. On success the slideshow is running and the
    /// session that started it is returned for the server phase.
    pub async fn run(&self, document: &Path) -> Result<Negotiated, LaunchError> {
        let result = self.sequence(document).await;
        match &result {
            Ok(_) => self.enter(LaunchPhase::HandoffToServer),
            Err(err) => {
                tracing::error!(phase = ?self.phase(), error = %err, "launch aborted");
                self.enter(LaunchPhase::Aborted);
            }
        }
        result
    }

    async fn sequence(&self, document: &Path) -> Result<Negotiated, LaunchError> {
        self.enter(LaunchPhase::ApplicationLaunching);
        let path = tokio::fs::canonicalize(document)
            .await
            .map_err(|_| LaunchError::DocumentNotFound(document.to_path_buf()))?;
        if !path.is_file() {
            return Err(LaunchError::DocumentNotFound(path));
        }

        // best effort, a failure shows up later as a busy port
        let killed = self.process.terminate_stale();
        if killed > 0 {
            tracing::info!(killed, "terminated stale office instances");
        }

        self.process
            .spawn(&self.accept, &path)
            .map_err(|source| LaunchError::Spawn {
                binary: self.process.program().to_string(),
                source,
            })?;
        tracing::info!(document = %path.display(), "office launched");

        self.enter(LaunchPhase::AwaitingEndpoint);
        let session = self.await_endpoint().await?;

        self.enter(LaunchPhase::DocumentStarting);
        let (session, document) = self.await_document(session).await?;
        let mut negotiated = negotiator::classify(session, document).await?;

        self.enter(LaunchPhase::PresentationStarting);
        let presentation = negotiated
            .session
            .presentation(&negotiated.document)
            .await
            .map_err(|err| automation("get_presentation", err))?;
        negotiated
            .session
            .start_presentation(&presentation)
            .await
            .map_err(|err| automation("start_presentation", err))?;
        tracing::info!(
            title = negotiated.title.as_deref().unwrap_or("<untitled>"),
            "slideshow started"
        );

        Ok(negotiated)
    }

    async fn await_endpoint(&self) -> Result<Box<dyn OfficeSession>, LaunchError> {
        let attempts = self.settings.endpoint_attempts;
        for attempt in 1..=attempts {
            match negotiator::open(self.connector.as_ref()).await {
                Ok(session) => {
                    tracing::debug!(attempt, "automation endpoint is up");
                    return Ok(session);
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "automation endpoint not ready");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.endpoint_interval).await;
            }
        }

        Err(LaunchError::EndpointTimeout {
            endpoint: self.connector.endpoint(),
            attempts,
        })
    }

    async fn await_document(
        &self,
        mut session: Box<dyn OfficeSession>,
    ) -> Result<(Box<dyn OfficeSession>, ObjectRef), LaunchError> {
        let desktop = session
            .desktop()
            .await
            .map_err(|err| automation("desktop", err))?;

        let interval = self.settings.document_interval;
        let poll = async {
            loop {
                match session.current_component(&desktop).await {
                    Ok(Some(document)) => return Ok(document),
                    Ok(None) => tokio::time::sleep(interval).await,
                    Err(err) => return Err(automation("current_component", err)),
                }
            }
        };

        let limit = self.settings.document_timeout;
        let document = tokio::time::timeout(limit, poll)
            .await
            .map_err(|_| LaunchError::DocumentTimeout(limit))??;
        Ok((session, document))
    }

    fn enter(&self, phase: LaunchPhase) {
        tracing::debug!(%phase, "launch phase");
        self.phase.send_replace(phase);
    }
}

fn automation(step: &'static str, err: BridgeError) -> LaunchError {
    LaunchError::Automation {
        step,
        detail: err.to_string(),
    }
}
