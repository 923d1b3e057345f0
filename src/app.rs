//! The two entry flows: launch-then-serve and attach-then-serve.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::automation::{Connector, LibreOffice};
use crate::bridge::negotiator::{self, Negotiated, SessionError};
use crate::bridge::SlideNotesCache;
use crate::common::{BridgeConfig, ConfigError};
use crate::launcher::{LaunchError, LaunchSettings, Launcher, SofficeProcess};
use crate::server::{self, AppState, ServerError};
use crate::ui::output;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Cannot read the presentation: {0}")]
    Presentation(#[from] SessionError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

pub fn connector(config: &BridgeConfig) -> Result<Arc<LibreOffice>, ConfigError> {
    Ok(Arc::new(LibreOffice::new(
        config.office_url()?,
        config.connect_timeout(),
        config.call_timeout(),
    )))
}

/// Start the office on `document`, start the show and serve from the same
/// session.
pub async fn launch(config: &BridgeConfig, document: &Path) -> Result<(), StartupError> {
    let office = connector(config)?;
    let process = Arc::new(SofficeProcess::new(
        config.office_binary.clone(),
        config.stale_process.clone(),
    ));

    let launcher = Launcher::new(
        office.clone(),
        process,
        office.url().accept_descriptor(),
        LaunchSettings::from(config),
    );
    let progress = output::track_launch(launcher.subscribe());
    let result = launcher.run(document).await;
    // let the spinner draw its final line
    let _ = progress.await;

    let negotiated = result?;
    serve_negotiated(config, office, negotiated).await
}

/// Attach to an office that is already running a presentation.
pub async fn attach(config: &BridgeConfig) -> Result<(), StartupError> {
    let office = connector(config)?;
    let negotiated = negotiator::negotiate(office.as_ref()).await?;
    serve_negotiated(config, office, negotiated).await
}

async fn serve_negotiated(
    config: &BridgeConfig,
    office: Arc<LibreOffice>,
    mut negotiated: Negotiated,
) -> Result<(), StartupError> {
    let notes = SlideNotesCache::build(&mut negotiated).await?;
    // handlers open their own sessions
    drop(negotiated);

    let office: Arc<dyn Connector> = office;
    let state = AppState::new(notes, office, config.request_timeout());
    server::start_server(config.bind, state, config.show_qr).await?;
    Ok(())
}
