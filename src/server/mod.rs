pub mod handlers;
pub mod routes;
pub mod state;

pub use state::AppState;

use std::io;
use std::net::{SocketAddr, UdpSocket};

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;

use crate::ui::output;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] io::Error),
}

/// Serve the control surface until Ctrl-C.
pub async fn start_server(
    bind: SocketAddr,
    state: AppState,
    show_qr: bool,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind { addr: bind, source })?;
    let local_addr = listener.local_addr()?;

    let host = if local_addr.ip().is_unspecified() {
        get_local_ip().unwrap_or_else(|| "127.0.0.1".to_string())
    } else {
        local_addr.ip().to_string()
    };
    let url = format!("http://{}:{}", host, local_addr.port());

    tracing::info!(%local_addr, slides = state.notes.len(), "control server listening");
    output::print_banner(&url, state.notes.len(), show_qr);

    let app = routes::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("control server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn get_local_ip() -> Option<String> {
    // Connect to external address to determine local ip
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}
