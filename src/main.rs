use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cuecard::app;
use cuecard::common::{BridgeConfig, CliOverrides};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cuecard")]
#[command(about = "Remote control for LibreOffice Impress slideshows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Address the control server listens on
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,

    /// UNO URL of the office automation endpoint
    #[arg(long, global = true)]
    office_url: Option<String>,

    /// Program used to start the office
    #[arg(long, global = true)]
    office_binary: Option<String>,

    /// trace, debug, info, warn or error (RUST_LOG wins when set)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Do not print the QR code of the control URL
    #[arg(long, global = true)]
    no_qr: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a presentation in LibreOffice, start the slideshow and serve
    Launch {
        #[arg(help = "Presentation file to open")]
        file: PathBuf,
    },

    /// Serve against a LibreOffice that is already presenting
    Serve,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind: self.bind,
            office_url: self.office_url.clone(),
            office_binary: self.office_binary.clone(),
            log_level: self.log_level.clone(),
            show_qr: self.no_qr.then_some(false),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = BridgeConfig::load(&cli.overrides()).context("Invalid configuration")?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Launch { file } => app::launch(&config, &file)
            .await
            .with_context(|| format!("Failed to present {}", file.display())),
        Commands::Serve => app::attach(&config)
            .await
            .context("Failed to attach to the running office"),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cuecard={level},tower_http=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
