//! Terminal output: launch spinner and the startup banner.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::launcher::LaunchPhase;
use crate::qr;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(spinner_style.tick_chars(SPINNER_CHARS));
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Mirror launch phases on a spinner until a terminal phase is reached
pub fn track_launch(mut phases: watch::Receiver<LaunchPhase>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = create_spinner();
        loop {
            let phase = *phases.borrow_and_update();
            if phase.is_terminal() {
                let mark = if phase == LaunchPhase::Aborted {
                    style("✗").red()
                } else {
                    style("✓").green()
                };
                spinner.finish_with_message(format!("{mark} {phase}"));
                return;
            }
            spinner.set_message(phase.to_string());
            if phases.changed().await.is_err() {
                spinner.finish_and_clear();
                return;
            }
        }
    })
}

pub fn print_banner(url: &str, slides: usize, show_qr: bool) {
    if show_qr {
        match qr::generate_qr(url) {
            Ok(code) => println!("\n{}\n", code),
            Err(err) => tracing::warn!(error = %err, "could not render QR code"),
        }
    }
    println!("{} {}", style("Remote control:").bold(), style(url).cyan());
    println!("{} {}", style("Slides with notes cached:").bold(), slides);
    println!("{}", style("Press Ctrl-C to stop").dim());
}
