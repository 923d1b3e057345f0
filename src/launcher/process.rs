use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use sysinfo::System;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Operating-system side of launching the office
pub trait OfficeProcess: Send + Sync {
    fn program(&self) -> &str;

    /// Kill leftover instances holding the automation port. Returns how many
    /// were signalled.
    fn terminate_stale(&self) -> usize;

    /// Start the office with `--accept=<accept>` and the document. Must not wait
    /// for the child.
    fn spawn(&self, accept: &str, document: &Path) -> io::Result<()>;
}

pub struct SofficeProcess {
    binary: String,
    stale_name: String,
}

impl SofficeProcess {
    pub fn new(binary: impl Into<String>, stale_name: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            stale_name: stale_name.into(),
        }
    }
}

impl OfficeProcess for SofficeProcess {
    fn program(&self) -> &str {
        &self.binary
    }

    fn terminate_stale(&self) -> usize {
        let mut system = System::new();
        system.refresh_processes();

        let mut killed = 0;
        for process in system.processes_by_exact_name(&self.stale_name) {
            if process.kill() {
                tracing::debug!(pid = %process.pid(), name = %self.stale_name, "killed stale instance");
                killed += 1;
            }
        }
        killed
    }

    fn spawn(&self, accept: &str, document: &Path) -> io::Result<()> {
        let child = Command::new(&self.binary)
            .arg(format!("--accept={accept}"))
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::debug!(pid = ?child.id(), binary = %self.binary, "office started");
        reap(child);
        Ok(())
    }
}

/// Wait for the child in the background so it never lingers as a zombie.
/// The office keeps running if this process exits first.
fn reap(mut child: Child) -> JoinHandle<Option<ExitStatus>> {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                tracing::debug!(%status, "office process exited");
                Some(status)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not wait for office process");
                None
            }
        }
    })
}
