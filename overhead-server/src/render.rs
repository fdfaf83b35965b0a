//! Card render trigger.
//!
//! Fire-and-forget launch of the configured render command. The child gets
//! the published alert path and the flight in its environment; a detached
//! task reaps it and logs the exit status. The loop only watches the
//! rendered asset's modification time.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::sources::RenderTrigger;

pub const ENV_ALERT_PATH: &str = "OVERHEAD_ALERT_PATH";
pub const ENV_FLIGHT: &str = "OVERHEAD_FLIGHT";

/// Launches `command` (a shell-style command line, quotes honoured) per cycle.
#[derive(Debug, Clone)]
pub struct CommandRender {
    command: Option<String>,
    asset_path: PathBuf,
}

impl CommandRender {
    pub fn new(command: Option<String>, asset_path: impl Into<PathBuf>) -> Self {
        CommandRender {
            command: command.filter(|c| !c.trim().is_empty()),
            asset_path: asset_path.into(),
        }
    }
}

#[async_trait]
impl RenderTrigger for CommandRender {
    async fn trigger(&self, alert_path: &Path, flight: &str) -> bool {
        let Some(command) = self.command.as_deref() else {
            debug!(flight, "no render command configured");
            return false;
        };
        let Some(argv) = shlex::split(command) else {
            warn!(flight, command, "render command has unbalanced quotes");
            return false;
        };
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        let program = program.as_str();

        let spawned = Command::new(program)
            .args(args)
            .env(ENV_ALERT_PATH, alert_path)
            .env(ENV_FLIGHT, flight)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                warn!(flight, program, error = %e, "render trigger failed to launch");
                return false;
            }
        };

        info!(flight, program, "render triggered");
        let flight = flight.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!(flight, "render finished"),
                Ok(status) => warn!(flight, %status, "render exited with failure"),
                Err(e) => warn!(flight, error = %e, "render wait failed"),
            }
        });
        true
    }

    async fn asset_modified(&self) -> Option<DateTime<Utc>> {
        let meta = tokio::fs::metadata(&self.asset_path).await.ok()?;
        meta.modified().ok().map(DateTime::<Utc>::from)
    }
}
