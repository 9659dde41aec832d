//! The operating system shutdown action.

use crate::error::{GuardError, Result};
use std::process::Command;
use tracing::{info, warn};

/// Performs the final shutdown. `execute` blocks, so it is always called
/// from a blocking thread.
pub trait ShutdownAction: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self) -> Result<()>;
}

/// Invokes the platform `shutdown` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdown;

impl SystemShutdown {
    fn command() -> Command {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("shutdown");
            cmd.args(["/s", "/t", "0"]);
            cmd
        } else {
            let mut cmd = Command::new("shutdown");
            cmd.args(["-h", "now"]);
            cmd
        }
    }
}

impl ShutdownAction for SystemShutdown {
    fn name(&self) -> &str {
        "system"
    }

    fn execute(&self) -> Result<()> {
        info!("Shutting down the machine");
        let status = Self::command()
            .status()
            .map_err(|e| GuardError::shutdown_error(format!("failed to run shutdown: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(GuardError::shutdown_error(format!(
                "shutdown exited with {}",
                status
            )))
        }
    }
}

/// Logs instead of shutting down. Used for `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyShutdown;

impl ShutdownAction for LogOnlyShutdown {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn execute(&self) -> Result<()> {
        warn!("Dry run: the machine would shut down now");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let cmd = SystemShutdown::command();
        assert_eq!(cmd.get_program(), "shutdown");
        assert_eq!(cmd.get_args().count(), if cfg!(windows) { 3 } else { 2 });
    }

    #[test]
    fn test_log_only_succeeds() {
        assert!(LogOnlyShutdown.execute().is_ok());
    }
}
