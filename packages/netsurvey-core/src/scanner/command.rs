//! Bounded execution of external network utilities.

use std::process::{Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

#[derive(Debug, Error)]
pub(crate) enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} did not finish within {limit:?}")]
    TimedOut { program: String, limit: Duration },
}

/// Create a Command that hides the console window on Windows and is killed
/// when its handle is dropped.
pub(crate) fn hidden_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run `cmd` to completion, killing the child if it outlives `limit`.
pub(crate) async fn run_bounded(mut cmd: Command, limit: Duration) -> Result<Output, CommandError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    let child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(CommandError::Wait { program, source }),
        Err(_) => Err(CommandError::TimedOut { program, limit }),
    }
}
