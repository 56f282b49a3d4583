//! Spawning of external collaborator processes.

use crate::error::{Error, Result};
use crate::pipeline::SetupStage;
use camino::Utf8Path;
use std::process::Command;

const STDERR_TAIL_LINES: usize = 20;

/// Run `command` to completion, mapping spawn failures and non-zero exits to
/// [`Error::Collaborator`].
pub(crate) fn run_command(stage: SetupStage, input: &Utf8Path, command: &mut Command) -> Result<()> {
    run(command).map_err(|message| Error::collaborator(stage, input, message))
}

/// Run `command` to completion; the error describes the failure and the tail of stderr.
pub(crate) fn run(command: &mut Command) -> std::result::Result<(), String> {
    tracing::debug!("Running {:?}", command);

    let output = command
        .output()
        .map_err(|e| format!("failed to start {:?}: {e}", command.get_program()))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    Err(format!(
        "{:?} exited with {}: {}",
        command.get_program(),
        output.status,
        tail
    ))
}
