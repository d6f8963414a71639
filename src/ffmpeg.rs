use crate::error::ToolError;
use std::process::{Command, Stdio};

/// Lines of stderr kept in the error when a tool fails
const STDERR_TAIL_LINES: usize = 20;

/// Run an external codec tool to completion, failing on a non-zero exit.
pub(crate) fn run_tool(mut command: Command) -> Result<(), ToolError> {
    let program = command.get_program().to_string_lossy().into_owned();
    tracing::debug!("Running {:?}", command);

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        return Err(ToolError::Failed {
            program,
            status: output.status,
            stderr: tail,
        });
    }

    Ok(())
}
