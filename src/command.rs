use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::QueryError;

/// Run an external command with a deadline and return its stdout.
///
/// The child is killed when the deadline fires, so a hung `yabai` or `tmux`
/// never outlives the fetch that started it.
pub async fn run(program: &str, args: &[&str], deadline: Duration) -> Result<String, QueryError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(deadline, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(QueryError::NotFound {
                program: program.to_string(),
            })
        }
        Ok(Err(e)) => return Err(QueryError::Io(e)),
        Err(_) => {
            return Err(QueryError::Timeout {
                program: program.to_string(),
                after: deadline,
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(QueryError::CommandFailed {
            program: program.to_string(),
            status: output
                .status
                .code()
                .map(|c| format!("exit {}", c))
                .unwrap_or_else(|| "signal".to_string()),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
