use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use crate::ExternalError;
use crate::traits::ExternalResult;

/// Captured result of a finished command.
pub(crate) struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion, feeding it `stdin` if given.
///
/// A non-zero exit is an error carrying the command's stderr.
pub(crate) fn run(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
) -> ExternalResult<CommandOutput> {
    debug!(program, ?args, "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            ExternalError::with_source(format!("failed to start {program}"), source)
        })?;

    // Feed stdin on its own thread while stdout and stderr drain.
    let pipe = child.stdin.take();
    let (output, written) = thread::scope(|scope| {
        let writer = pipe
            .zip(stdin)
            .map(|(mut pipe, input)| scope.spawn(move || pipe.write_all(input.as_bytes())));
        let output = child.wait_with_output();
        let written = writer.map_or(Ok(()), |handle| {
            handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")))
        });
        (output, written)
    });

    let output = output.map_err(|source| {
        ExternalError::with_source(format!("failed to wait for {program}"), source)
    })?;

    match written {
        // The child stopped reading; its exit status decides.
        Err(source) if source.kind() == io::ErrorKind::BrokenPipe => {
            debug!(program, "child closed stdin early");
        }
        Err(source) => {
            return Err(ExternalError::with_source(
                format!("failed to write to {program}"),
                source,
            ));
        }
        Ok(()) => {}
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let detail = stderr.trim();
        let message = if detail.is_empty() {
            format!("{program} {} exited with {}", args.join(" "), output.status)
        } else {
            format!(
                "{program} {} exited with {}: {detail}",
                args.join(" "),
                output.status
            )
        };
        return Err(ExternalError::new(message));
    }

    Ok(CommandOutput { stdout, stderr })
}
