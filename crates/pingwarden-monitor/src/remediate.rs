//! Remediation command execution.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use crate::error::RemediationError;

/// What a remediation attempt produced.
#[derive(Debug)]
pub struct RemediationReport {
    /// Captured standard output, possibly partial on failure.
    pub output: Vec<u8>,
    /// Whether the command ran and exited zero.
    pub result: Result<(), RemediationError>,
}

impl RemediationReport {
    /// Output as lossy UTF-8 with trailing whitespace removed.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).trim_end().to_string()
    }
}

/// Runs the corrective action once the failure threshold is crossed.
#[async_trait]
pub trait Remediator: Send {
    /// Run `argv[0]` with `argv[1..]` and wait for it to finish.
    async fn run(&mut self, argv: &[String]) -> RemediationReport;
}

/// Spawns the command as a child process.
#[derive(Debug, Clone, Default)]
pub struct CommandRemediator {
    timeout: Option<Duration>,
}

impl CommandRemediator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Remediator for CommandRemediator {
    async fn run(&mut self, argv: &[String]) -> RemediationReport {
        let Some((program, args)) = argv.split_first() else {
            return RemediationReport {
                output: Vec::new(),
                result: Err(RemediationError::Spawn {
                    program: String::new(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
                }),
            };
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(source) => {
                return RemediationReport {
                    output: Vec::new(),
                    result: Err(RemediationError::Spawn {
                        program: program.clone(),
                        source,
                    }),
                };
            }
        };

        // Pipes are drained chunk by chunk so whatever arrived before a
        // timeout is still reported.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let finished = {
            let waiting = async {
                let (status, (), ()) = tokio::join!(
                    child.wait(),
                    drain(stdout_pipe, &mut stdout),
                    drain(stderr_pipe, &mut stderr),
                );
                status
            };
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, waiting).await.ok(),
                None => Some(waiting.await),
            }
        };

        if !stderr.is_empty() {
            debug!(
                %program,
                stderr = %String::from_utf8_lossy(&stderr).trim_end(),
                "remediation stderr"
            );
        }

        let result = match finished {
            Some(Ok(status)) if status.success() => Ok(()),
            Some(Ok(status)) => Err(RemediationError::ExitStatus(status)),
            Some(Err(source)) => Err(RemediationError::Spawn {
                program: program.clone(),
                source,
            }),
            None => {
                if let Err(e) = child.kill().await {
                    debug!(%program, error = %e, "failed to kill timed out command");
                }
                // The timeout was set whenever the wait was cut short.
                Err(RemediationError::Timeout(self.timeout.unwrap_or_default()))
            }
        };

        RemediationReport {
            output: stdout,
            result,
        }
    }
}

/// Read `pipe` to EOF into `buf`, keeping every chunk read so far.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) {
    let Some(mut pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
