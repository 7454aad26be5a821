//! Message rewriting through an external command.
//!
//! The command receives the message body on stdin and its stdout becomes the
//! new message. It runs once per record, synchronously on the worker thread.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::TransformError;

/// Rewrites a message body. Bytes in, bytes or error out.
pub trait MessageTransform: Send + Sync {
    fn transform(&self, message: &[u8]) -> Result<Vec<u8>, TransformError>;
}

/// Runs `program args...` for every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTransform {
    program: String,
    args: Vec<String>,
}

impl CommandTransform {
    /// Build from an argument vector; `None` when it is empty.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }

    /// Build from a command line split on whitespace, e.g. `tr a-z A-Z`.
    /// Quotes have no special meaning.
    pub fn from_command_line(command: &str) -> Option<Self> {
        Self::new(command.split_whitespace().map(str::to_string).collect())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn io_error(&self, source: io::Error) -> TransformError {
        TransformError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

impl MessageTransform for CommandTransform {
    fn transform(&self, message: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();

        // Feed stdin from a second thread so a chatty child cannot block on a
        // full stdout pipe while we are still writing.
        let (written, output) = thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(message),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| self.io_error(e))?;
        match written {
            Ok(Ok(())) => {}
            // The child is free to exit without reading its input.
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(self.io_error(e)),
            Err(_) => {
                return Err(self.io_error(io::Error::new(
                    io::ErrorKind::Other,
                    "stdin writer panicked",
                )))
            }
        }

        if !output.status.success() {
            return Err(TransformError::Status {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
