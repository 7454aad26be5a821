use thiserror::Error;

/// Why a line could not be turned into a [`crate::event::LogLine`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line does not match the fancy template: {0:?}")]
    Malformed(String),

    #[error("unknown severity {0:?}")]
    UnknownSeverity(String),

    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp {0:?} is out of range")]
    TimestampOutOfRange(String),
}

/// Failure of the external message transform command.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to exchange data with {program:?}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program:?} {status}: {stderr}")]
    Status {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Longest excerpt of an offending line quoted in diagnostics.
const EXCERPT_LEN: usize = 120;

pub(crate) fn excerpt(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\r', '\n']);
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
