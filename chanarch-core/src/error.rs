use thiserror::Error;

/// Unified error type for the chanarch workspace.
///
/// Wraps configuration validation failures, archiver readiness and response
/// timeouts, per-channel archive failures, data issues, and report output
/// errors.
#[derive(Debug, Error)]
pub enum ChanError {
    /// Invalid run configuration or command-line input.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The archive service never became ready.
    #[error("archiver interface not ready after {seconds} s")]
    ReadinessTimeout {
        /// How long the run waited before giving up.
        seconds: u64,
    },

    /// A page request was issued but no response arrived in time.
    #[error("archive response for {channel} timed out after {seconds} s")]
    ResponseTimeout {
        /// Channel whose page never arrived.
        channel: String,
        /// Response deadline that elapsed.
        seconds: u64,
    },

    /// An individual archive request failed. Not fatal to the run.
    #[error("archive request for {channel} failed: {msg}")]
    Archive {
        /// Channel the failed request was for.
        channel: String,
        /// Human-readable failure description.
        msg: String,
    },

    /// Issues with returned data (unparseable payload, missing fields).
    #[error("data issue: {0}")]
    Data(String),

    /// The report destination could not be opened or written.
    #[error("output error: {path}: {msg}")]
    Output {
        /// Report destination path.
        path: String,
        /// Underlying I/O failure.
        msg: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl ChanError {
    /// Helper: build a `Config` error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Helper: build an `Archive` error for a named channel.
    pub fn archive(channel: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Archive {
            channel: channel.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `Data` error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Helper: build an `Output` error from an I/O failure on `path`.
    pub fn output(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            msg: err.to_string(),
        }
    }
}
