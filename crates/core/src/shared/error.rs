use std::path::PathBuf;

use thiserror::Error;

/// Failures that can occur while analyzing a video.
///
/// `Protocol` and `Transport` are scoped to a single remote call; the
/// pipeline records them and moves on. `Io` and `Decode` abort the run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{service} protocol error: {message}")]
    Protocol {
        service: &'static str,
        message: String,
    },
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn protocol(service: &'static str, message: impl Into<String>) -> Self {
        Self::Protocol {
            service,
            message: message.into(),
        }
    }
}
