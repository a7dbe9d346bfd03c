use std::path::PathBuf;

use thiserror::Error;

/// The user-supplied target could not be turned into a hostname.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("target is empty")]
    Empty,

    #[error("no hostname in target: {0}")]
    MissingHost(String),

    #[error("invalid hostname: {0}")]
    InvalidHost(String),
}

/// Forward resolution produced no address. Nothing downstream is meaningful.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no address found for {host}: {reason}")]
    NoSuchHost { host: String, reason: String },
}

/// Invalid configuration, detected before the pipeline starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max concurrent downloads must be at least 1")]
    ZeroConcurrency,

    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("upload file is not readable: {path}")]
    UploadUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload path is not a regular file: {0}")]
    UploadNotAFile(PathBuf),

    #[error("invalid provider suffix: {0}")]
    InvalidProviderSuffix(String),

    #[error("cannot build storage client: {0}")]
    StorageClient(String),
}

/// Errors escalated by the scan orchestrator. Everything else is reported as
/// data inside the scan result.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Failures of the storage protocol collaborator. The permission probe maps
/// these onto probe outcomes; they never leave the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("access denied (HTTP {status}{})", code_suffix(.code))]
    Denied { status: u16, code: Option<String> },

    #[error("not found{}", code_suffix(.code))]
    NotFound { code: Option<String> },

    #[error("timeout")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl StorageError {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref()
        .map(|code| format!(", {code}"))
        .unwrap_or_default()
}
