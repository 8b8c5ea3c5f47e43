use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Build phases used to tag pipeline and analysis failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Reading the issue log from disk.
    Load,
    /// Decoding JSONL records.
    Parse,
    /// Index construction and the actionable set.
    AnalyzePhase1,
    /// On-demand graph metrics and reports.
    AnalyzePhase2,
    /// Workspace configuration.
    Config,
    /// Revision-pinned loading.
    History,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Parse => "parse",
            Phase::AnalyzePhase1 => "analyze_phase1",
            Phase::AnalyzePhase2 => "analyze_phase2",
            Phase::Config => "config",
            Phase::History => "history",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the viewer core.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to read issue log {path}: {source}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid workspace config: {0}")]
    Config(String),
    #[error("history error: {0}")]
    History(String),
    #[error("export hook failed: {0}")]
    Hook(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("build failed in phase {phase}: {message}")]
    Build { phase: Phase, message: String },
}

impl ViewerError {
    /// The phase this error is attributed to, for error accounting.
    pub fn phase(&self) -> Phase {
        match self {
            ViewerError::Io(_) | ViewerError::LogRead { .. } | ViewerError::NotFound(_) => {
                Phase::Load
            }
            ViewerError::Serialization(_) | ViewerError::InvalidArgument(_) => Phase::Parse,
            ViewerError::Config(_) => Phase::Config,
            ViewerError::History(_) | ViewerError::Hook(_) => Phase::History,
            ViewerError::Build { phase, .. } => *phase,
        }
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ViewerError {
    fn from(err: serde_yaml::Error) -> Self {
        ViewerError::Config(err.to_string())
    }
}
