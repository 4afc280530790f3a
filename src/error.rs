use std::path::PathBuf;

use thiserror::Error;

/// Failure conditions of the analysis pipeline
///
/// Only missing required input and a zero-yield parse escalate; malformed
/// individual lines and classification ambiguity degrade to counted
/// fallbacks and never surface here.
#[derive(Debug, Error)]
pub enum ThreadlineError {
    #[error("transcript file not found: {0}")]
    TranscriptMissing(PathBuf),

    #[error("no messages could be parsed from the transcript")]
    EmptyTranscript,

    #[error("malformed roster file {path}: {source}")]
    MalformedRoster {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed keyword file {path}: {source}")]
    MalformedKeywords {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
