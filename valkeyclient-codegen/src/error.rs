//! Error type for the catalogue reader and generator.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("failed to read catalogue file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalogue JSON in {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write generated module to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalogue entry {command:?} declares argument kind {kind:?}, which has no known Rust mapping")]
    UnmappableArgumentKind { command: String, kind: String },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
