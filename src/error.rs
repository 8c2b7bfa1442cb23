//! Error types for rbuild.
//!
//! One enum covers every failure the build engine can surface. Staleness
//! problems never show up here: they are resolved locally by rebuilding.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum BuildError {
    /// Toolchain name outside the supported vocabulary
    #[error("unknown {role} '{name}'")]
    UnknownToolchain { role: &'static str, name: String },

    /// Malformed or inconsistent descriptor
    #[error("configuration error: {0}")]
    Config(String),

    /// The OS refused to create the process
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Command line over the platform ceiling with no usable fallback
    #[error("running '{program}': command line too long, is {len}, max {max}")]
    CommandLineTooLong {
        program: String,
        len: usize,
        max: usize,
    },

    /// Object and dependency paths can only be derived inside the source root
    #[error("source file '{source_file}' is outside the source folder '{root}'")]
    OutsideSourceRoot { source_file: PathBuf, root: PathBuf },

    /// One or more sources failed to compile
    #[error("failed to compile {}", quote_list(.files))]
    CompileFailed { files: Vec<PathBuf> },

    /// The linker (or archiver) exited with a nonzero status
    #[error("failed to link target '{target}'")]
    LinkFailed { target: String },

    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker panicked while running a job
    #[error("job for '{label}' panicked")]
    JobPanicked { label: String },

    /// The worker pool could not be created
    #[error("job scheduler: {0}")]
    Scheduler(String),
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

fn quote_list(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| format!("'{}'", f.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
