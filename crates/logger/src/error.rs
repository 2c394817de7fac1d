use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Failed to create log directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open log segment '{path}': {source}")]
    OpenSegment {
        path: PathBuf,
        source: std::io::Error,
    },
}
