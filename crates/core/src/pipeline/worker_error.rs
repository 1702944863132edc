use std::io;

use thiserror::Error;

/// Failures that end the worker loop.
///
/// Undecodable payloads never appear here; they are absorbed into an
/// empty record.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to read frame: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write record for frame {sequence}: {source}")]
    Write {
        sequence: u64,
        #[source]
        source: io::Error,
    },
    #[error("hand detector failed on frame {sequence}: {message}")]
    Detector { sequence: u64, message: String },
}
