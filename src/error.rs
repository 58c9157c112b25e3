use std::num::ParseIntError;
use thiserror::Error;

/// Errors surfaced by the multiplexer and its helpers.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Invalid state transition, duplicate service, PID exhaustion or a bad setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unknown stream PID, malformed access unit or unrepresentable timestamp.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failure reported by the output sink, passed through untouched.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Malformed transport stream data handed to the parser.
    #[error("parser error: {0}")]
    Parser(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

/// Errors an output sink may report.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The consumer side of the sink went away.
    #[error("sink closed")]
    Closed,

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, MuxError>;
