//! Contains the main error type for the library.
use thiserror::Error;

/// The main error type for the library.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Malformed Frame")]
    MalformedFrame,
    #[error("Unknown Bus {0}")]
    UnknownBus(u8),
    #[error("Invalid Interval {start}..{end}")]
    InvalidInterval { start: f64, end: f64 },
    #[error("Timeout")]
    Timeout,
    #[error("Invalid Log Record: {0}")]
    InvalidLogRecord(String),
    #[error("CSV Error: {0}")]
    Csv(String),
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    IsoTPError(#[from] crate::isotp::error::Error),
    #[error(transparent)]
    UDSError(#[from] crate::uds::Error),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Error {
        Error::Csv(err.to_string())
    }
}
