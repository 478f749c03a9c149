use std::fmt;

#[derive(Debug)]
pub enum ErrorKind {
    /// Bad magic, unknown version, checksum mismatch, truncated section.
    InvalidIndexFormat,
    /// Out-of-range row/column/width; zero-length prefix/suffix; K <= 0; unsorted FST input.
    InvalidArgument,
    /// Non-fatal: a term crossed its document-frequency limit and was demoted to a stop term.
    StopTermOverflow,
    /// Cooperative cancellation during indexing; partial state is discarded.
    Cancelled,
    /// Surfaced unchanged from an underlying read/write.
    IoError,
    Parse,
    NotFound,
    Internal,
    InvalidState,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error { kind: ErrorKind::IoError, context: err.to_string() }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error { kind: ErrorKind::Parse, context: err.to_string() }
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error { kind: ErrorKind::Internal, context: format!("FST error: {}", err) }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
