use std::fmt;
use std::io;

/// The four error kinds the ground-filter pipeline can surface.
///
/// `InputFormat` and `Io` are fatal — processing aborts and no output files are
/// written. `Degenerate` describes a whole iteration that had nothing to do
/// (empty input, zero active points, a layer with no cell carrying an `mse`);
/// the iteration becomes a no-op rather than an error propagated to the caller,
/// so in practice `Degenerate` only ever appears inside a log line, never as a
/// `Result::Err`. `NumericEdge` is kept for API completeness, but the
/// corresponding situations (a missing corner, a `null` interpolation, an
/// empty-set median) are represented as `Option::None` values flowing through
/// the data model, not as raised errors — see `DESIGN.md`.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundFilterError {
    InputFormat { msg: String },
    Io { msg: String },
    Degenerate { msg: String },
    NumericEdge { msg: String },
}

impl fmt::Display for GroundFilterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroundFilterError::InputFormat { msg } => write!(f, "input format error: {}", msg),
            GroundFilterError::Io { msg } => write!(f, "I/O error: {}", msg),
            GroundFilterError::Degenerate { msg } => write!(f, "degenerate iteration: {}", msg),
            GroundFilterError::NumericEdge { msg } => write!(f, "numeric edge case: {}", msg),
        }
    }
}

impl std::error::Error for GroundFilterError {}

impl From<io::Error> for GroundFilterError {
    fn from(err: io::Error) -> GroundFilterError {
        GroundFilterError::Io {
            msg: err.to_string(),
        }
    }
}

impl GroundFilterError {
    pub fn input_format<S: Into<String>>(msg: S) -> GroundFilterError {
        GroundFilterError::InputFormat { msg: msg.into() }
    }

    pub fn degenerate<S: Into<String>>(msg: S) -> GroundFilterError {
        GroundFilterError::Degenerate { msg: msg.into() }
    }
}
