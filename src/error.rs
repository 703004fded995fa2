use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors surfaced by the pipeline stages. None of these are retried
/// internally; retry policy belongs to whatever runs the engine.
#[derive(Debug)]
pub enum MrError {
    /// A record could not be decoded as UTF-8 text.
    MalformedInput { path: PathBuf, line: u64 },
    /// Summation for a key exceeded the u64 range.
    Overflow { key: String },
    /// The in-memory grouper ran past its configured byte limit and
    /// spilling is not available.
    GroupingCapacity { resident: usize, limit: usize },
    /// Spill, sink or record-stream I/O failure.
    Io(io::Error),
}

impl fmt::Display for MrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MrError::MalformedInput { path, line } => {
                write!(f, "malformed input: {}:{} is not valid UTF-8", path.display(), line)
            }
            MrError::Overflow { key } => {
                write!(f, "count overflow for key {:?}", key)
            }
            MrError::GroupingCapacity { resident, limit } => {
                write!(
                    f,
                    "grouper holds {} bytes, over the {} byte limit, and spilling is disabled",
                    resident, limit
                )
            }
            MrError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for MrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MrError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MrError {
    fn from(err: io::Error) -> Self {
        MrError::Io(err)
    }
}
