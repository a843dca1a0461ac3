use std::fmt;

/// Unified error type for the pool, skip list, and hybrid hashmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Requested/target capacity exceeds `HASHMAP_MAX_SIZE`, or a resize target
    /// is below the map's current live size.
    CapacityOverflow,
    /// The underlying allocator rejected a request.
    AllocationFailure,
    /// `insert(.., update=false)` hit an existing key.
    DuplicateKey,
    /// `set`/`remove` targeted a key the operation requires to be present.
    MissingKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapacityOverflow => write!(f, "capacity overflow"),
            Error::AllocationFailure => write!(f, "allocation failure"),
            Error::DuplicateKey => write!(f, "duplicate key"),
            Error::MissingKey => write!(f, "missing key"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
