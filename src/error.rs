use std::fmt;

/// Error kinds surfaced by the tree engine and its backends.
///
/// Validation errors (`InvalidDepth`, `OutOfRange`, `KeyExists`,
/// `KeyNotFound`) are returned unchanged to the caller and are never
/// retried. `InvalidProof` is only ever produced by [`crate::verifier`],
/// never by a mutation.
#[derive(Debug)]
pub enum Error {
    /// depth was 0 or greater than 256 at construction.
    InvalidDepth(u16),
    /// index was outside `[0, 2^depth)`.
    OutOfRange,
    /// insert on a slot that is already occupied.
    KeyExists,
    /// update or delete on a slot that is empty.
    KeyNotFound,
    /// verification failed: sibling underflow, length/enables mismatch, or
    /// root mismatch.
    InvalidProof(&'static str),
    /// a hex token at a serialization boundary had the wrong length or
    /// non-hex characters.
    MalformedHex,
    /// the backend reported a failure on get/set/delete.
    StorageError(Box<dyn std::error::Error + Send + Sync>),
    /// construction with an absent backend handle.
    NilBackend,
    /// the node store holds data that violates I2/I3 (corrupt on-disk state).
    CorruptStore(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDepth(d) => write!(f, "invalid depth: {d} (must be 1..=256)"),
            Error::OutOfRange => write!(f, "index out of range for configured depth"),
            Error::KeyExists => write!(f, "insert on an occupied slot"),
            Error::KeyNotFound => write!(f, "update or delete on an empty slot"),
            Error::InvalidProof(why) => write!(f, "invalid proof: {why}"),
            Error::MalformedHex => write!(f, "malformed hex token"),
            Error::StorageError(e) => write!(f, "storage error: {e}"),
            Error::NilBackend => write!(f, "construction with an absent backend"),
            Error::CorruptStore(why) => write!(f, "corrupt node store: {why}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StorageError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
