// Adapted from sov-schema-db::CodecError (Aptos lineage).

//! Error kinds produced by the dereference dependency map, per spec §7.

use thiserror::Error;

/// An error that occurred while (de)serializing a key or value for a
/// [`crate::schema::Schema`]. Kept separate from [`DerefMapError`] because
/// codec errors are produced deep inside key/value implementations that
/// don't know which `DerefMap` operation is calling them.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A fixed-length field decoded to the wrong number of bytes.
    #[error("invalid field length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
    /// The byte stream ended before a field's terminator was reached.
    #[error("truncated encoding: expected more bytes while decoding {what}")]
    Truncated { what: &'static str },
    /// Trailing bytes remained after decoding all expected fields.
    #[error("trailing bytes after decoding {what}")]
    TrailingBytes { what: &'static str },
    /// Failure from the underlying `memcomparable` (de)serializer.
    #[error(transparent)]
    Memcomparable(#[from] memcomparable::Error),
    /// Some other (de)serialization failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Top-level error type for [`crate::deref_map::DerefMap`] operations, per spec §7.
#[derive(Debug, Error)]
pub enum DerefMapError {
    /// A backend column family was missing on open/delete.
    #[error("index not found: {0}")]
    IndexNotFound(String),
    /// The backend store reported an I/O failure.
    #[error("backend I/O error")]
    Io(#[from] rocksdb::Error),
    /// A row failed to decode; fatal for that row, not for the whole query.
    #[error("corrupt encoding while decoding {context}")]
    CorruptEncoding {
        context: &'static str,
        #[source]
        source: CodecError,
    },
    /// The forward index held more than one row for a `(dependant, vtag)` pair.
    #[error("invariant violation: forward index has {count} rows for a single (dependant, vtag) key, expected at most 1")]
    InvariantViolation { count: usize },
    /// A blocking backend call was interrupted.
    #[error("operation interrupted")]
    Interrupted,
}

impl DerefMapError {
    pub(crate) fn corrupt(context: &'static str, source: CodecError) -> Self {
        DerefMapError::CorruptEncoding { context, source }
    }
}

/// Result alias used throughout the codec layer.
pub type CodecResult<T> = core::result::Result<T, CodecError>;
/// Result alias used throughout the `DerefMap` API.
pub type Result<T> = core::result::Result<T, DerefMapError>;
