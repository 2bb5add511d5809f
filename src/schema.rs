// Adapted from sov-schema-db::schema (itself adapted from Aptos::storage::schemadb).

//! A type-safe interface over [`DB`](crate::db::DB) column families — the
//! realization of the spec's "Index Backend Adapter" (§4.3): crate code
//! never touches raw bytes, only `Schema::Key`/`Schema::Value`.

use std::fmt::Debug;

use crate::error::CodecResult;

/// Crate users are expected to know column family names beforehand, so they
/// can have `static` lifetimes.
pub type ColumnFamilyName = &'static str;

/// A [`Schema`] is a type-safe interface over a specific column family in a
/// [`DB`](crate::db::DB). It names a key type ([`KeyCodec`]) and a value type
/// ([`ValueCodec`]).
pub trait Schema: Debug + Send + Sync + 'static + Sized {
    /// The column family name associated with this struct. Distinct across
    /// all schemas within the same [`DB`](crate::db::DB).
    const COLUMN_FAMILY_NAME: ColumnFamilyName;

    /// Type of the key.
    type Key: KeyCodec<Self>;

    /// Type of the value.
    type Value: ValueCodec<Self>;
}

/// Marker trait for types that can serve as a [`Schema::Key`]. Blanket
/// implementation for anything that is both [`KeyEncoder`] and
/// [`KeyDecoder`].
pub trait KeyCodec<S: Schema>: KeyEncoder<S> + KeyDecoder<S> {}

impl<T, S: Schema> KeyCodec<S> for T where T: KeyEncoder<S> + KeyDecoder<S> {}

/// Encodes a [`Schema::Key`] to the bytes stored in the backend.
pub trait KeyEncoder<S: Schema>: Sized + Debug {
    /// Converts `self` to bytes to be stored in the backend.
    fn encode_key(&self) -> CodecResult<Vec<u8>>;
}

/// Decodes a [`Schema::Key`] from the bytes read from the backend.
pub trait KeyDecoder<S: Schema>: Sized + Debug {
    /// Converts bytes fetched from the backend to `Self`.
    fn decode_key(data: &[u8]) -> CodecResult<Self>;
}

/// Encodes and decodes a [`Schema::Value`].
pub trait ValueCodec<S: Schema>: Sized + Debug {
    /// Converts `self` to bytes to be stored in the backend.
    fn encode_value(&self) -> CodecResult<Vec<u8>>;
    /// Converts bytes fetched from the backend to `Self`.
    fn decode_value(data: &[u8]) -> CodecResult<Self>;
}

/// Implementors can be used to seek a [`crate::iterator::SchemaIterator`].
/// Not every [`KeyEncoder`] is a sensible [`SeekKeyEncoder`]: a seek key is
/// typically a *prefix* of the full key (e.g. the equality conditions of
/// spec §4.3's `performQuery`), and must produce the same leading bytes the
/// full key's encoding would.
pub trait SeekKeyEncoder<S: Schema>: Sized {
    /// Converts `self` to the bytes used to seek the underlying iterator.
    fn encode_seek_key(&self) -> CodecResult<Vec<u8>>;
}

/// Defines a [`Schema`] implementor: name, key type, value type, column
/// family name.
#[macro_export]
macro_rules! define_schema {
    ($schema_type:ident, $key_type:ty, $value_type:ty, $cf_name:expr) => {
        #[derive(Debug)]
        pub(crate) struct $schema_type;

        impl $crate::schema::Schema for $schema_type {
            type Key = $key_type;
            type Value = $value_type;

            const COLUMN_FAMILY_NAME: $crate::schema::ColumnFamilyName = $cf_name;
        }
    };
}
