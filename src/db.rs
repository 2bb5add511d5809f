// Adapted from sov-schema-db::db (itself adapted from Aptos::storage::schemadb).

//! A type-safe, schema-checked wrapper around [`rocksdb::DB`].
//!
//! Column families are addressed by an explicit runtime name rather than
//! `Schema::COLUMN_FAMILY_NAME` alone: a [`crate::deref_map::DerefMap`]'s
//! forward/backward tables are named from its index name at `create` time
//! (spec §6), so the same [`crate::schema::Schema`] impl is reused across
//! many differently-named column families of one open [`DB`].

use std::path::Path;

use tracing::{debug, trace};

use crate::error::{DerefMapError, Result};
use crate::iterator::SchemaIterator;
use crate::metrics::{
    SCHEMADB_DELETES, SCHEMADB_GET_BYTES, SCHEMADB_GET_LATENCY_SECONDS, SCHEMADB_PUT_BYTES,
};
use crate::schema::{KeyCodec, Schema, SeekKeyEncoder, ValueCodec};

/// A schema-checked handle to a RocksDB instance. Every read/write goes
/// through a [`Schema`], so callers never see raw key/value bytes.
#[derive(Debug)]
pub struct DB {
    name: &'static str,
    inner: rocksdb::DB,
}

impl DB {
    /// Opens (creating if missing) a RocksDB instance at `path` containing
    /// at least `column_families`. Column families already present on disk
    /// (from previously-created indices sharing this database) are kept
    /// open alongside them — RocksDB requires every existing column family
    /// to be named at open time.
    pub fn open(
        path: impl AsRef<Path>,
        name: &'static str,
        column_families: impl IntoIterator<Item = String>,
        db_opts: &rocksdb::Options,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut all_cfs: std::collections::BTreeSet<String> =
            rocksdb::DB::list_cf(db_opts, path).unwrap_or_default().into_iter().collect();
        all_cfs.insert(rocksdb::DEFAULT_COLUMN_FAMILY_NAME.to_string());
        all_cfs.extend(column_families);
        let db = rocksdb::DB::open_cf(db_opts, path, all_cfs)?;
        Ok(Self { name, inner: db })
    }

    fn cf_handle(&self, cf_name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.inner.cf_handle(cf_name).ok_or_else(|| {
            DerefMapError::IndexNotFound(format!(
                "column family {cf_name} does not exist in db {}",
                self.name
            ))
        })
    }

    /// Reads a single record by key from `cf_name`.
    pub fn get<S: Schema>(&self, cf_name: &str, schema_key: &impl KeyCodec<S>) -> Result<Option<S::Value>> {
        let _timer = SCHEMADB_GET_LATENCY_SECONDS
            .with_label_values(&[cf_name])
            .start_timer();

        let key = schema_key
            .encode_key()
            .map_err(|e| DerefMapError::corrupt("encoding get key", e))?;
        let cf_handle = self.cf_handle(cf_name)?;
        let raw_value = self.inner.get_cf(cf_handle, key)?;
        SCHEMADB_GET_BYTES
            .with_label_values(&[cf_name])
            .observe(raw_value.as_ref().map_or(0.0, |v| v.len() as f64));

        raw_value
            .map(|raw| {
                <S::Value as ValueCodec<S>>::decode_value(&raw)
                    .map_err(|e| DerefMapError::corrupt("decoding value", e))
            })
            .transpose()
    }

    /// Writes a single record into `cf_name`, overwriting whatever was there.
    pub fn put<S: Schema>(
        &self,
        cf_name: &str,
        key: &impl KeyCodec<S>,
        value: &impl ValueCodec<S>,
    ) -> Result<()> {
        let key = key
            .encode_key()
            .map_err(|e| DerefMapError::corrupt("encoding put key", e))?;
        let value = value
            .encode_value()
            .map_err(|e| DerefMapError::corrupt("encoding put value", e))?;
        SCHEMADB_PUT_BYTES
            .with_label_values(&[cf_name])
            .observe((key.len() + value.len()) as f64);

        let cf_handle = self.cf_handle(cf_name)?;
        trace!(cf = cf_name, len = value.len(), "put");
        self.inner.put_cf(cf_handle, key, value)?;
        Ok(())
    }

    /// Deletes a single record from `cf_name`. A no-op if it doesn't exist
    /// (spec §4.3 `removeEntry` is idempotent).
    pub fn delete<S: Schema>(&self, cf_name: &str, key: &impl KeyCodec<S>) -> Result<()> {
        SCHEMADB_DELETES.with_label_values(&[cf_name]).inc();
        let key = key
            .encode_key()
            .map_err(|e| DerefMapError::corrupt("encoding delete key", e))?;
        let cf_handle = self.cf_handle(cf_name)?;
        self.inner.delete_cf(cf_handle, key)?;
        Ok(())
    }

    /// Opens a forward iterator over `cf_name`, starting unpositioned
    /// (caller must `seek`/`seek_to_first`).
    pub fn iter<S: Schema>(&self, cf_name: &str) -> Result<SchemaIterator<'_, S>> {
        let cf_handle = self.cf_handle(cf_name)?;
        let read_opts = rocksdb::ReadOptions::default();
        Ok(SchemaIterator::new(
            self.inner.raw_iterator_cf_opt(cf_handle, read_opts),
        ))
    }

    /// Opens a forward iterator over `cf_name`, positioned at the first key
    /// whose encoding is `>= seek_key`'s encoding.
    pub fn iter_from<S: Schema>(
        &self,
        cf_name: &str,
        seek_key: &impl SeekKeyEncoder<S>,
    ) -> Result<SchemaIterator<'_, S>> {
        let mut iter = self.iter::<S>(cf_name)?;
        iter.seek(seek_key)?;
        Ok(iter)
    }

    /// Drops (and forgets) a whole column family. Used by `DerefMap::delete`
    /// to release a dependency index that's no longer needed.
    pub fn drop_cf(&mut self, cf_name: &str) -> Result<()> {
        debug!(cf = cf_name, "dropping column family");
        self.inner.drop_cf(cf_name)?;
        Ok(())
    }

    /// Whether a column family with this name currently exists.
    pub fn has_cf(&self, cf_name: &str) -> bool {
        self.inner.cf_handle(cf_name).is_some()
    }

    /// Flushes a column family's memtable to disk, blocking until durable.
    pub fn flush_cf(&self, cf_name: &str) -> Result<()> {
        let cf_handle = self.cf_handle(cf_name)?;
        self.inner.flush_cf(cf_handle)?;
        Ok(())
    }
}
