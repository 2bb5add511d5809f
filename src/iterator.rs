// Adapted from sov-schema-db::iterator.

//! A schema-checked, forward-only cursor over a column family. The spec's
//! queries only ever scan forward over an equality prefix (§4.3, §4.7), so
//! unlike the teacher's iterator this one carries no reverse direction.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::error::{DerefMapError, Result};
use crate::metrics::{SCHEMADB_ITER_BYTES, SCHEMADB_ITER_LATENCY_SECONDS};
use crate::schema::{KeyDecoder, Schema, SeekKeyEncoder, ValueCodec};

/// DB iterator parameterized on [`Schema`]: seeks with `Schema::Key`,
/// yields `(Schema::Key, Schema::Value)` pairs.
pub struct SchemaIterator<'a, S> {
    db_iter: rocksdb::DBRawIterator<'a>,
    phantom: PhantomData<S>,
}

impl<'a, S> SchemaIterator<'a, S>
where
    S: Schema,
{
    pub(crate) fn new(db_iter: rocksdb::DBRawIterator<'a>) -> Self {
        SchemaIterator {
            db_iter,
            phantom: PhantomData,
        }
    }

    /// Seeks to the first key.
    pub fn seek_to_first(&mut self) {
        self.db_iter.seek_to_first();
    }

    /// Seeks to the first key whose binary representation is equal to or
    /// greater than that of `seek_key`.
    pub fn seek(&mut self, seek_key: &impl SeekKeyEncoder<S>) -> Result<()> {
        let key = seek_key
            .encode_seek_key()
            .map_err(|e| DerefMapError::corrupt("encoding seek key", e))?;
        self.db_iter.seek(&key);
        Ok(())
    }

    /// True as long as the cursor sits on a valid entry.
    pub fn valid(&self) -> bool {
        self.db_iter.valid()
    }

    fn next_impl(&mut self) -> Result<Option<IteratorOutput<S::Key, S::Value>>> {
        let _timer = SCHEMADB_ITER_LATENCY_SECONDS
            .with_label_values(&[S::COLUMN_FAMILY_NAME])
            .start_timer();

        if !self.db_iter.valid() {
            self.db_iter.status()?;
            return Ok(None);
        }

        let raw_key = self.db_iter.key().expect("db_iter.key() failed").to_vec();
        let raw_value = self.db_iter.value().expect("db_iter.value() failed").to_vec();
        SCHEMADB_ITER_BYTES
            .with_label_values(&[S::COLUMN_FAMILY_NAME])
            .observe((raw_key.len() + raw_value.len()) as f64);

        // Advance past this row before decoding: a decode failure is fatal
        // only for this row (spec §7), so a caller that logs and calls
        // `next()` again must land on the row after it, not re-read the
        // same bytes forever.
        self.db_iter.next();

        let key = <S::Key as KeyDecoder<S>>::decode_key(&raw_key)
            .map_err(|e| DerefMapError::corrupt("decoding iterator key", e))?;
        let value = <S::Value as ValueCodec<S>>::decode_value(&raw_value)
            .map_err(|e| DerefMapError::corrupt("decoding iterator value", e))?;

        Ok(Some(IteratorOutput { key, value }))
    }
}

/// One row read back from a [`SchemaIterator`].
pub struct IteratorOutput<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> IteratorOutput<K, V> {
    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<'a, S> Iterator for SchemaIterator<'a, S>
where
    S: Schema,
{
    type Item = Result<IteratorOutput<S::Key, S::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_impl().transpose()
    }
}

impl<'a, S> FusedIterator for SchemaIterator<'a, S> where S: Schema {}
