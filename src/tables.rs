//! Column-family schemas for the forward and backward indices (spec §3, §4.1,
//! §6 "Persisted state layout").

use std::collections::HashSet;

use crate::codec::key::{KeyBuilder, KeyReader};
use crate::codec::value::{
    deserialize_depending_records_forward, deserialize_fields,
    deserialize_variant_properties_pattern, serialize_depending_records_forward,
    serialize_fields, serialize_variant_properties_pattern,
};
use crate::error::{CodecError, CodecResult};
use crate::pattern::VariantPropertiesPattern;
use crate::record::{DependingRecord, RecordId, SchemaId};
use crate::schema::{KeyDecoder, KeyEncoder, SeekKeyEncoder, ValueCodec};

/// Leading bytes of a [`RecordId`]'s encoding kept verbatim in composite
/// keys: byte 0 (type tag) and byte 1 (first byte of the master id) — see
/// [`crate::codec::key`].
const RECORD_ID_KEY_PREFIX: usize = 2;

// `ForwardSchema`/`BackwardSchema`'s `COLUMN_FAMILY_NAME` consts below are
// nominal defaults (used only for metrics labeling); the actual column
// family a `DerefMap` reads and writes is named deterministically from its
// index name (`deref-forward-{indexName}` / `deref-backward-{indexName}`,
// spec §6) and threaded explicitly through every `DB` call.

/// `(dependant_record_id, dependant_vtag)` — the forward index's key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ForwardKey {
    pub dependant: RecordId,
    pub dependant_vtag: SchemaId,
}

impl KeyEncoder<ForwardSchema> for ForwardKey {
    fn encode_key(&self) -> CodecResult<Vec<u8>> {
        Ok(KeyBuilder::new()
            .push_variable_with_prefix(&self.dependant.to_bytes(), RECORD_ID_KEY_PREFIX)?
            .push_fixed(self.dependant_vtag.as_bytes(), 16)?
            .finish())
    }
}

impl KeyDecoder<ForwardSchema> for ForwardKey {
    fn decode_key(data: &[u8]) -> CodecResult<Self> {
        let mut reader = KeyReader::new(data);
        let dependant_bytes =
            reader.read_variable_with_prefix(RECORD_ID_KEY_PREFIX, "forward key dependant id")?;
        let vtag_bytes = reader.read_fixed(16, "forward key dependant vtag")?;
        reader.finish("forward key")?;
        let mut vtag = [0u8; 16];
        vtag.copy_from_slice(vtag_bytes);
        Ok(ForwardKey {
            dependant: RecordId::from_bytes(&dependant_bytes)?,
            dependant_vtag: SchemaId::from_bytes(vtag),
        })
    }
}

/// The forward row's value: the set of records this dependant depends on.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ForwardValue(pub HashSet<DependingRecord>);

impl ValueCodec<ForwardSchema> for ForwardValue {
    fn encode_value(&self) -> CodecResult<Vec<u8>> {
        Ok(serialize_depending_records_forward(&self.0))
    }

    fn decode_value(data: &[u8]) -> CodecResult<Self> {
        Ok(ForwardValue(deserialize_depending_records_forward(data)?))
    }
}

crate::define_schema!(ForwardSchema, ForwardKey, ForwardValue, "deref-forward");

/// `(depending_master_record_id, depending_vtag, dependant_record_id)` — the
/// backward index's physical key. The dependant id is folded into the key
/// (rather than relying on backend multi-value rows) so multiple dependants
/// of the same depending record/vtag coexist as distinct rows sharing a
/// queryable prefix, the same way the teacher folds a secondary identifier
/// into a composite key to keep rows addressable and sorted.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BackwardKey {
    pub depending_master: Vec<u8>,
    pub depending_vtag: SchemaId,
    pub dependant_bytes: Vec<u8>,
}

impl KeyEncoder<BackwardSchema> for BackwardKey {
    fn encode_key(&self) -> CodecResult<Vec<u8>> {
        Ok(KeyBuilder::new()
            .push_variable_with_prefix(&self.depending_master, RECORD_ID_KEY_PREFIX)?
            .push_fixed(self.depending_vtag.as_bytes(), 16)?
            .push_variable_with_prefix(&self.dependant_bytes, 0)?
            .finish())
    }
}

impl KeyDecoder<BackwardSchema> for BackwardKey {
    fn decode_key(data: &[u8]) -> CodecResult<Self> {
        let mut reader = KeyReader::new(data);
        let depending_master =
            reader.read_variable_with_prefix(RECORD_ID_KEY_PREFIX, "backward key depending id")?;
        let vtag_bytes = reader.read_fixed(16, "backward key depending vtag")?;
        let dependant_bytes = reader.read_variable_with_prefix(0, "backward key dependant id")?;
        reader.finish("backward key")?;
        let mut vtag = [0u8; 16];
        vtag.copy_from_slice(vtag_bytes);
        Ok(BackwardKey {
            depending_master,
            depending_vtag: SchemaId::from_bytes(vtag),
            dependant_bytes,
        })
    }
}

/// Seeks to the first backward row for a given `(depending_master, vtag)`,
/// regardless of which dependant it belongs to (spec §4.5 step a).
pub struct BackwardPrefix {
    pub depending_master: Vec<u8>,
    pub depending_vtag: SchemaId,
}

impl SeekKeyEncoder<BackwardSchema> for BackwardPrefix {
    fn encode_seek_key(&self) -> CodecResult<Vec<u8>> {
        Ok(KeyBuilder::new()
            .push_variable_with_prefix(&self.depending_master, RECORD_ID_KEY_PREFIX)?
            .push_fixed(self.depending_vtag.as_bytes(), 16)?
            .finish())
    }
}

impl BackwardKey {
    /// Whether this row belongs to the `(depending_master, vtag)` group
    /// named by `prefix` — used to know when a prefix scan has run past its
    /// matching rows.
    pub fn matches_prefix(&self, prefix: &BackwardPrefix) -> bool {
        self.depending_master == prefix.depending_master && self.depending_vtag == prefix.depending_vtag
    }
}

/// The backward row's value: which fields the dependant depends through,
/// and the variant-properties pattern it must match against.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BackwardValue {
    pub fields: HashSet<SchemaId>,
    pub pattern: VariantPropertiesPattern,
}

impl ValueCodec<BackwardSchema> for BackwardValue {
    fn encode_value(&self) -> CodecResult<Vec<u8>> {
        let fields_bytes = serialize_fields(&self.fields);
        let pattern_bytes = serialize_variant_properties_pattern(&self.pattern);
        let mut out = Vec::with_capacity(4 + fields_bytes.len() + pattern_bytes.len());
        out.extend_from_slice(&(fields_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&fields_bytes);
        out.extend_from_slice(&pattern_bytes);
        Ok(out)
    }

    fn decode_value(data: &[u8]) -> CodecResult<Self> {
        if data.len() < 4 {
            return Err(CodecError::Truncated {
                what: "backward value fields length prefix",
            });
        }
        let (len_bytes, rest) = data.split_at(4);
        let fields_len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
        if rest.len() < fields_len {
            return Err(CodecError::Truncated {
                what: "backward value fields",
            });
        }
        let (fields_bytes, pattern_bytes) = rest.split_at(fields_len);
        Ok(BackwardValue {
            fields: deserialize_fields(fields_bytes)?,
            pattern: deserialize_variant_properties_pattern(pattern_bytes)?,
        })
    }
}

crate::define_schema!(BackwardSchema, BackwardKey, BackwardValue, "deref-backward");
