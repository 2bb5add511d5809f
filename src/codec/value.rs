//! Per-entry payload encoding (spec §4.2, component C2): the forward
//! index's list of depending records, and the backward index's field set and
//! variant-properties pattern.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_bytes::{ByteBuf, Bytes};

use crate::error::{CodecError, CodecResult};
use crate::pattern::VariantPropertiesPattern;
use crate::record::{DependingRecord, RecordId, SchemaId};

const SCHEMA_ID_LEN: usize = 16;

/// `serializeDependingRecordsForward`: concatenated terminated records, each
/// `(variable-bytes master_id, fixed-bytes-16 vtag)`.
pub fn serialize_depending_records_forward(records: &HashSet<DependingRecord>) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        let master = record.record_id.master();
        let mut ser = memcomparable::Serializer::new(buf);
        Bytes::new(master)
            .serialize(&mut ser)
            .expect("in-memory encoding is infallible");
        buf = ser.into_inner();
        buf.extend_from_slice(record.vtag.as_bytes());
    }
    buf
}

/// `deserializeDependingRecordsForward`: consumes until the byte stream is
/// exhausted.
pub fn deserialize_depending_records_forward(
    data: &[u8],
) -> CodecResult<HashSet<DependingRecord>> {
    let mut out = HashSet::new();
    let mut rest = data;
    while !rest.is_empty() {
        let mut de = memcomparable::Deserializer::new(rest);
        let master: ByteBuf = ByteBuf::deserialize(&mut de)?;
        let consumed = de.position();
        rest = &rest[consumed..];
        if rest.len() < SCHEMA_ID_LEN {
            return Err(CodecError::Truncated {
                what: "forward depending-record vtag",
            });
        }
        let (vtag_bytes, tail) = rest.split_at(SCHEMA_ID_LEN);
        rest = tail;
        let mut vtag = [0u8; SCHEMA_ID_LEN];
        vtag.copy_from_slice(vtag_bytes);
        out.insert(DependingRecord::new(
            RecordId::new(master.into_vec(), Default::default()),
            SchemaId::from_bytes(vtag),
        ));
    }
    Ok(out)
}

/// `serializeFields`: concatenation of 16-byte schema ids. Sorted for
/// determinism even though set semantics don't require it (spec §4.2).
pub fn serialize_fields(fields: &HashSet<SchemaId>) -> Vec<u8> {
    let mut sorted: Vec<&SchemaId> = fields.iter().collect();
    sorted.sort();
    let mut buf = Vec::with_capacity(sorted.len() * SCHEMA_ID_LEN);
    for field in sorted {
        buf.extend_from_slice(field.as_bytes());
    }
    buf
}

/// `deserializeFields`: recovers the set by fixed-width slicing.
pub fn deserialize_fields(data: &[u8]) -> CodecResult<HashSet<SchemaId>> {
    if !data.len().is_multiple_of(SCHEMA_ID_LEN) {
        return Err(CodecError::TrailingBytes {
            what: "fields (not a multiple of 16 bytes)",
        });
    }
    Ok(data
        .chunks_exact(SCHEMA_ID_LEN)
        .map(|chunk| {
            let mut buf = [0u8; SCHEMA_ID_LEN];
            buf.copy_from_slice(chunk);
            SchemaId::from_bytes(buf)
        })
        .collect())
}

/// `serializeVariantPropertiesPattern`: flat sequence of terminated string
/// fields, alternating name, value (value may be a null marker).
pub fn serialize_variant_properties_pattern(pattern: &VariantPropertiesPattern) -> Vec<u8> {
    let mut buf = Vec::new();
    for (name, value) in pattern.entries() {
        let mut ser = memcomparable::Serializer::new(buf);
        name.serialize(&mut ser)
            .expect("in-memory encoding is infallible");
        value
            .serialize(&mut ser)
            .expect("in-memory encoding is infallible");
        buf = ser.into_inner();
    }
    buf
}

/// `deserializeVariantPropertiesPattern`: reconstructs the set of
/// `(name, value?)` pairs; map iteration order at serialization time is not
/// observable.
pub fn deserialize_variant_properties_pattern(
    data: &[u8],
) -> CodecResult<VariantPropertiesPattern> {
    let mut entries = BTreeMap::new();
    let mut rest = data;
    while !rest.is_empty() {
        let mut de = memcomparable::Deserializer::new(rest);
        let name = String::deserialize(&mut de)?;
        let value = Option::<String>::deserialize(&mut de)?;
        let consumed = de.position();
        rest = &rest[consumed..];
        entries.insert(name, value);
    }
    Ok(VariantPropertiesPattern::new(entries))
}
