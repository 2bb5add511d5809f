//! Record identity model (spec §3, §6, component C3).
//!
//! The record store itself is an external collaborator (spec §1 "out of
//! scope"); this module defines only the shapes the `DerefMap` needs to name
//! records and schemas, plus the [`IdGenerator`] contract a record store
//! implements to hand the `DerefMap` concrete, round-trippable identities.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CodecError, CodecResult};

/// Opaque 16-byte identifier, derived from a 128-bit UUID. Used for field
/// ids, record-type ids, and version tags.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SchemaId([u8; 16]);

impl SchemaId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Exactly 16 bytes, per spec §6.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Stable string form: the canonical 8-4-4-4-12 hex UUID (spec §6).
    pub fn to_uuid_string(&self) -> String {
        Uuid::from_bytes(self.0).to_string()
    }

    pub fn from_uuid_string(s: &str) -> CodecResult<Self> {
        let uuid = Uuid::parse_str(s).map_err(|e| CodecError::Other(e.into()))?;
        Ok(Self(*uuid.as_bytes()))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid_string())
    }
}

/// An ordered map of variant-dimension names to concrete values, e.g.
/// `{"lang": "en", "country": "us"}`. Ordered by key so two maps with the
/// same entries always compare and encode identically (spec §3).
pub type VariantProperties = BTreeMap<String, String>;

/// A record identity: a master id plus the variant dimensions that qualify
/// which version/locale/etc. of that master this identity names (spec §3).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct RecordId {
    master: Vec<u8>,
    variant_properties: VariantProperties,
}

impl RecordId {
    pub fn new(master: Vec<u8>, variant_properties: VariantProperties) -> Self {
        Self {
            master,
            variant_properties,
        }
    }

    pub fn master(&self) -> &[u8] {
        &self.master
    }

    pub fn variant_properties(&self) -> &VariantProperties {
        &self.variant_properties
    }

    /// The master-only identity: same master bytes, no variant properties
    /// (spec §3 invariant 3 — forward entries store only this).
    pub fn get_master(&self) -> RecordId {
        RecordId {
            master: self.master.clone(),
            variant_properties: VariantProperties::new(),
        }
    }

    /// The master-only identity's key-codec bytes (`get_master().to_bytes()`).
    /// Always at least 2 bytes (the type tag plus a leading byte, 0 when
    /// `master` is empty), unlike `master()` itself — used everywhere a
    /// backward key's `prefix = 2` verbatim leading zone (spec §4.1) is
    /// built from a depending record's master id, so a short or empty
    /// user-chosen master id never falls short of the prefix.
    pub fn master_key_bytes(&self) -> Vec<u8> {
        self.get_master().to_bytes()
    }

    /// Round-trippable byte form (spec §3/§6). Byte 0 is a type
    /// discriminator, byte 1 is the first byte of `master` — both must
    /// survive into the leading verbatim zone of a composite key built with
    /// `prefix = 2` (spec §4.1).
    pub fn to_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Wire<'a> {
            master: &'a [u8],
            // BTreeMap iteration is already key-sorted; a sorted Vec of
            // pairs round-trips identically and memcomparable's serde
            // impl doesn't support `serialize_map`.
            variants: Vec<(&'a str, &'a str)>,
        }
        let mut out = vec![RECORD_ID_TYPE_TAG];
        out.push(self.master.first().copied().unwrap_or(0));
        let body = bincode_like_encode(&Wire {
            master: &self.master,
            variants: self
                .variant_properties
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        });
        out.extend_from_slice(&body);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < 2 || bytes[0] != RECORD_ID_TYPE_TAG {
            return Err(CodecError::Other(anyhow::anyhow!(
                "not a valid RecordId encoding"
            )));
        }
        #[derive(Deserialize)]
        struct Wire {
            master: Vec<u8>,
            variants: Vec<(String, String)>,
        }
        let wire: Wire = bincode_like_decode(&bytes[2..])?;
        Ok(RecordId::new(
            wire.master,
            wire.variants.into_iter().collect(),
        ))
    }
}

const RECORD_ID_TYPE_TAG: u8 = 1;

// `RecordId::to_bytes`/`from_bytes` only need to round-trip (they are not
// themselves part of the ordered key layout; the key codec re-encodes them
// with the order-preserving scheme), so a plain length-prefixed bincode
// encoding is enough here. Kept local and tiny rather than pulling in a
// second serialization crate just for this.
fn bincode_like_encode<T: Serialize>(value: &T) -> Vec<u8> {
    let mut ser = memcomparable::Serializer::new(Vec::new());
    value
        .serialize(&mut ser)
        .expect("in-memory RecordId encoding is infallible");
    ser.into_inner()
}

fn bincode_like_decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> CodecResult<T> {
    let mut de = memcomparable::Deserializer::new(bytes);
    let value = T::deserialize(&mut de)?;
    Ok(value)
}

/// `(recordId, vtag)`: the depending-record half of a dependency relation
/// (spec §3).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DependingRecord {
    pub record_id: RecordId,
    pub vtag: SchemaId,
}

impl std::hash::Hash for RecordId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.master.hash(state);
        for (k, v) in &self.variant_properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl DependingRecord {
    pub fn new(record_id: RecordId, vtag: SchemaId) -> Self {
        Self { record_id, vtag }
    }

    /// Identity used when diffing forward sets: compared by `(master, vtag)`
    /// only, per spec §4.4 step 2.
    pub fn master_identity(&self) -> (Vec<u8>, SchemaId) {
        (self.record_id.master().to_vec(), self.vtag)
    }
}

/// `(dependingRecord, moreDimensionedVariants)` (spec §3): one key of the
/// `newDependencies` multimap passed to `updateDependencies`. The second
/// field names variant dimensions beyond those already concrete in
/// `depending.record_id`, widened to wildcards when building the backward
/// row's pattern (spec §4.6).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Entry {
    pub depending: DependingRecord,
    pub more_dimensioned_variants: BTreeSet<String>,
}

impl Entry {
    pub fn new(depending: DependingRecord, more_dimensioned_variants: BTreeSet<String>) -> Self {
        Self {
            depending,
            more_dimensioned_variants,
        }
    }
}

/// Consumed contract of the external record store (spec §6): turns raw
/// bytes read back from the backend into structured identities. The
/// `DerefMap` never invents record-id or schema-id structure itself — only
/// the record store understands it.
pub trait IdGenerator: Send + Sync {
    /// Parses bytes previously produced by [`RecordId::to_bytes`].
    fn record_id_from_bytes(&self, bytes: &[u8]) -> CodecResult<RecordId>;
    /// Parses a 16-byte schema id.
    fn schema_id_from_bytes(&self, bytes: &[u8]) -> CodecResult<SchemaId> {
        if bytes.len() != 16 {
            return Err(CodecError::InvalidLength {
                expected: 16,
                got: bytes.len(),
            });
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(bytes);
        Ok(SchemaId::from_bytes(buf))
    }
}

/// The reference [`IdGenerator`]: round-trips the [`RecordId`] encoding this
/// crate defines. A record store with its own id layout supplies its own
/// `IdGenerator` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultIdGenerator;

impl IdGenerator for DefaultIdGenerator {
    fn record_id_from_bytes(&self, bytes: &[u8]) -> CodecResult<RecordId> {
        RecordId::from_bytes(bytes)
    }
}
