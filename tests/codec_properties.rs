// Round-trip and pattern-matching laws (spec §8).

use std::collections::{BTreeMap, HashSet};

use deref_map::codec::value::{
    deserialize_depending_records_forward, deserialize_fields,
    deserialize_variant_properties_pattern, serialize_depending_records_forward,
    serialize_fields, serialize_variant_properties_pattern,
};
use deref_map::{DependingRecord, RecordId, SchemaId, VariantPropertiesPattern};
use proptest::prelude::*;

fn arb_schema_id() -> impl Strategy<Value = SchemaId> {
    any::<[u8; 16]>().prop_map(SchemaId::from_bytes)
}

fn arb_variant_properties() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,8}", 0..4)
}

fn arb_record_id() -> impl Strategy<Value = RecordId> {
    (prop::collection::vec(any::<u8>(), 0..12), arb_variant_properties())
        .prop_map(|(master, variants)| RecordId::new(master, variants))
}

fn arb_depending_record() -> impl Strategy<Value = DependingRecord> {
    (arb_record_id(), arb_schema_id())
        .prop_map(|(record_id, vtag)| DependingRecord::new(record_id.get_master(), vtag))
}

proptest! {
    #[test]
    fn forward_depending_records_round_trip(records in prop::collection::hash_set(arb_depending_record(), 0..10)) {
        let bytes = serialize_depending_records_forward(&records);
        let decoded = deserialize_depending_records_forward(&bytes).unwrap();
        prop_assert_eq!(decoded, records);
    }

    #[test]
    fn fields_round_trip(fields in prop::collection::hash_set(arb_schema_id(), 0..10)) {
        let bytes = serialize_fields(&fields);
        prop_assert_eq!(bytes.len(), 16 * fields.len());
        let decoded = deserialize_fields(&bytes).unwrap();
        prop_assert_eq!(decoded, fields);
    }

    #[test]
    fn pattern_round_trip(
        entries in prop::collection::btree_map(
            "[a-z]{1,6}",
            prop::option::of("[a-z0-9]{0,8}"),
            0..5,
        ),
    ) {
        let pattern = VariantPropertiesPattern::new(entries);
        let bytes = serialize_variant_properties_pattern(&pattern);
        let decoded = deserialize_variant_properties_pattern(&bytes).unwrap();
        prop_assert_eq!(decoded, pattern);
    }

    #[test]
    fn record_id_round_trip(record_id in arb_record_id()) {
        let bytes = record_id.to_bytes();
        let decoded = RecordId::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded, record_id);
    }

    #[test]
    fn pattern_reflexivity(variants in arb_variant_properties()) {
        let pattern = VariantPropertiesPattern::build(&variants, &[]);
        prop_assert!(pattern.matches(&variants));
    }

    #[test]
    fn pattern_wildcard_matches_any_value(variants in arb_variant_properties()) {
        let names: Vec<String> = variants.keys().cloned().collect();
        let pattern = VariantPropertiesPattern::build(&BTreeMap::new(), &names);
        prop_assert!(pattern.matches(&variants));
    }
}

#[test]
fn pattern_cardinality_discrimination() {
    let mut narrower = BTreeMap::new();
    narrower.insert("n".to_string(), "v1".to_string());
    let pattern = VariantPropertiesPattern::build(&narrower, &[]);

    let mut wider = BTreeMap::new();
    wider.insert("n".to_string(), "v1".to_string());
    wider.insert("m".to_string(), "v2".to_string());

    assert!(!pattern.matches(&wider));
}

#[test]
fn fields_empty_round_trips() {
    let fields: HashSet<SchemaId> = HashSet::new();
    let bytes = serialize_fields(&fields);
    assert!(bytes.is_empty());
    assert_eq!(deserialize_fields(&bytes).unwrap(), fields);
}

#[test]
fn fields_rejects_misaligned_length() {
    let err = deserialize_fields(&[0u8; 17]).unwrap_err();
    assert!(matches!(err, deref_map::CodecError::TrailingBytes { .. }));
}
