// Concrete scenarios from spec §8, plus idempotence/shrink/crash-safety.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use deref_map::{DefaultIdGenerator, DependingRecord, DerefMap, DerefMapConfig, Entry, RecordId, SchemaId};
use tempfile::TempDir;

fn schema_id(byte: u8) -> SchemaId {
    let mut bytes = [0u8; 16];
    bytes[0] = byte;
    SchemaId::from_bytes(bytes)
}

fn record(name: &str) -> RecordId {
    RecordId::new(name.as_bytes().to_vec(), BTreeMap::new())
}

fn record_with_variants(master: &str, variants: &[(&str, &str)]) -> RecordId {
    RecordId::new(
        master.as_bytes().to_vec(),
        variants
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

struct Fixture {
    _tmpdir: TempDir,
    map: DerefMap,
}

impl Fixture {
    fn new() -> Self {
        let tmpdir = tempfile::tempdir().unwrap();
        let config = DerefMapConfig {
            path: tmpdir.path().to_path_buf(),
            rocksdb: Default::default(),
        };
        let map = DerefMap::create("test-index", &config, Arc::new(DefaultIdGenerator)).unwrap();
        Fixture { _tmpdir: tmpdir, map }
    }
}

fn deps(entries: Vec<(Entry, Vec<SchemaId>)>) -> BTreeMap<Entry, HashSet<SchemaId>> {
    entries
        .into_iter()
        .map(|(entry, fields)| (entry, fields.into_iter().collect()))
        .collect()
}

#[test]
fn scenario_1_add_one_dependency() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);
    let f2 = schema_id(0xf2);

    let entry = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry, vec![f1])]))
        .unwrap();

    let found: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2.clone(), v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![r1.clone()]);

    let none: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f2)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn scenario_2_wildcard_match() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let depending_en = record_with_variants("m", &[("lang", "en")]);
    let entry = Entry::new(
        DependingRecord::new(depending_en, v1),
        BTreeSet::from(["country".to_string()]),
    );
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry, vec![f1])]))
        .unwrap();

    let depending_en_us = record_with_variants("m", &[("lang", "en"), ("country", "us")]);
    let found: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(depending_en_us, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![r1]);

    // Cardinality mismatch: missing "country" entirely.
    let depending_en_only = record_with_variants("m", &[("lang", "en")]);
    let none: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(depending_en_only, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn scenario_3_remove_dependency() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let entry = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry, vec![f1])]))
        .unwrap();
    fx.map.update_dependencies(&r1, v1, &BTreeMap::new()).unwrap();

    let found: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn scenario_4_swap_dependency() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let r3 = record("r3");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let entry_r2 = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry_r2, vec![f1])]))
        .unwrap();

    let entry_r3 = Entry::new(DependingRecord::new(r3.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry_r3, vec![f1])]))
        .unwrap();

    let gone: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(gone.is_empty());

    let present: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r3, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(present, vec![r1]);
}

#[test]
fn scenario_5_two_dependants_via_same_field() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let r4 = record("r4");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let entry = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry.clone(), vec![f1])]))
        .unwrap();
    fx.map
        .update_dependencies(&r4, v1, &deps(vec![(entry, vec![f1])]))
        .unwrap();

    let mut found: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    found.sort();
    let mut expected = vec![r1, r4];
    expected.sort();
    assert_eq!(found, expected);
}

#[test]
fn scenario_6_multi_field() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);
    let f2 = schema_id(0xf2);
    let f3 = schema_id(0xf3);

    let entry = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry, vec![f1, f2])]))
        .unwrap();

    for (field, expect_match) in [(f1, true), (f2, true), (f3, false)] {
        let found: Vec<RecordId> = fx
            .map
            .find_dependants_of(&DependingRecord::new(r2.clone(), v1), field)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        if expect_match {
            assert_eq!(found, vec![r1.clone()]);
        } else {
            assert!(found.is_empty());
        }
    }
}

#[test]
fn idempotence() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let entry = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    let m = deps(vec![(entry, vec![f1])]);
    fx.map.update_dependencies(&r1, v1, &m).unwrap();
    fx.map.update_dependencies(&r1, v1, &m).unwrap();

    let found: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![r1]);
}

#[test]
fn shrink_leaves_no_stale_pointers() {
    let fx = Fixture::new();
    let r1 = record("r1");
    let r2 = record("r2");
    let r3 = record("r3");
    let v1 = schema_id(1);
    let f1 = schema_id(0xf1);

    let entry_r2 = Entry::new(DependingRecord::new(r2.clone(), v1), BTreeSet::new());
    let entry_r3 = Entry::new(DependingRecord::new(r3.clone(), v1), BTreeSet::new());
    fx.map
        .update_dependencies(
            &r1,
            v1,
            &deps(vec![(entry_r2.clone(), vec![f1]), (entry_r3.clone(), vec![f1])]),
        )
        .unwrap();

    fx.map
        .update_dependencies(&r1, v1, &deps(vec![(entry_r3, vec![f1])]))
        .unwrap();

    let gone: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r2, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(gone.is_empty());

    let present: Vec<RecordId> = fx
        .map
        .find_dependants_of(&DependingRecord::new(r3, v1), f1)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(present, vec![r1]);
}

#[test]
fn delete_requires_both_tables_present() {
    let tmpdir = tempfile::tempdir().unwrap();
    let config = DerefMapConfig {
        path: tmpdir.path().to_path_buf(),
        rocksdb: Default::default(),
    };
    let err = DerefMap::delete("never-created", &config).unwrap_err();
    assert!(matches!(err, deref_map::DerefMapError::IndexNotFound(_)));

    DerefMap::create("to-delete", &config, Arc::new(DefaultIdGenerator)).unwrap();
    DerefMap::delete("to-delete", &config).unwrap();
}
