//! The Dereference Dependency Map itself (spec §4.4-§4.7, §6, component C5):
//! the forward/backward index pair, the update protocol, and the query
//! protocol.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::DB;
use crate::error::{DerefMapError, Result};
use crate::iterator::SchemaIterator;
use crate::record::{DependingRecord, Entry, IdGenerator, RecordId, SchemaId, VariantProperties};
use crate::rocks_db_config::{gen_rocksdb_options, RocksdbConfig};
use crate::tables::{
    BackwardKey, BackwardPrefix, BackwardSchema, BackwardValue, ForwardKey, ForwardSchema,
    ForwardValue,
};
use crate::pattern::VariantPropertiesPattern;

/// Ambient configuration for a [`DerefMap`]: where its backing RocksDB
/// database lives, and how that database is tuned.
#[derive(Clone, Debug)]
pub struct DerefMapConfig {
    pub path: PathBuf,
    pub rocksdb: RocksdbConfig,
}

fn forward_cf_name(index_name: &str) -> String {
    format!("deref-forward-{index_name}")
}

fn backward_cf_name(index_name: &str) -> String {
    format!("deref-backward-{index_name}")
}

/// A durable, bidirectional index of dereference-expression dependencies
/// between records (spec §1).
///
/// Every write goes through [`DerefMap::update_dependencies`], which
/// applies the three-step ordered protocol of spec §4.4: that ordering, not
/// cross-call transactions, is what keeps the index crash-safe (spec §5,
/// §7 — see the module-level error documentation in [`crate::error`]).
pub struct DerefMap {
    db: DB,
    forward_cf: String,
    backward_cf: String,
    id_generator: Arc<dyn IdGenerator>,
}

impl DerefMap {
    /// Opens or creates the forward and backward tables for `index_name`
    /// (spec §6): `deref-forward-{index_name}` and
    /// `deref-backward-{index_name}`.
    pub fn create(
        index_name: &str,
        config: &DerefMapConfig,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let forward_cf = forward_cf_name(index_name);
        let backward_cf = backward_cf_name(index_name);
        let opts = gen_rocksdb_options(&config.rocksdb, false);
        debug!(index = index_name, "opening deref map");
        let db = DB::open(
            &config.path,
            "deref-map",
            [forward_cf.clone(), backward_cf.clone()],
            &opts,
        )?;
        Ok(Self {
            db,
            forward_cf,
            backward_cf,
            id_generator,
        })
    }

    /// Drops both of `index_name`'s tables. Fails with `IndexNotFound` if
    /// either is absent (spec §6).
    pub fn delete(index_name: &str, config: &DerefMapConfig) -> Result<()> {
        let forward_cf = forward_cf_name(index_name);
        let backward_cf = backward_cf_name(index_name);
        let opts = gen_rocksdb_options(&config.rocksdb, false);
        let mut db = DB::open(&config.path, "deref-map", [], &opts)?;
        if !db.has_cf(&forward_cf) || !db.has_cf(&backward_cf) {
            return Err(DerefMapError::IndexNotFound(index_name.to_string()));
        }
        db.drop_cf(&forward_cf)?;
        db.drop_cf(&backward_cf)?;
        Ok(())
    }

    /// The update protocol (spec §4.4). Not safe to call concurrently for
    /// the same `(dependant, dependant_vtag)` pair — serialization is the
    /// caller's responsibility (spec §5).
    pub fn update_dependencies(
        &self,
        dependant: &RecordId,
        dependant_vtag: SchemaId,
        new_dependencies: &BTreeMap<Entry, HashSet<SchemaId>>,
    ) -> Result<()> {
        let forward_key = ForwardKey {
            dependant: dependant.clone(),
            dependant_vtag,
        };

        // Step 1: read old. A point `get` on the forward key can never
        // return more than one row, so the spec's `InvariantViolation` for
        // "forward query yields >1 row" can't arise through this backend —
        // it remains part of the error model for backends where it could.
        let existing = self
            .db
            .get::<ForwardSchema>(&self.forward_cf, &forward_key)?
            .map(|ForwardValue(set)| set)
            .unwrap_or_default();

        // Step 2: diff by (master, vtag).
        let new_master_vtags: HashSet<(Vec<u8>, SchemaId)> = new_dependencies
            .keys()
            .map(|entry| entry.depending.master_identity())
            .collect();
        let removed: Vec<&DependingRecord> = existing
            .iter()
            .filter(|d| !new_master_vtags.contains(&d.master_identity()))
            .collect();

        let existing_master_vtags: HashSet<(Vec<u8>, SchemaId)> =
            existing.iter().map(|d| d.master_identity()).collect();
        // Dedup by (master, vtag): the first `Entry` seen per depending
        // record wins (spec §9 open question — matched, not resolved).
        let mut added: Vec<&Entry> = Vec::new();
        let mut added_keys = HashSet::new();
        for entry in new_dependencies.keys() {
            let key = entry.depending.master_identity();
            if existing_master_vtags.contains(&key) {
                continue;
            }
            if !added_keys.insert(key.clone()) {
                debug!(
                    depending_vtag = %key.1,
                    "duplicate Entry for depending record in update_dependencies, keeping first occurrence's pattern"
                );
                continue;
            }
            added.push(entry);
        }

        debug!(
            dependant_vtag = %dependant_vtag,
            removed = removed.len(),
            added = added.len(),
            "updating dependencies"
        );

        // Step 3.1: remove backward entries no longer implied by the new
        // forward state, before that state is written.
        let dependant_bytes = dependant.to_bytes();
        for d in &removed {
            let backward_key = BackwardKey {
                depending_master: d.record_id.master_key_bytes(),
                depending_vtag: d.vtag,
                dependant_bytes: dependant_bytes.clone(),
            };
            self.db.delete::<BackwardSchema>(&self.backward_cf, &backward_key)?;
        }

        // Step 3.2: overwrite the forward entry with the new state. Only
        // the master portion of each depending record is stored (invariant
        // 3, spec §3).
        let new_forward_value: HashSet<DependingRecord> = new_dependencies
            .keys()
            .map(|entry| DependingRecord::new(entry.depending.record_id.get_master(), entry.depending.vtag))
            .collect();
        self.db.put::<ForwardSchema>(
            &self.forward_cf,
            &forward_key,
            &ForwardValue(new_forward_value),
        )?;

        // Step 3.3: add backward entries that now correspond to the new
        // forward state, after that state is durable.
        for entry in added {
            let fields = new_dependencies.get(entry).cloned().unwrap_or_default();
            let pattern = VariantPropertiesPattern::build(
                entry.depending.record_id.variant_properties(),
                &entry
                    .more_dimensioned_variants
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>(),
            );
            let backward_key = BackwardKey {
                depending_master: entry.depending.record_id.master_key_bytes(),
                depending_vtag: entry.depending.vtag,
                dependant_bytes: dependant_bytes.clone(),
            };
            self.db.put::<BackwardSchema>(
                &self.backward_cf,
                &backward_key,
                &BackwardValue { fields, pattern },
            )?;
        }

        Ok(())
    }

    /// The query protocol (spec §4.5): a forward-only, single-pass cursor
    /// over every dependant of `depending` via `field`.
    pub fn find_dependants_of(
        &self,
        depending: &DependingRecord,
        field: SchemaId,
    ) -> Result<DependantsCursor<'_>> {
        let prefix = BackwardPrefix {
            depending_master: depending.record_id.master_key_bytes(),
            depending_vtag: depending.vtag,
        };
        let iter = self
            .db
            .iter_from::<BackwardSchema>(&self.backward_cf, &prefix)?;
        Ok(DependantsCursor {
            iter,
            prefix,
            target_variant_properties: depending.record_id.variant_properties().clone(),
            field,
            id_generator: self.id_generator.clone(),
            slot: None,
            exhausted: false,
        })
    }
}

/// The dependant-ids cursor of spec §4.5/§4.7: forward-only, single-pass,
/// and not restartable. Implements [`Iterator`] directly; [`Self::has_next`]
/// is offered alongside it for callers that want the spec's named
/// `hasNext`/`next` pair — both share the same one-slot lookahead buffer,
/// so calling either after the other stays well-defined. Not safe to
/// advance from more than one thread at a time (spec §4.7).
pub struct DependantsCursor<'a> {
    iter: SchemaIterator<'a, BackwardSchema>,
    prefix: BackwardPrefix,
    target_variant_properties: VariantProperties,
    field: SchemaId,
    id_generator: Arc<dyn IdGenerator>,
    slot: Option<RecordId>,
    exhausted: bool,
}

impl<'a> DependantsCursor<'a> {
    /// Populates the lookahead slot if empty, then reports whether it's
    /// occupied.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.slot.is_some() {
            return Ok(true);
        }
        self.slot = self.advance()?;
        Ok(self.slot.is_some())
    }

    /// Returns and clears the lookahead slot, populating it first if empty.
    pub fn next_dependant(&mut self) -> Result<Option<RecordId>> {
        if let Some(record_id) = self.slot.take() {
            return Ok(Some(record_id));
        }
        self.advance()
    }

    fn advance(&mut self) -> Result<Option<RecordId>> {
        if self.exhausted {
            return Ok(None);
        }
        for row in self.iter.by_ref() {
            // A row that fails to decode is fatal for that row, not for
            // the whole scan (spec §7): log it and move on to the next
            // one rather than aborting `find_dependants_of` entirely. The
            // underlying iterator has already advanced past it (see
            // `SchemaIterator::next_impl`), so this can't loop forever.
            let output = match row {
                Ok(output) => output,
                Err(err) => {
                    warn!(error = %err, "skipping corrupt backward row");
                    continue;
                }
            };
            if !output.key.matches_prefix(&self.prefix) {
                break;
            }
            if output.value.fields.contains(&self.field)
                && output.value.pattern.matches(&self.target_variant_properties)
            {
                match self
                    .id_generator
                    .record_id_from_bytes(&output.key.dependant_bytes)
                {
                    Ok(record_id) => return Ok(Some(record_id)),
                    Err(e) => {
                        warn!(error = %e, "skipping backward row with corrupt dependant id");
                        continue;
                    }
                }
            }
        }
        self.exhausted = true;
        Ok(None)
    }
}

impl<'a> Iterator for DependantsCursor<'a> {
    type Item = Result<RecordId>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_dependant().transpose()
    }
}

impl<'a> Drop for DependantsCursor<'a> {
    fn drop(&mut self) {
        if !self.exhausted {
            warn!("dependants cursor dropped before exhaustion");
        }
    }
}
