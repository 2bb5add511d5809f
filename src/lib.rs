// SPDX-License-Identifier: Apache-2.0
// Adapted from sov-schema-db/sov-db (Sovereign Labs), itself adapted from
// aptos-core/schemadb.

#![forbid(unsafe_code)]

//! A durable, bidirectional index of dereference-expression dependencies
//! between records: the Dereference Dependency Map (`DerefMap`).
//!
//! A search-indexing pipeline that keeps an external full-text index
//! synchronized with a record store needs to know, when a record changes,
//! which other records' indexed values were computed by dereferencing into
//! it and must therefore be re-indexed. `DerefMap` is that index: for every
//! `(dependant, vtag)` it records the set of records and vtags it depends
//! on, and supports the reverse lookup.
//!
//! See [`deref_map::DerefMap`] for the primary entry point.

pub mod codec;
pub mod db;
mod deref_map;
pub mod error;
mod iterator;
mod metrics;
pub mod pattern;
pub mod record;
pub mod rocks_db_config;
pub mod schema;
mod tables;

pub use deref_map::{DerefMap, DerefMapConfig};
pub use error::{CodecError, CodecResult, DerefMapError, Result};
pub use pattern::VariantPropertiesPattern;
pub use record::{
    DefaultIdGenerator, DependingRecord, Entry, IdGenerator, RecordId, SchemaId, VariantProperties,
};
