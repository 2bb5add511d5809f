// Adapted from sov-schema-db::metrics.

use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, HistogramVec,
    IntCounterVec,
};

pub static SCHEMADB_ITER_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "deref_map_iter_latency_seconds",
        "DerefMap column family iter latency in seconds",
        &["cf_name"],
        exponential_buckets(1e-6, 2.0, 22).unwrap(),
    )
    .unwrap()
});

pub static SCHEMADB_ITER_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "deref_map_iter_bytes",
        "DerefMap column family iter size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_GET_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "deref_map_get_latency_seconds",
        "DerefMap column family get latency in seconds",
        &["cf_name"],
        exponential_buckets(1e-6, 2.0, 22).unwrap(),
    )
    .unwrap()
});

pub static SCHEMADB_GET_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "deref_map_get_bytes",
        "DerefMap get call returned data size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_PUT_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "deref_map_put_bytes",
        "DerefMap put call data size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_DELETES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "deref_map_deletes",
        "DerefMap column family delete calls",
        &["cf_name"]
    )
    .unwrap()
});
