use once_cell::sync::Lazy;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, HistogramVec,
    IntCounterVec,
};

pub static SCHEMADB_ITER_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_iter_latency_seconds",
        "Schemadb iter latency in seconds",
        &["cf_name"],
        exponential_buckets(1e-6, 2.0, 22).unwrap()
    )
    .unwrap()
});

pub static SCHEMADB_ITER_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_iter_bytes",
        "Schemadb iter size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_GET_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_get_latency_seconds",
        "Schemadb get latency in seconds",
        &["cf_name"],
        exponential_buckets(1e-6, 2.0, 22).unwrap()
    )
    .unwrap()
});

pub static SCHEMADB_GET_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_get_bytes",
        "Schemadb get call returned data size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_BATCH_COMMIT_LATENCY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_batch_commit_latency_seconds",
        "Schemadb schema batch commit latency in seconds",
        &["db_name"],
        exponential_buckets(1e-3, 2.0, 20).unwrap()
    )
    .unwrap()
});

pub static SCHEMADB_BATCH_COMMIT_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_batch_commit_bytes",
        "Schemadb schema batch commit size in bytes",
        &["db_name"]
    )
    .unwrap()
});

pub static SCHEMADB_PUT_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_schemadb_put_bytes",
        "Schemadb put call puts data size in bytes",
        &["cf_name"]
    )
    .unwrap()
});

pub static SCHEMADB_DELETES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rollapp_keeper_schemadb_deletes",
        "Schemadb delete calls",
        &["cf_name"]
    )
    .unwrap()
});

pub static QUERY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rollapp_keeper_query_requests",
        "Query handler calls by method and gRPC code",
        &["method", "code"]
    )
    .unwrap()
});

pub static QUERY_PAGE_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "rollapp_keeper_query_page_size",
        "Records returned per paginated query",
        &["cf_name"],
        exponential_buckets(1.0, 2.0, 12).unwrap()
    )
    .unwrap()
});
