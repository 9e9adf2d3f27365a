//! Prometheus metrics registry. Counters are process-global (`lazy_static`)
//! since every component that touches them runs inside the same process
//! and has no natural owner to thread a registry handle through.

use lazy_static::lazy_static;
use prometheus::{CounterVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder, register_counter_vec_with_registry, register_int_counter_vec_with_registry, register_int_counter_with_registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    static ref CONNECTIONS_ACCEPTED: IntCounter = register_int_counter_with_registry!(
        Opts::new("melodious_connections_accepted_total", "TCP connections accepted"),
        REGISTRY
    )
    .unwrap();
    static ref MESSAGES_DISPATCHED: IntCounterVec = register_int_counter_vec_with_registry!(
        Opts::new("melodious_messages_dispatched_total", "Inbound messages dispatched, by verb"),
        &["verb"],
        REGISTRY
    )
    .unwrap();
    static ref PERMISSION_DENIALS: IntCounter = register_int_counter_with_registry!(
        Opts::new("melodious_permission_denials_total", "Handler invocations rejected for lack of permission"),
        REGISTRY
    )
    .unwrap();
    static ref STORE_ERRORS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("melodious_store_errors_total", "Store operations that returned an error, by entity"),
        &["entity"],
        REGISTRY
    )
    .unwrap();
    static ref RETENTION_ROWS_PRUNED: IntCounter = register_int_counter_with_registry!(
        Opts::new("melodious_retention_rows_pruned_total", "Chat message rows deleted by the retention task"),
        REGISTRY
    )
    .unwrap();
}

pub fn record_connection_accepted() {
    CONNECTIONS_ACCEPTED.inc();
}

pub fn record_message_dispatched(verb: &str) {
    MESSAGES_DISPATCHED.with_label_values(&[verb]).inc();
}

pub fn record_permission_denial() {
    PERMISSION_DENIALS.inc();
}

pub fn record_store_error(entity: &str) {
    STORE_ERRORS.with_label_values(&[entity]).inc();
}

pub fn record_retention_run(rows_pruned: u64) {
    RETENTION_ROWS_PRUNED.inc_by(rows_pruned);
}

pub fn encode() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
