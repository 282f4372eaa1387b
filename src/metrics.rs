// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

/// Registers descriptions for every metric the SDK emits.
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "rpc_calls_total",
        Unit::Count,
        "Total number of JSON-RPC calls issued, labeled by component and method."
    );
    describe_counter!(
        "pair_resolutions_total",
        Unit::Count,
        "Total number of pair context resolutions, labeled by result (ok or error code)."
    );
    describe_counter!(
        "token_registry_hits_total",
        Unit::Count,
        "Total number of token descriptors served from the static registry."
    );
    describe_histogram!(
        "multicall_batch_size",
        Unit::Count,
        "Number of sub-calls packed into each aggregate3 request."
    );
}

pub fn increment_rpc_call(component: &'static str, method: &'static str) {
    counter!("rpc_calls_total", 1, "component" => component, "method" => method);
}

pub fn increment_pair_resolution(result: &'static str) {
    counter!("pair_resolutions_total", 1, "result" => result);
}

pub fn increment_registry_hits(count: u64) {
    counter!("token_registry_hits_total", count);
}

pub fn record_multicall_batch_size(size: usize) {
    histogram!("multicall_batch_size", size as f64);
}
