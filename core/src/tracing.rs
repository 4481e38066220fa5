//! Tracing utilities for query compilation and execution.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site. The feature check happens in the crate that invokes them.

/// Emit a debug-level event after a query description has been compiled.
///
/// ```ignore
/// relq_trace_compile!(entity, joins.len(), filter.params.len());
/// ```
#[macro_export]
macro_rules! relq_trace_compile {
    ($entity:expr, $joins:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(entity = %$entity, joins = $joins, params = $param_count, "relq.compile");
    };
}

/// Emit a debug-level event with the rendered SQL text and parameter count.
///
/// ```ignore
/// relq_trace_query!(&statement.sql, statement.params.len());
/// ```
#[macro_export]
macro_rules! relq_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(sql = %$sql, params = $param_count, "relq.query");
    };
}

/// Emit a debug-level event when a notification topic is published.
#[macro_export]
macro_rules! relq_trace_publish {
    ($topic:expr, $delivered:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(topic = %$topic, delivered = $delivered, "relq.publish");
    };
}
