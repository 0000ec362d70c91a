//! Process-wide logging setup shared by the binaries.

/// Initialize structured logging with the default `info` filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Subscriber configuration (filters, output format).
pub mod tracing;
