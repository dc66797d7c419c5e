//! Diagnostics sink
//!
//! Compile and link failures, missing-uniform lookups, and success
//! confirmations flow through one sink so hosts can redirect or capture
//! them. The default sink forwards onto the `log` facade.

use std::sync::Arc;

/// Structured diagnostics consumer
pub trait DiagnosticsSink: Send + Sync {
    /// Report an error condition
    fn log_error(&self, tag: &str, message: &str);

    /// Report informational output at a verbosity level
    fn log_info(&self, verbosity: u32, tag: &str, message: &str);
}

/// Shared handle to a diagnostics sink
pub type SharedSink = Arc<dyn DiagnosticsSink>;

/// Sink forwarding onto the `log` facade.
///
/// Verbosity 0 and 1 map to `info`, 2 to `debug`, anything higher to
/// `trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn log_error(&self, tag: &str, message: &str) {
        log::error!("{} {}", tag, message);
    }

    fn log_info(&self, verbosity: u32, tag: &str, message: &str) {
        match verbosity {
            0 | 1 => log::info!("{} {}", tag, message),
            2 => log::debug!("{} {}", tag, message),
            _ => log::trace!("{} {}", tag, message),
        }
    }
}
