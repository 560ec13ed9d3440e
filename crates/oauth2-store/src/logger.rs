//! Logger capability for background sweep failures.
//!
//! Only the token store's sweep reports through a [`Logger`]; foreground
//! operations always return their errors to the caller.

use std::fmt;

/// Prefix carried by every message of the default logger.
pub const LOG_PREFIX: &str = "[OAUTH2-PG-ERROR]";

/// Sink for errors that have no caller to be returned to.
pub trait Logger: Send + Sync {
    /// Record a formatted error message.
    fn printf(&self, args: fmt::Arguments<'_>);
}

/// Default logger: emits `tracing` error events under the `oauth2_store`
/// target, prefixed with [`LOG_PREFIX`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn printf(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "oauth2_store", "{LOG_PREFIX} {args}");
    }
}
