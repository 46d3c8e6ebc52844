use std::fmt;

use crate::error::ExchangeError;

/// Request-scoped logger.
///
/// `ExchangeLog` is obtained from [`crate::Exchange::log`] and borrows the
/// exchange's request id, so every event it emits can be correlated with the
/// request that caused it.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeLog<'a> {
    request_id: &'a str,
}

impl<'a> ExchangeLog<'a> {
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request id attached to every event.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// Use with `format_args!`:
    /// ```no_run
    /// # use gateway_core::{Exchange, Request};
    /// # let exchange = Exchange::new(Request::get("/"));
    /// exchange.log().info(format_args!("routing to {}", "backend-1"));
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a trace-level message with request ID.
    pub fn trace(&self, args: fmt::Arguments<'_>) {
        tracing::trace!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a swallowed processing failure at WARN, with its source chain.
    pub fn failure(&self, err: &ExchangeError) {
        tracing::warn!(
            request_id = %self.request_id,
            kind = %err.kind(),
            error = %err.report(),
            "An exception occurred while handling a request"
        );
    }
}
