//! Top-level dispatch of one exchange through the interceptor chain.

use std::sync::Arc;

use crate::chain::InterceptorChain;
use crate::config::GatewayConfig;
use crate::error::{Disposition, ExchangeError};
use crate::exchange::Exchange;
use crate::formatter::ErrorFormatter;

/// Message of the failure raised when no stage produced a response.
pub const NO_RESPONSE_MESSAGE: &str = "No response was generated by the interceptor chain.";

/// Runs exchanges through an [`InterceptorChain`] and guarantees a response.
///
/// After [`ExchangeDispatcher::dispatch`] returns, the exchange always holds a
/// response: either the one a stage produced or one synthesized from the
/// failure. Connection-lifecycle failures are still returned to the caller
/// so the transport can decide what happens to the connection; all other
/// failures are logged and swallowed.
#[derive(Debug, Clone)]
pub struct ExchangeDispatcher {
    chain: Arc<InterceptorChain>,
    formatter: ErrorFormatter,
}

impl ExchangeDispatcher {
    /// Creates a dispatcher over `chain`.
    pub fn new(chain: Arc<InterceptorChain>, config: &GatewayConfig) -> Self {
        Self {
            chain,
            formatter: ErrorFormatter::from_config(config),
        }
    }

    /// Returns the chain this dispatcher runs.
    pub fn chain(&self) -> &Arc<InterceptorChain> {
        &self.chain
    }

    /// Returns the formatter used for synthesized error bodies.
    pub fn formatter(&self) -> &ErrorFormatter {
        &self.formatter
    }

    /// Runs the chain over `exchange`.
    ///
    /// # Errors
    ///
    /// Returns failures whose kind is classified [`Disposition::Rethrow`],
    /// including the abort raised when no stage produced a response. The
    /// exchange holds a synthesized response in that case too.
    pub fn dispatch(&self, exchange: &mut Exchange) -> Result<(), ExchangeError> {
        let err = match self.run_chain(exchange) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if exchange.response().is_none() {
            let response = self.formatter.error_response(&err, exchange.request());
            exchange.set_response(response);
        }

        match err.kind().disposition() {
            Disposition::Rethrow => Err(err),
            Disposition::LogAndContinue => {
                exchange.log().failure(&err);
                Ok(())
            }
        }
    }

    fn run_chain(&self, exchange: &mut Exchange) -> Result<(), ExchangeError> {
        self.chain.invoke(exchange)?;
        if exchange.response().is_none() {
            return Err(ExchangeError::abort(NO_RESPONSE_MESSAGE));
        }
        Ok(())
    }
}
