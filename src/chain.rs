//! Ordered pipeline of exchange-processing stages.
//!
//! Ordering:
//! - `handle_request` runs in registration order until a stage sets a
//!   response.
//! - `handle_response` then runs **in reverse order** for every stage whose
//!   `handle_request` ran.
//!
//! A failing stage ends the pass immediately; no response hooks run for it.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ExchangeError;
use crate::exchange::Exchange;

/// One processing step of the interceptor chain.
pub trait Stage: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &str;

    /// Processes the request. A stage answers the exchange by setting its
    /// response, which ends the forward pass.
    fn handle_request(&self, exchange: &mut Exchange) -> Result<(), ExchangeError>;

    /// Post-processes the response on the way back out.
    fn handle_response(&self, _exchange: &mut Exchange) -> Result<(), ExchangeError> {
        Ok(())
    }
}

/// Frozen list of stages used by one dispatch.
pub type StageList = Arc<[Arc<dyn Stage>]>;

/// Interceptor chain with copy-on-write reconfiguration.
///
/// Each dispatch works on the snapshot it took when it started;
/// [`InterceptorChain::replace_stages`] only affects later dispatches.
pub struct InterceptorChain {
    stages: RwLock<StageList>,
}

impl InterceptorChain {
    /// Creates a chain running `stages` in order.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: RwLock::new(stages.into()),
        }
    }

    /// Returns the current stage list.
    pub fn snapshot(&self) -> StageList {
        self.stages.read().clone()
    }

    /// Swaps in a new stage list.
    pub fn replace_stages(&self, stages: Vec<Arc<dyn Stage>>) {
        *self.stages.write() = stages.into();
    }

    /// Returns the number of stages.
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    /// Returns true if the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }

    /// Runs the current stages over `exchange`.
    ///
    /// # Errors
    ///
    /// Propagates the first failure raised by a stage.
    pub fn invoke(&self, exchange: &mut Exchange) -> Result<(), ExchangeError> {
        invoke_stages(&self.snapshot(), exchange)
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .stages
            .read()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        f.debug_struct("InterceptorChain")
            .field("stages", &names)
            .finish()
    }
}

/// Runs `stages` over `exchange`.
///
/// # Errors
///
/// Propagates the first failure raised by a stage.
pub fn invoke_stages(
    stages: &[Arc<dyn Stage>],
    exchange: &mut Exchange,
) -> Result<(), ExchangeError> {
    let mut entered = 0;
    for (index, stage) in stages.iter().enumerate() {
        exchange.set_stage_index(index);
        exchange
            .log()
            .trace(format_args!("entering stage {} ({})", index, stage.name()));
        stage.handle_request(exchange)?;
        entered = index + 1;
        if exchange.response().is_some() {
            break;
        }
    }

    if exchange.response().is_none() {
        return Ok(());
    }

    for index in (0..entered).rev() {
        exchange.set_stage_index(index);
        stages[index].handle_response(exchange)?;
    }
    Ok(())
}
