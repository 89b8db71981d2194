//! Root context for units of work entering a pipeline.

use super::PipeContext;
use crate::cancellation::CancellationToken;
use crate::payload::PayloadCache;
use std::any::Any;

/// The context created once per unit of work entering the pipeline.
///
/// Owns its payload cache and the cancellation signal threaded through every
/// descendant scope.
#[derive(Debug, Default)]
pub struct RootContext {
    payloads: PayloadCache,
    cancellation: CancellationToken,
}

impl RootContext {
    /// Creates a new root context with a fresh cancellation signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the cancellation signal, e.g. one the caller already holds.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Preloads an initial payload value.
    #[must_use]
    pub fn with_payload<T: Any + Send + Sync>(self, value: T) -> Self {
        self.payloads.preload(value);
        self
    }
}

impl PipeContext for RootContext {
    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    fn payloads(&self) -> &PayloadCache {
        &self.payloads
    }
}
