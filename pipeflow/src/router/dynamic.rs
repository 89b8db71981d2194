//! The dynamic content-based router.

use super::converter::{ContextConverter, ConverterFactory};
use crate::context::PipeContext;
use crate::errors::{ConverterError, PipeError};
use crate::pipe::Pipe;
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// What the router does with still-running sibling sends once one dispatched
/// send has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Siblings run to completion; all failures aggregate.
    #[default]
    RunToCompletion,
    /// The first failure triggers the context's shared cancellation signal;
    /// siblings are still awaited and wind down cooperatively.
    CancelSiblings,
}

/// One connected (converter, pipe) pair, type-erased over the target type.
trait RouterBinding<C>: Send + Sync {
    /// Attempts conversion; a match yields the downstream send future.
    fn try_dispatch(&self, context: &C) -> Option<BoxFuture<'static, Result<(), PipeError>>>;

    fn probe(&self, ctx: &mut ProbeContext);
}

struct ConverterBinding<C, T: PipeContext> {
    converter: Arc<dyn ContextConverter<C, T>>,
    pipe: Arc<dyn Pipe<T>>,
}

impl<C, T> RouterBinding<C> for ConverterBinding<C, T>
where
    C: PipeContext,
    T: PipeContext + 'static,
{
    fn try_dispatch(&self, context: &C) -> Option<BoxFuture<'static, Result<(), PipeError>>> {
        let converted = self.converter.try_convert(context)?;
        let pipe = Arc::clone(&self.pipe);
        Some(Box::pin(async move { pipe.send(converted).await }))
    }

    fn probe(&self, ctx: &mut ProbeContext) {
        let scope = ctx.scope("pipe");
        scope.set("contextType", std::any::type_name::<T>());
        self.pipe.probe(scope);
    }
}

struct BindingEntry<C> {
    id: u64,
    binding: Arc<dyn RouterBinding<C>>,
}

/// A pipe that fans incoming contexts out to the connected pipes whose
/// converter matches.
///
/// Bindings are appended in connection order during single-threaded setup.
/// During a send, conversion attempts run in that order, but dispatch to the
/// matching pipes is concurrent and unordered; the send completes once every
/// dispatched send has. A context matching zero bindings completes
/// successfully without any downstream invocation.
pub struct DynamicRouter<C, F> {
    converter_factory: F,
    bindings: Arc<RwLock<Vec<BindingEntry<C>>>>,
    next_binding_id: AtomicU64,
    failure_policy: FailurePolicy,
}

impl<C, F> DynamicRouter<C, F>
where
    C: PipeContext + 'static,
    F: ConverterFactory<C>,
{
    /// Creates a router resolving converters from `converter_factory`.
    #[must_use]
    pub fn new(converter_factory: F) -> Self {
        Self {
            converter_factory,
            bindings: Arc::new(RwLock::new(Vec::new())),
            next_binding_id: AtomicU64::new(0),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Sets the sibling policy applied when a dispatched send fails.
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Connects `pipe` for contexts convertible to `T`.
    ///
    /// The converter factory is consulted once, here; a target type it
    /// cannot serve surfaces immediately as a configuration error, never at
    /// dispatch time. Connecting is part of pipeline setup and is not
    /// supported concurrently with active sends.
    ///
    /// # Errors
    ///
    /// Returns a [`ConverterError`] when no converter is available for `T`.
    pub fn connect_pipe<T>(
        &self,
        pipe: Arc<dyn Pipe<T>>,
    ) -> Result<ConnectHandle<C>, ConverterError>
    where
        T: PipeContext + 'static,
    {
        let converter = self.converter_factory.get_converter::<T>()?;
        let id = self.next_binding_id.fetch_add(1, Ordering::Relaxed);

        debug!(
            context_type = std::any::type_name::<T>(),
            binding = id,
            "connecting pipe"
        );

        self.bindings.write().push(BindingEntry {
            id,
            binding: Arc::new(ConverterBinding { converter, pipe }),
        });

        Ok(ConnectHandle {
            bindings: Arc::downgrade(&self.bindings),
            id,
        })
    }

    /// Returns the number of connected pipes.
    #[must_use]
    pub fn connected(&self) -> usize {
        self.bindings.read().len()
    }
}

#[async_trait]
impl<C, F> Pipe<C> for DynamicRouter<C, F>
where
    C: PipeContext + 'static,
    F: ConverterFactory<C>,
{
    async fn send(&self, context: C) -> Result<(), PipeError> {
        let token = context.cancellation().clone();
        if token.is_cancelled() {
            return Err(PipeError::cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            ));
        }

        // Snapshot under a brief read lock; the collection is treated as
        // immutable for the duration of the send.
        let snapshot: Vec<Arc<dyn RouterBinding<C>>> = self
            .bindings
            .read()
            .iter()
            .map(|entry| Arc::clone(&entry.binding))
            .collect();

        let mut dispatched = FuturesUnordered::new();
        for binding in &snapshot {
            if let Some(send) = binding.try_dispatch(&context) {
                dispatched.push(send);
            }
        }

        if dispatched.is_empty() {
            trace!(connected = snapshot.len(), "no binding matched");
            return Ok(());
        }

        trace!(
            matched = dispatched.len(),
            connected = snapshot.len(),
            "dispatching context"
        );

        let mut failures = Vec::new();
        while let Some(result) = dispatched.next().await {
            if let Err(error) = result {
                if failures.is_empty()
                    && self.failure_policy == FailurePolicy::CancelSiblings
                    && !error.is_cancellation()
                {
                    token.cancel("sibling dispatch failed");
                }
                failures.push(error);
            }
        }

        PipeError::aggregate(failures)
    }
}

impl<C, F> Probe for DynamicRouter<C, F> {
    fn probe(&self, ctx: &mut ProbeContext) {
        let scope = ctx.scope("dynamicRouter");
        let bindings = self.bindings.read();
        scope.set("connected", bindings.len());
        for entry in bindings.iter() {
            entry.binding.probe(scope);
        }
    }
}

/// Releases a router binding on request.
///
/// Disconnecting an already-released binding (or one whose router is gone)
/// is a no-op.
pub struct ConnectHandle<C> {
    bindings: Weak<RwLock<Vec<BindingEntry<C>>>>,
    id: u64,
}

impl<C> ConnectHandle<C> {
    /// Releases the binding this handle was returned for.
    pub fn disconnect(&self) {
        if let Some(bindings) = self.bindings.upgrade() {
            bindings.write().retain(|entry| entry.id != self.id);
        }
    }
}

impl<C> std::fmt::Debug for ConnectHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectHandle")
            .field("binding", &self.id)
            .finish()
    }
}
