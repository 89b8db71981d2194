//! Filters: pipes that forward to a next pipe.

use super::Pipe;
use crate::context::PipeContext;
use crate::errors::PipeError;
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use std::sync::Arc;

/// A processing step composed with a reference to the next pipe.
///
/// A filter decides whether and when to forward: calling `next.send` exactly
/// once is the common case, while short-circuiting (not forwarding at all)
/// is a legitimate policy of a concrete filter.
#[async_trait]
pub trait Filter<C: PipeContext>: Probe + Send + Sync {
    /// Processes `context`, forwarding to `next` as the filter's policy
    /// dictates.
    async fn send(&self, context: C, next: &dyn Pipe<C>) -> Result<(), PipeError>;
}

/// Adapts one filter plus its next pipe into a [`Pipe`].
pub struct FilterPipe<C: PipeContext> {
    filter: Arc<dyn Filter<C>>,
    next: Arc<dyn Pipe<C>>,
}

impl<C: PipeContext> FilterPipe<C> {
    /// Composes `filter` with the pipe it forwards to.
    #[must_use]
    pub fn new(filter: Arc<dyn Filter<C>>, next: Arc<dyn Pipe<C>>) -> Self {
        Self { filter, next }
    }
}

#[async_trait]
impl<C: PipeContext + 'static> Pipe<C> for FilterPipe<C> {
    async fn send(&self, context: C) -> Result<(), PipeError> {
        self.filter.send(context, self.next.as_ref()).await
    }
}

impl<C: PipeContext> Probe for FilterPipe<C> {
    fn probe(&self, ctx: &mut ProbeContext) {
        let scope = ctx.scope("filter");
        self.filter.probe(scope);
        self.next.probe(scope);
    }
}
