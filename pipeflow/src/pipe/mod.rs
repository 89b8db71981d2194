//! The pipe composition contract.
//!
//! A [`Pipe`] accepts a context of one specific type and completes once
//! processing (including downstream forwarding) finishes. A [`Filter`] is a
//! pipe that also forwards to exactly one next pipe, which is how chains
//! compose.

mod filter;

pub use filter::{Filter, FilterPipe};

use crate::context::PipeContext;
use crate::errors::PipeError;
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use std::marker::PhantomData;

/// An asynchronous processing stage accepting one context type.
#[async_trait]
pub trait Pipe<C: PipeContext>: Probe + Send + Sync {
    /// Delivers `context` to the pipe.
    ///
    /// Completes once the pipe (and anything it forwarded to) has finished
    /// processing; a pipe signals failure by failing this completion.
    async fn send(&self, context: C) -> Result<(), PipeError>;
}

/// A leaf pipe running a synchronous side-effecting action.
pub struct ExecutePipe<C, F> {
    action: F,
    _context: PhantomData<fn(C)>,
}

impl<C, F> ExecutePipe<C, F>
where
    C: PipeContext,
    F: Fn(&C) + Send + Sync,
{
    /// Creates a pipe running `action` for every delivered context.
    #[must_use]
    pub fn new(action: F) -> Self {
        Self {
            action,
            _context: PhantomData,
        }
    }
}

#[async_trait]
impl<C, F> Pipe<C> for ExecutePipe<C, F>
where
    C: PipeContext + 'static,
    F: Fn(&C) + Send + Sync,
{
    async fn send(&self, context: C) -> Result<(), PipeError> {
        (self.action)(&context);
        Ok(())
    }
}

impl<C, F> Probe for ExecutePipe<C, F> {
    fn probe(&self, ctx: &mut ProbeContext) {
        ctx.scope("execute");
    }
}

/// A terminal pipe that accepts every context and does nothing.
pub struct EmptyPipe<C> {
    _context: PhantomData<fn(C)>,
}

impl<C: PipeContext> EmptyPipe<C> {
    /// Creates a no-op pipe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _context: PhantomData,
        }
    }
}

impl<C: PipeContext> Default for EmptyPipe<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: PipeContext + 'static> Pipe<C> for EmptyPipe<C> {
    async fn send(&self, _context: C) -> Result<(), PipeError> {
        Ok(())
    }
}

impl<C> Probe for EmptyPipe<C> {
    fn probe(&self, ctx: &mut ProbeContext) {
        ctx.scope("empty");
    }
}

/// Creates a pipe running `action` for every delivered context.
pub fn execute<C, F>(action: F) -> ExecutePipe<C, F>
where
    C: PipeContext,
    F: Fn(&C) + Send + Sync,
{
    ExecutePipe::new(action)
}

/// Creates a no-op terminal pipe.
#[must_use]
pub fn empty<C: PipeContext>() -> EmptyPipe<C> {
    EmptyPipe::new()
}
