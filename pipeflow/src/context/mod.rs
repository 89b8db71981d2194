//! Context model for pipeline execution.
//!
//! This module provides:
//! - The [`PipeContext`] capability every context type implements
//! - Typed payload access with scope-aware resolution ([`PipeContextExt`])
//! - A root context for units of work entering a pipeline
//! - A scope context for nesting without leaking into the outer scope

mod pipe_context;
mod root;
mod scope;

pub use pipe_context::{PipeContext, PipeContextExt};
pub use root::RootContext;
pub use scope::ScopeContext;
