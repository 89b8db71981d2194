//! Scope context wrapping a parent at a pipeline scope boundary.

use super::PipeContext;
use crate::cancellation::CancellationToken;
use crate::payload::PayloadCache;
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// A child context created at a scope boundary.
///
/// A scope forwards its parent's cancellation signal and resolves payloads
/// against the parent's effective set, while anything added inside the scope
/// lands in a private cache the outer scope never sees. The local cache is
/// allocated lazily, on first use.
pub struct ScopeContext {
    parent: Arc<dyn PipeContext>,
    payloads: OnceLock<PayloadCache>,
}

impl ScopeContext {
    /// Creates a scope wrapping `parent`.
    #[must_use]
    pub fn new(parent: Arc<dyn PipeContext>) -> Self {
        Self {
            parent,
            payloads: OnceLock::new(),
        }
    }

    /// Preloads a payload value into the scope's private cache.
    ///
    /// Preloaded values shadow same-typed payloads held by the parent.
    #[must_use]
    pub fn with_payload<T: Any + Send + Sync>(self, value: T) -> Self {
        self.payloads().preload(value);
        self
    }

    /// Returns the wrapped parent context.
    #[must_use]
    pub fn parent(&self) -> &Arc<dyn PipeContext> {
        &self.parent
    }
}

impl PipeContext for ScopeContext {
    fn cancellation(&self) -> &CancellationToken {
        self.parent.cancellation()
    }

    fn payloads(&self) -> &PayloadCache {
        self.payloads.get_or_init(PayloadCache::new)
    }

    fn parent_context(&self) -> Option<&dyn PipeContext> {
        Some(self.parent.as_ref())
    }
}

impl std::fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeContext")
            .field("local_payloads", &self.payloads.get().map_or(0, PayloadCache::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{PipeContextExt, RootContext};

    #[derive(Debug, PartialEq)]
    struct Setting(&'static str);

    #[test]
    fn test_scope_forwards_cancellation() {
        let root = Arc::new(RootContext::new());
        let scope = ScopeContext::new(root.clone());

        root.cancellation().cancel("stop");

        assert!(scope.cancellation().is_cancelled());
        assert_eq!(scope.cancellation().reason(), Some("stop".to_string()));
    }

    #[test]
    fn test_scope_resolves_parent_payloads() {
        let root = Arc::new(RootContext::new().with_payload(Setting("outer")));
        let scope = ScopeContext::new(root);

        assert!(scope.has_payload::<Setting>());
        assert_eq!(
            scope.try_get_payload::<Setting>().map(|s| s.0),
            Some("outer")
        );
    }

    #[test]
    fn test_nested_scopes_chain_to_root() {
        let root = Arc::new(RootContext::new().with_payload(Setting("root")));
        let middle = Arc::new(ScopeContext::new(root));
        let leaf = ScopeContext::new(middle);

        assert_eq!(leaf.try_get_payload::<Setting>().map(|s| s.0), Some("root"));
    }
}
