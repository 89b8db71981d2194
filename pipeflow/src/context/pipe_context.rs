//! The context capability and typed payload access.

use crate::cancellation::CancellationToken;
use crate::payload::{PayloadCache, PayloadSlot};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// The capability every context flowing through a pipe satisfies.
///
/// A context carries a cancellation signal and a type-keyed payload set.
/// Payload resolution walks three sources in priority order: the context's
/// own intrinsic facets ([`PipeContext::self_payload`]), its local cache,
/// then its parent's effective payload set. The typed operations implementing
/// that walk live on [`PipeContextExt`]; implementors only supply the raw
/// parts.
///
/// The parent chain is fixed at construction and acyclic; a parent has no
/// awareness of its children.
pub trait PipeContext: Send + Sync {
    /// The cancellation signal shared by the whole context tree.
    ///
    /// Nested scopes and converted contexts forward the signal of the root;
    /// it is never re-created further down the tree.
    fn cancellation(&self) -> &CancellationToken;

    /// The context's local payload cache.
    fn payloads(&self) -> &PayloadCache;

    /// The parent context, when this context is a nested scope.
    fn parent_context(&self) -> Option<&dyn PipeContext> {
        None
    }

    /// An intrinsic facet of the context itself, consulted before any cache.
    ///
    /// Context types that *are* a payload (e.g. a context that is itself the
    /// transaction) answer here, letting `type_id` resolve without cache
    /// indirection. The default answers nothing.
    fn self_payload(&self, type_id: TypeId) -> Option<PayloadSlot> {
        let _ = type_id;
        None
    }
}

impl<C: PipeContext + ?Sized> PipeContext for Arc<C> {
    fn cancellation(&self) -> &CancellationToken {
        (**self).cancellation()
    }

    fn payloads(&self) -> &PayloadCache {
        (**self).payloads()
    }

    fn parent_context(&self) -> Option<&dyn PipeContext> {
        (**self).parent_context()
    }

    fn self_payload(&self, type_id: TypeId) -> Option<PayloadSlot> {
        (**self).self_payload(type_id)
    }
}

/// Typed payload operations over the effective payload set.
///
/// Implemented for every [`PipeContext`] (including trait objects). Each
/// operation resolves against the priority chain self facet, local cache,
/// parent; once a source answers, lower-priority sources are not consulted.
pub trait PipeContextExt: PipeContext {
    /// Whether the effective payload set holds an instance of `T`.
    fn has_payload<T: Any + Send + Sync>(&self) -> bool {
        self.self_payload(TypeId::of::<T>()).is_some()
            || self.payloads().has::<T>()
            || self
                .parent_context()
                .is_some_and(|parent| parent.has_payload::<T>())
    }

    /// Gets the effective instance of `T`, if any.
    fn try_get_payload<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        if let Some(facet) = facet_of::<T, _>(self) {
            return Some(facet);
        }
        if let Some(local) = self.payloads().try_get::<T>() {
            return Some(local);
        }
        self.parent_context()
            .and_then(|parent| parent.try_get_payload::<T>())
    }

    /// Gets the effective instance of `T`, creating one in the local cache
    /// if no source holds one.
    ///
    /// A value created here belongs to this scope; outer scopes never see it.
    fn get_or_add_payload<T, F>(&self, factory: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(facet) = facet_of::<T, _>(self) {
            return facet;
        }
        if let Some(local) = self.payloads().try_get::<T>() {
            return local;
        }
        if let Some(inherited) = self
            .parent_context()
            .and_then(|parent| parent.try_get_payload::<T>())
        {
            return inherited;
        }
        self.payloads().get_or_add(factory)
    }

    /// Inserts via `add` when `T` is absent, otherwise stores `update(old)`.
    ///
    /// When the current value comes from the parent chain, the updated value
    /// shadows it in the local cache; the outer scope is never mutated. When
    /// the context itself is the payload, it is returned untouched.
    fn add_or_update_payload<T, A, U>(&self, add: A, update: U) -> Arc<T>
    where
        T: Any + Send + Sync,
        A: FnOnce() -> T,
        U: Fn(&T) -> T,
    {
        if let Some(facet) = facet_of::<T, _>(self) {
            return facet;
        }
        if self.payloads().has::<T>() {
            return self.payloads().add_or_update(add, update);
        }
        if let Some(inherited) = self
            .parent_context()
            .and_then(|parent| parent.try_get_payload::<T>())
        {
            return self
                .payloads()
                .add_or_update(|| update(&inherited), &update);
        }
        self.payloads().add_or_update(add, update)
    }
}

impl<C: PipeContext + ?Sized> PipeContextExt for C {}

fn facet_of<T, C>(context: &C) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
    C: PipeContext + ?Sized,
{
    context
        .self_payload(TypeId::of::<T>())
        .and_then(|slot| slot.downcast::<T>().ok())
}
