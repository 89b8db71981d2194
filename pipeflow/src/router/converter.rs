//! Context converters and their factory.
//!
//! A converter attempts to reinterpret a general context as a more specific
//! context type, succeeding only when the underlying data actually satisfies
//! it. Conversion is the single place a type-narrowing check occurs: each
//! converter is resolved once, when a pipe is connected, never per send.

use crate::context::PipeContext;
use crate::errors::ConverterError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Attempts to reinterpret a `C` as a `T`.
///
/// A produced `T` must alias the same payload chain and cancellation signal
/// as its source: a reinterpretation, not a copy. Returning `None` for a
/// mismatch is the expected outcome, never an error.
pub trait ContextConverter<C, T>: Send + Sync {
    /// Converts `input`, or answers `None` when it does not satisfy `T`.
    fn try_convert(&self, input: &C) -> Option<T>;
}

/// A converter backed by a closure.
pub struct FnConverter<F> {
    convert: F,
}

impl<F> FnConverter<F> {
    /// Wraps `convert` as a [`ContextConverter`].
    #[must_use]
    pub fn new(convert: F) -> Self {
        Self { convert }
    }
}

impl<C, T, F> ContextConverter<C, T> for FnConverter<F>
where
    F: Fn(&C) -> Option<T> + Send + Sync,
{
    fn try_convert(&self, input: &C) -> Option<T> {
        (self.convert)(input)
    }
}

/// Resolves one converter per requested target context type.
///
/// Consulted when a pipe is connected; a target type the factory cannot
/// serve is a configuration error and must fail loudly at that point.
pub trait ConverterFactory<C>: Send + Sync {
    /// Resolves the converter producing `T` from the base context type.
    ///
    /// # Errors
    ///
    /// Returns a [`ConverterError`] when no converter can be built for `T`.
    fn get_converter<T>(&self) -> Result<Arc<dyn ContextConverter<C, T>>, ConverterError>
    where
        T: PipeContext + 'static;
}

/// A converter factory backed by a table built once at setup time.
///
/// Converters are registered per target type and looked up by static type
/// identity, so no per-message type inspection ever happens.
pub struct ConverterRegistry<C> {
    converters: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    _context: PhantomData<fn(C)>,
}

impl<C: Send + Sync + 'static> ConverterRegistry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            _context: PhantomData,
        }
    }

    /// Registers the converter producing `T`, replacing any previous one.
    #[must_use]
    pub fn register<T, V>(mut self, converter: V) -> Self
    where
        T: PipeContext + 'static,
        V: ContextConverter<C, T> + 'static,
    {
        let shared: Arc<dyn ContextConverter<C, T>> = Arc::new(converter);
        self.converters.insert(TypeId::of::<T>(), Box::new(shared));
        self
    }

    /// Registers a closure as the converter producing `T`.
    #[must_use]
    pub fn register_fn<T, F>(self, convert: F) -> Self
    where
        T: PipeContext + 'static,
        F: Fn(&C) -> Option<T> + Send + Sync + 'static,
    {
        self.register(FnConverter::new(convert))
    }

    /// Returns the number of registered target types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns true if no converters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl<C: Send + Sync + 'static> Default for ConverterRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> ConverterFactory<C> for ConverterRegistry<C> {
    fn get_converter<T>(&self) -> Result<Arc<dyn ContextConverter<C, T>>, ConverterError>
    where
        T: PipeContext + 'static,
    {
        self.converters
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn ContextConverter<C, T>>>())
            .cloned()
            .ok_or_else(|| ConverterError::not_registered::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::context::{PipeContext, RootContext};
    use crate::payload::PayloadCache;

    #[derive(Clone)]
    struct Envelope {
        inner: Arc<RootContext>,
        label: &'static str,
    }

    impl PipeContext for Envelope {
        fn cancellation(&self) -> &CancellationToken {
            self.inner.cancellation()
        }

        fn payloads(&self) -> &PayloadCache {
            self.inner.payloads()
        }
    }

    struct Labelled {
        envelope: Envelope,
    }

    impl PipeContext for Labelled {
        fn cancellation(&self) -> &CancellationToken {
            self.envelope.cancellation()
        }

        fn payloads(&self) -> &PayloadCache {
            self.envelope.payloads()
        }
    }

    fn registry() -> ConverterRegistry<Envelope> {
        ConverterRegistry::new().register_fn(|envelope: &Envelope| {
            (envelope.label == "labelled").then(|| Labelled {
                envelope: envelope.clone(),
            })
        })
    }

    fn envelope(label: &'static str) -> Envelope {
        Envelope {
            inner: Arc::new(RootContext::new()),
            label,
        }
    }

    #[test]
    fn test_registered_converter_resolves() {
        let converter = registry().get_converter::<Labelled>().unwrap();

        assert!(converter.try_convert(&envelope("labelled")).is_some());
        assert!(converter.try_convert(&envelope("other")).is_none());
    }

    #[test]
    fn test_unregistered_target_fails_loudly() {
        struct Unknown;

        impl PipeContext for Unknown {
            fn cancellation(&self) -> &CancellationToken {
                unimplemented!("never constructed")
            }

            fn payloads(&self) -> &PayloadCache {
                unimplemented!("never constructed")
            }
        }

        let result = registry().get_converter::<Unknown>();

        assert!(matches!(
            result,
            Err(ConverterError::NotRegistered { .. })
        ));
    }

    #[test]
    fn test_conversion_aliases_the_source_chain() {
        let source = envelope("labelled");
        let converter = registry().get_converter::<Labelled>().unwrap();

        let converted = converter.try_convert(&source).unwrap();
        source.cancellation().cancel("stop");

        assert!(converted.cancellation().is_cancelled());
    }
}
