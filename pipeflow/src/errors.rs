//! Error types for the pipeflow engine.
//!
//! The taxonomy separates configuration errors (surfaced while wiring a
//! pipeline together) from send failures (surfaced as a failed completion of
//! an in-flight `send`). Conversion mismatches are not errors at all.

use thiserror::Error;

/// A failed completion of a pipe send.
#[derive(Debug, Error)]
pub enum PipeError {
    /// The in-flight send observed a triggered cancellation signal.
    #[error("send cancelled: {reason}")]
    Cancelled {
        /// The reason supplied when the signal was triggered.
        reason: String,
    },

    /// A pipe or filter failed while processing a context.
    #[error("pipe execution failed: {0}")]
    Execution(#[from] anyhow::Error),

    /// Several concurrently dispatched sends failed.
    #[error(transparent)]
    Aggregate(#[from] AggregatePipeError),
}

impl PipeError {
    /// Creates a cancellation failure.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Creates an execution failure from a plain message.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(anyhow::Error::msg(message.into()))
    }

    /// Collapses zero or more send failures into a single completion.
    ///
    /// No failures completes successfully, a single failure passes through
    /// untouched, and several failures collapse into [`PipeError::Aggregate`].
    ///
    /// # Errors
    ///
    /// Returns the collapsed failure when `errors` is non-empty.
    pub fn aggregate(mut errors: Vec<Self>) -> Result<(), Self> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate(AggregatePipeError { errors })),
        }
    }

    /// Whether this failure represents cancellation rather than an error.
    ///
    /// An aggregate counts as cancellation only when every collapsed failure
    /// does.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Execution(_) => false,
            Self::Aggregate(aggregate) => aggregate.errors.iter().all(Self::is_cancellation),
        }
    }
}

/// Several concurrently dispatched sends failed during one fan-out.
#[derive(Debug, Error)]
#[error("{} downstream sends failed", errors.len())]
pub struct AggregatePipeError {
    /// The individual send failures, in completion order.
    pub errors: Vec<PipeError>,
}

/// A configuration error raised while connecting a pipe.
///
/// These surface at setup time, never at dispatch time.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// No converter is registered for the requested target context type.
    #[error("no context converter registered for `{type_name}`")]
    NotRegistered {
        /// The requested target context type.
        type_name: &'static str,
    },
}

impl ConverterError {
    /// Creates a `NotRegistered` error for the target type `T`.
    #[must_use]
    pub fn not_registered<T: ?Sized>() -> Self {
        Self::NotRegistered {
            type_name: std::any::type_name::<T>(),
        }
    }
}
