//! Cooperative cancellation shared across a context tree.

mod token;

pub use token::{CancelCallback, CancellationToken};
