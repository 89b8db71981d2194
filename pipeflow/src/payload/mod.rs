//! Type-keyed payload storage for contexts.

mod cache;

pub use cache::{PayloadCache, PayloadSlot};
