//! Content-based routing between differently-typed contexts.
//!
//! A [`DynamicRouter`] holds (converter, pipe) bindings and fans an incoming
//! context out to every binding whose [`ContextConverter`] accepts it.

mod converter;
mod dynamic;

pub use converter::{ContextConverter, ConverterFactory, ConverterRegistry, FnConverter};
pub use dynamic::{ConnectHandle, DynamicRouter, FailurePolicy};
