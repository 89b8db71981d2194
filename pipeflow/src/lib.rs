//! # Pipeflow
//!
//! A composable async pipe/filter engine with content-based routing.
//!
//! Pipeflow is the dispatch core for message-processing systems built as
//! chains of asynchronous stages over strongly-typed contexts:
//!
//! - **Contexts**: units of work carrying an open-ended, type-keyed payload
//!   set and one cancellation signal; nested scopes extend or shadow
//!   payloads without leaking into the outer scope
//! - **Pipes and filters**: the composition contract for chaining stages
//!   and forwarding downstream
//! - **Dynamic routing**: content-based fan-out to the connected pipes whose
//!   converter accepts the incoming context
//! - **Probing**: structured introspection of a composed topology
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeflow::prelude::*;
//!
//! // Wire a router during setup
//! let router = DynamicRouter::new(converters);
//! router.connect_pipe(order_pipe)?;
//! router.connect_pipe(refund_pipe)?;
//!
//! // Hand each unit of work to the router and await completion
//! router.send(context).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod errors;
pub mod payload;
pub mod pipe;
pub mod probe;
pub mod router;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{PipeContext, PipeContextExt, RootContext, ScopeContext};
    pub use crate::errors::{AggregatePipeError, ConverterError, PipeError};
    pub use crate::payload::{PayloadCache, PayloadSlot};
    pub use crate::pipe::{EmptyPipe, ExecutePipe, Filter, FilterPipe, Pipe};
    pub use crate::probe::{Probe, ProbeContext, ProbeExt, ProbeResult};
    pub use crate::router::{
        ConnectHandle, ContextConverter, ConverterFactory, ConverterRegistry, DynamicRouter,
        FailurePolicy, FnConverter,
    };
}
