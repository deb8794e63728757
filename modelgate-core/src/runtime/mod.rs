//! Execution layer for Modelgate.
//!
//! The pipeline sits between the service API (`get_text`, `get_object`) and
//! the provider capability trait. It is responsible for:
//! - Validating requests before any provider is touched
//! - Emitting the ordered lifecycle events to the configured sink
//! - Normalizing empty results into `EmptyResponse` errors

pub mod executor;

pub use executor::{ExecutionPipeline, DEFAULT_SYSTEM_TEMPLATE};
