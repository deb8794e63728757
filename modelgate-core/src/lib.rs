//! # Modelgate Core
//!
//! Model registry and generation execution pipeline.
//!
//! This crate provides the provider capability trait, the registry that maps
//! identifiers to providers, and the pipeline that wraps every provider call
//! with ordered lifecycle events and uniform error handling.

pub mod error;
pub mod event;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod service;
pub mod types;

// Re-exports
pub use error::ModelError;
pub use event::{EventKind, LogSink, MemorySink, ModelEvent, MultiSink, TracingSink};
pub use provider::ModelProvider;
pub use registry::{BoxedProvider, DuplicatePolicy, ModelRegistry};
pub use runtime::ExecutionPipeline;
pub use service::{ModelService, ModelServiceBuilder, ServiceConfig, DEFAULT_MODEL_ID};
pub use types::*;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
