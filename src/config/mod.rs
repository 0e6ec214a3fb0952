//! Configuration module for the pipeline.
//!
//! Provides the `PipelineConfig` struct and its type-safe builder for
//! configuring a pipeline run with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{PipelineConfigBuilder, WithStorePath};
pub use types::PipelineConfig;
