//! Core settings shared by the CLI and the pipeline.

mod config;

pub use config::{AiConfig, CatalogConfig, Config, OllamaConfig, PipelineConfig};
