#![allow(clippy::format_push_string)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::should_implement_trait)]

//! # Archflow
//!
//! Guided architectural-analysis workflows driven by a text-generation backend.
//!
//! A session picks a building purpose and one or more analysis objectives. The
//! composer turns that selection into an ordered list of steps, the prompt
//! compiler turns each step into constrained sub-stage prompts, and the
//! pipeline runs them in order while carrying a digest of every completed step
//! into the next one.
//!
//! ## Features
//!
//! - **Step Catalog**: required, recommended, and optional analysis steps
//! - **Workflow Editing**: add, remove, and reorder steps; export and import
//! - **Prompt Compilation**: declarative step definitions in YAML
//! - **Escalating Generation**: reasoning, chat, and completion fallbacks
//! - **Context Accumulation**: each step sees exactly the steps before it
//!
//! ## Quick Start
//!
//! ```bash
//! # Compose a workflow
//! archflow suggest --purpose office --objective market_analysis
//!
//! # Preview the run without a backend
//! archflow run --purpose office --objective market_analysis --dry-run
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod ai;
pub mod catalog;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod workflow;

// Re-export commonly used types
pub use ai::{backend_from_config, GenerationAdapter, GenerationBackend, GenerationMethod};
pub use catalog::{DefinitionSet, Objective, Purpose, Step, StepCatalog, Tier};
pub use core::Config;
pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{Pipeline, PipelineState, RunOutcome, SessionInputs, StepRecord};
pub use prompt::{ProjectFields, PromptCompiler, TextDocument};
pub use workflow::{Workflow, WorkflowComposer, WorkflowRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "archflow";
