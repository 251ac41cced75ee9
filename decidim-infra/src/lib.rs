//! # decidim-infra
//!
//! Declarative provisioning for the Decidim participation platform.
//!
//! The crate turns a stage name and an image tag into a deterministic set of
//! CloudFormation templates:
//!
//! - **Stage-parameterized configuration**: every environment knob lives in a
//!   bundled, validated configuration file
//! - **Policy-driven divergence**: stage peculiarities are a lookup table,
//!   not conditionals scattered through builders
//! - **Deferred value handles**: cross-stack references stay symbolic until
//!   emission and are resolved in dependency order
//! - **Fail-fast synthesis**: a missing handle, dangling reference, or
//!   duplicate rule priority aborts the run before anything is written
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use decidim_infra::prelude::*;
//!
//! let ctx = SynthContext::new(Stage::Staging, "v1.2.3")?;
//! let assembly = synth::assemble(&ctx)?;
//! synth::write_assembly(&assembly, &ctx, Path::new("out"))?;
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

pub mod config;
mod integration_tests;
pub mod errors;
pub mod graph;
pub mod params;
pub mod stacks;
pub mod synth;
pub mod waf;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, Stage, StagePolicy};
    pub use crate::errors::{CycleDetectedError, SynthError};
    pub use crate::graph::{App, Assembly, OutputRegistry, Resource, Stack, Value};
    pub use crate::params::ParameterNamespace;
    pub use crate::stacks::{StackBuilder, SynthContext};
    pub use crate::synth;
    pub use crate::waf::WafRule;
}
