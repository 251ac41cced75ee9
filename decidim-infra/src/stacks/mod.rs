//! Stack builders.
//!
//! A builder declares one cohesive group of cloud resources and exposes
//! identifiers for downstream consumption. Builders are pure: given the
//! same context and registry they produce the same stack.

mod cache;
mod database;
mod edge;
mod network;
mod service;
mod storage;

pub use cache::CacheBuilder;
pub use database::DatabaseBuilder;
pub use edge::EdgeBuilder;
pub use network::NetworkBuilder;
pub use service::ServiceBuilder;
pub use storage::StorageBuilder;

use crate::config::{Config, Stage, StagePolicy};
use crate::errors::SynthError;
use crate::graph::{OutputRegistry, Stack};
use crate::params::ParameterNamespace;
use std::fmt::Debug;

/// Read-only context shared by every builder in one synthesis run.
#[derive(Debug, Clone)]
pub struct SynthContext {
    /// The deployment stage.
    pub stage: Stage,
    /// Short service name used in resource names.
    pub service: String,
    /// The stage's configuration bundle.
    pub config: Config,
    /// The stage's resolved policy record.
    pub policy: StagePolicy,
    /// Container image tag to deploy.
    pub image_tag: String,
}

impl SynthContext {
    /// Creates the context for a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage's configuration bundle is missing
    /// or malformed.
    pub fn new(stage: Stage, image_tag: impl Into<String>) -> Result<Self, SynthError> {
        let config = Config::for_stage(stage)?;
        Ok(Self {
            policy: stage.policy(),
            stage,
            service: "decidim".to_string(),
            config,
            image_tag: image_tag.into(),
        })
    }

    /// `{stage}-{service}` prefix used in physical resource names.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.stage, self.service)
    }

    /// Stack name for a builder part, e.g. `stagingdecidimNetworkStack`.
    #[must_use]
    pub fn stack_name(&self, part: &str) -> String {
        format!("{}{}{part}Stack", self.stage, self.service)
    }

    /// The stage-scoped parameter namespace.
    #[must_use]
    pub fn params(&self) -> ParameterNamespace {
        ParameterNamespace::new(self.stage)
    }

    /// Deterministic name of the storage bucket.
    #[must_use]
    pub fn bucket_name(&self) -> String {
        format!("{}-bucket", self.prefix())
    }

    /// Internal origin hostname the load balancer answers on.
    #[must_use]
    pub fn origin_hostname(&self) -> String {
        format!("{}-alb-origin.{}", self.prefix(), self.config.service.domain)
    }

    /// The fixed label set stamped on every taggable resource.
    #[must_use]
    pub fn tags(&self) -> Vec<(String, String)> {
        vec![
            ("Project".to_string(), self.config.tags.project.clone()),
            (
                "Repository".to_string(),
                self.config.tags.repository.clone(),
            ),
            ("Owner".to_string(), self.config.tags.owner.clone()),
            ("Stage".to_string(), self.stage.to_string()),
            ("ManagedBy".to_string(), "decidim-infra".to_string()),
        ]
    }
}

/// Trait for stack builders.
///
/// `provides` and `consumes` declare the cross-stack handle protocol: a
/// consumed key is `"{producer}/{handle}"`, and the assembler orders
/// builders so every producer runs strictly before its consumers.
pub trait StackBuilder: Debug {
    /// The builder's unique name.
    fn name(&self) -> &'static str;

    /// Handle keys this builder exports.
    fn provides(&self) -> &'static [&'static str] {
        &[]
    }

    /// Handle keys of other builders this builder reads.
    fn consumes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Declares the builder's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if a consumed handle is missing or a declaration
    /// is internally inconsistent.
    fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_naming() {
        let ctx = SynthContext::new(Stage::Staging, "v1").unwrap();
        assert_eq!(ctx.prefix(), "staging-decidim");
        assert_eq!(ctx.stack_name("Network"), "stagingdecidimNetworkStack");
        assert_eq!(ctx.bucket_name(), "staging-decidim-bucket");
    }

    #[test]
    fn test_context_tags_include_marker_and_stage() {
        let ctx = SynthContext::new(Stage::Dev, "v1").unwrap();
        let tags = ctx.tags();
        assert!(tags.contains(&("Stage".to_string(), "dev".to_string())));
        assert!(tags.contains(&("ManagedBy".to_string(), "decidim-infra".to_string())));
    }
}
