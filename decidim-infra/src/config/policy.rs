//! Per-stage policy table.
//!
//! The original deployments accumulated stage-specific special cases, each
//! tied to one named production topology. They are resolved here, once,
//! into a flat policy record; builders consult the record and never branch
//! on the raw stage again.

use super::Stage;

/// Stage-scoped policy knobs.
///
/// Every field defaults to the standard behavior; exactly one designated
/// stage flips each legacy knob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePolicy {
    /// Keep object versions in the storage bucket.
    pub versioned_bucket: bool,
    /// Grant bucket reads to a CloudFront origin access identity instead
    /// of an access-control-scoped service principal.
    pub legacy_origin_identity: bool,
    /// Spread the cache replication group across availability zones.
    pub cache_multi_az: bool,
    /// Substitute the bot-control WAF rule with an allow rule for this
    /// exact host.
    pub waf_host_allow: Option<&'static str>,
    /// Serve the apex wildcard from the CDN distribution.
    pub wildcard_domain: bool,
}

impl StagePolicy {
    /// Looks up the policy for a stage.
    #[must_use]
    pub fn for_stage(stage: Stage) -> Self {
        let standard = Self {
            versioned_bucket: false,
            legacy_origin_identity: false,
            cache_multi_az: false,
            waf_host_allow: None,
            wildcard_domain: false,
        };
        match stage {
            Stage::Dev | Stage::Staging => standard,
            Stage::PrdV0264 => Self {
                versioned_bucket: true,
                legacy_origin_identity: true,
                ..standard
            },
            Stage::PrdV0283 => Self {
                cache_multi_az: true,
                ..standard
            },
            Stage::PrdV0292 => Self {
                waf_host_allow: Some("production.diycities.jp"),
                wildcard_domain: true,
                ..standard
            },
        }
    }
}
