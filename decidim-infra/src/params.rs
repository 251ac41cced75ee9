//! Stage-scoped parameter namespace.
//!
//! Secrets and cross-stack strings live in an external parameter store
//! under `/decidim-cfj/{stage}`. Builders read them by name (a deferred
//! resolution the provisioning engine performs at deploy time) and the
//! edge stack publishes its distribution coordinates back into the same
//! namespace for the storage policy to pick up.

use crate::config::Stage;
use crate::graph::Value;

/// Names of the parameters the service consumes or publishes.
pub mod names {
    /// S3 access key for the application's direct uploads.
    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    /// Matching secret key.
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    /// CDN endpoint the application serves uploaded assets from.
    pub const AWS_CLOUD_FRONT_END_POINT: &str = "AWS_CLOUD_FRONT_END_POINT";
    /// Database name for an existing instance.
    pub const RDS_DB_NAME: &str = "RDS_DB_NAME";
    /// Database master username.
    pub const RDS_USERNAME: &str = "RDS_USERNAME";
    /// Database master password.
    pub const RDS_PASSWORD: &str = "RDS_PASSWORD";
    /// Rails secret key base.
    pub const SECRET_KEY_BASE: &str = "SECRET_KEY_BASE";
    /// New Relic license key.
    pub const NEW_RELIC_LICENSE_KEY: &str = "NEW_RELIC_LICENSE_KEY";
    /// SMTP relay address.
    pub const SMTP_ADDRESS: &str = "SMTP_ADDRESS";
    /// SMTP username.
    pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
    /// SMTP password.
    pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
    /// Distribution id published by the edge stack.
    pub const CLOUDFRONT_DISTRIBUTION_ID: &str = "CLOUDFRONT_DISTRIBUTION_ID";
    /// Distribution ARN published by the edge stack.
    pub const CLOUDFRONT_DISTRIBUTION_ARN: &str = "CLOUDFRONT_DISTRIBUTION_ARN";
}

/// A stage-scoped view of the parameter store.
#[derive(Debug, Clone)]
pub struct ParameterNamespace {
    prefix: String,
}

impl ParameterNamespace {
    /// Creates the namespace for a stage.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            prefix: format!("/decidim-cfj/{stage}"),
        }
    }

    /// Full path of a named parameter.
    #[must_use]
    pub fn path(&self, name: &str) -> String {
        format!("{}/{name}", self.prefix)
    }

    /// A deferred read of a named parameter, resolved by the
    /// provisioning engine at deploy time.
    #[must_use]
    pub fn read(&self, name: &str) -> Value {
        Value::Param(self.path(name))
    }
}
