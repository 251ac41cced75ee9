//! Stage selection and per-stage configuration bundles.
//!
//! A configuration bundle is loaded exactly once, before any resource is
//! declared, and is never mutated afterwards. The bundles themselves are
//! compiled into the binary (one JSON file per stage under `config/`), so
//! resolution is a static, side-effect-free lookup.

mod policy;

pub use policy::StagePolicy;

use crate::errors::SynthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A deployment stage.
///
/// The set is closed: anything outside it is rejected before synthesis
/// starts. The three `prd-*` entries are successive production topologies
/// that are still deployed side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Development environment.
    Dev,
    /// Staging environment.
    Staging,
    /// Production, v0.26.4 topology.
    PrdV0264,
    /// Production, v0.28.3 topology.
    PrdV0283,
    /// Production, v0.29.2 topology.
    PrdV0292,
}

impl Stage {
    /// All known stages, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Dev,
        Self::Staging,
        Self::PrdV0264,
        Self::PrdV0283,
        Self::PrdV0292,
    ];

    /// The stage selector as it appears on the command line and in
    /// resource names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::PrdV0264 => "prd-v0264",
            Self::PrdV0283 => "prd-v0283",
            Self::PrdV0292 => "prd-v0292",
        }
    }

    /// Resolves the per-stage policy table entry.
    #[must_use]
    pub fn policy(self) -> StagePolicy {
        StagePolicy::for_stage(self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| SynthError::UnknownStage(s.to_string()))
    }
}

/// AWS account/region the stage deploys into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsEnv {
    /// Twelve-digit account id.
    pub account_id: String,
    /// Region name, e.g. `ap-northeast-1`.
    pub region: String,
}

/// A pre-existing subnet to import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetConfig {
    /// Subnet id.
    pub subnet_id: String,
    /// Availability zone the subnet lives in.
    pub availability_zone: String,
    /// Route table attached to the subnet.
    pub route_table_id: String,
}

/// A pre-existing VPC to import instead of creating one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcConfig {
    /// VPC id.
    pub vpc_id: String,
    /// CIDR block of the VPC.
    pub cidr_block: String,
    /// Availability zones covered by the subnets.
    pub availability_zones: Vec<String>,
    /// Public subnets.
    pub public_subnets: Vec<SubnetConfig>,
    /// Private subnets.
    pub private_subnets: Vec<SubnetConfig>,
}

/// What happens to a resource when its stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the resource.
    Delete,
    /// Take a final snapshot, then delete.
    Snapshot,
    /// Keep the resource.
    Retain,
}

/// Relational database parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdsConfig {
    /// Database name for a fresh instance.
    pub name: String,
    /// PostgreSQL engine version, e.g. `15.7`.
    pub postgres_version: String,
    /// Instance class, e.g. `db.t3.medium`.
    pub instance_class: String,
    /// Restore from a snapshot instead of creating fresh.
    pub snapshot: bool,
    /// Snapshot to restore from; required when `snapshot` is set.
    #[serde(default)]
    pub snapshot_identifier: String,
    /// Allocated storage in GiB.
    pub allocated_storage: u32,
    /// Storage autoscaling ceiling in GiB.
    pub max_allocated_storage: u32,
    /// Multi-AZ replication.
    pub multi_az: bool,
    /// Deletion protection flag; never left to engine defaults.
    pub deletion_protection: bool,
    /// Teardown behavior; never left to engine defaults.
    pub removal_policy: RemovalPolicy,
}

/// Replicated in-memory cache parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Node type, e.g. `cache.t3.micro`.
    pub node_type: String,
    /// Redis engine version.
    pub engine_version: String,
    /// Number of cache clusters in the replication group.
    pub num_nodes: u32,
    /// Automatic failover flag.
    pub automatic_failover: bool,
}

/// CPU/memory limits for the task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Task CPU units.
    pub cpu: u32,
    /// Task memory limit in MiB.
    pub memory_limit_mib: u32,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            cpu: 2048,
            memory_limit_mib: 4096,
        }
    }
}

/// Target-tracking auto-scaling parameters for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScalingConfig {
    /// Minimum running task count.
    pub min_capacity: u32,
    /// Maximum running task count.
    pub max_capacity: u32,
    /// Average CPU utilization target, percent.
    pub cpu_target_percent: f64,
    /// Average memory utilization target, percent.
    pub memory_target_percent: f64,
}

/// Mixed spot/on-demand capacity weights for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Relative weight of Fargate Spot capacity.
    pub spot_weight: u32,
    /// Relative weight of on-demand Fargate capacity.
    pub on_demand_weight: u32,
    /// On-demand tasks to place before spreading by weight.
    #[serde(default)]
    pub on_demand_base: u32,
}

/// A recurring maintenance task: a cron expression plus a one-off
/// container command override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskConfig {
    /// Name, used in the rule's logical id.
    pub name: String,
    /// Schedule expression, e.g. `cron(0 18 * * ? *)`.
    pub schedule: String,
    /// Command run in the app container.
    pub command: Vec<String>,
}

/// Container service and load balancer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Hosted zone the service publishes into.
    pub domain: String,
    /// SMTP HELO domain passed to the application.
    pub smtp_domain: String,
    /// ECR repository holding the application image.
    pub repository: String,
    /// ECR repository holding the nginx sidecar image.
    pub nginx_repository: String,
    /// Certificate ARNs attached to the HTTPS listener.
    pub certificates: Vec<String>,
    /// Certificate ARN for the CDN distribution (us-east-1).
    pub cloudfront_certificate: String,
    /// Task sizing.
    #[serde(default)]
    pub container: ContainerSpec,
    /// Auto-scaling bounds and targets.
    pub autoscaling: AutoScalingConfig,
    /// Spot/on-demand capacity mix.
    pub capacity: CapacityConfig,
    /// Recurring maintenance invocations.
    #[serde(default)]
    pub scheduled_tasks: Vec<ScheduledTaskConfig>,
}

/// Descriptive labels stamped on every declared resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Project name.
    pub project: String,
    /// Source repository.
    pub repository: String,
    /// Owning government/organization.
    pub owner: String,
}

/// The immutable, stage-scoped configuration bundle.
///
/// Loaded once at program start and referenced read-only by every builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account/region to deploy into.
    pub aws: AwsEnv,
    /// Pre-existing VPC to import; absent means create one.
    #[serde(default)]
    pub vpc: Option<VpcConfig>,
    /// Allowed origins for direct client uploads; empty disables CORS.
    #[serde(default)]
    pub upload_cors_origins: Vec<String>,
    /// Relational database parameters.
    pub rds: RdsConfig,
    /// Cache cluster parameters.
    pub cache: CacheConfig,
    /// Container service parameters.
    pub service: ServiceConfig,
    /// Resource labels.
    pub tags: TagConfig,
}

/// The bundled configuration file for a stage.
const fn bundled(stage: Stage) -> &'static str {
    match stage {
        Stage::Dev => include_str!("../../config/dev.json"),
        Stage::Staging => include_str!("../../config/staging.json"),
        Stage::PrdV0264 => include_str!("../../config/prd-v0264.json"),
        Stage::PrdV0283 => include_str!("../../config/prd-v0283.json"),
        Stage::PrdV0292 => include_str!("../../config/prd-v0292.json"),
    }
}

impl Config {
    /// Resolves the configuration bundle for a stage.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::MalformedConfiguration`] if the bundle does
    /// not parse or fails cross-field validation.
    pub fn for_stage(stage: Stage) -> Result<Self, SynthError> {
        let raw = bundled(stage);
        let config: Self =
            serde_json::from_str(raw).map_err(|err| SynthError::MalformedConfiguration {
                stage: stage.to_string(),
                message: err.to_string(),
            })?;
        config.validate(stage)?;
        Ok(config)
    }

    /// Cross-field validation that serde cannot express.
    fn validate(&self, stage: Stage) -> Result<(), SynthError> {
        let fail = |message: String| SynthError::MalformedConfiguration {
            stage: stage.to_string(),
            message,
        };

        if self.rds.snapshot && self.rds.snapshot_identifier.is_empty() {
            return Err(fail(
                "rds.snapshot is set but rds.snapshot_identifier is empty".to_string(),
            ));
        }
        if self.rds.max_allocated_storage < self.rds.allocated_storage {
            return Err(fail(format!(
                "rds.max_allocated_storage ({}) is below rds.allocated_storage ({})",
                self.rds.max_allocated_storage, self.rds.allocated_storage
            )));
        }
        if self.cache.automatic_failover && self.cache.num_nodes < 2 {
            return Err(fail(
                "cache.automatic_failover requires at least two nodes".to_string(),
            ));
        }
        if self.service.certificates.is_empty() {
            return Err(fail("service.certificates must not be empty".to_string()));
        }
        if self.service.autoscaling.max_capacity < self.service.autoscaling.min_capacity {
            return Err(fail(
                "service.autoscaling.max_capacity is below min_capacity".to_string(),
            ));
        }
        if self.service.capacity.spot_weight == 0 && self.service.capacity.on_demand_weight == 0 {
            return Err(fail(
                "service.capacity must give a nonzero weight to spot or on-demand".to_string(),
            ));
        }
        if let Some(vpc) = &self.vpc {
            if vpc.public_subnets.is_empty() || vpc.private_subnets.is_empty() {
                return Err(fail(
                    "vpc import requires both public and private subnets".to_string(),
                ));
            }
        }
        Ok(())
    }
}
