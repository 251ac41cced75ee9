//! Relational store builder: the managed PostgreSQL instance.
//!
//! Branches on the snapshot flag: a restore carries the snapshot
//! identifier and no name or credentials, a fresh instance carries the
//! configured database name with credentials read from the parameter
//! store. Retention behavior is always explicit in configuration, never
//! left to engine defaults, and automated backups survive teardown.

use super::{StackBuilder, SynthContext};
use crate::config::RemovalPolicy;
use crate::errors::SynthError;
use crate::graph::{DeletionPolicy, OutputRegistry, Resource, Stack, Value};
use crate::params::names;

/// Builds the database stack.
#[derive(Debug, Default)]
pub struct DatabaseBuilder;

impl From<RemovalPolicy> for DeletionPolicy {
    fn from(policy: RemovalPolicy) -> Self {
        match policy {
            RemovalPolicy::Delete => Self::Delete,
            RemovalPolicy::Snapshot => Self::Snapshot,
            RemovalPolicy::Retain => Self::Retain,
        }
    }
}

impl StackBuilder for DatabaseBuilder {
    fn name(&self) -> &'static str {
        "database"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["endpoint"]
    }

    fn consumes(&self) -> &'static [&'static str] {
        &[
            "network/rds_sg_id",
            "network/public_subnet_0",
            "network/public_subnet_1",
            "network/private_subnet_0",
            "network/private_subnet_1",
        ]
    }

    fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("Rds"));
        let rds = &ctx.config.rds;

        // Restored instances join the pre-existing public subnets they
        // were snapshotted from; fresh instances stay private.
        let subnet_tier = if rds.snapshot { "public" } else { "private" };
        let subnets = Value::List(vec![
            outputs.get(self.name(), &format!("network/{subnet_tier}_subnet_0"))?,
            outputs.get(self.name(), &format!("network/{subnet_tier}_subnet_1"))?,
        ]);
        stack.add(
            Resource::new("DbSubnetGroup", "AWS::RDS::DBSubnetGroup")
                .prop(
                    "DBSubnetGroupDescription",
                    format!("{} database subnets", ctx.prefix()),
                )
                .prop("SubnetIds", subnets),
        )?;

        let logical_id = if rds.snapshot { "RestoreRds" } else { "CreateRds" };
        let mut instance = Resource::new(logical_id, "AWS::RDS::DBInstance")
            .prop("Engine", "postgres")
            .prop("EngineVersion", rds.postgres_version.clone())
            .prop("DBInstanceClass", rds.instance_class.clone())
            .prop("StorageType", "gp2")
            .prop("AllocatedStorage", rds.allocated_storage.to_string())
            .prop("MaxAllocatedStorage", rds.max_allocated_storage)
            .prop("MultiAZ", rds.multi_az)
            .prop("DeletionProtection", rds.deletion_protection)
            .prop("DeleteAutomatedBackups", false)
            .prop("DBSubnetGroupName", Value::reference("DbSubnetGroup"))
            .prop(
                "VPCSecurityGroups",
                Value::List(vec![outputs.get(self.name(), "network/rds_sg_id")?]),
            )
            .deletion_policy(rds.removal_policy.into());

        if rds.snapshot {
            instance = instance.prop("DBSnapshotIdentifier", rds.snapshot_identifier.clone());
        } else {
            let params = ctx.params();
            instance = instance
                .prop("DBName", rds.name.clone())
                .prop("MasterUsername", params.read(names::RDS_USERNAME))
                .prop("MasterUserPassword", params.read(names::RDS_PASSWORD));
        }
        stack.add(instance)?;

        stack.export("endpoint", Value::attr(logical_id, "Endpoint.Address"));
        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;
    use crate::stacks::NetworkBuilder;
    use serde_json::json;

    fn build_with(stage: Stage, mutate: impl FnOnce(&mut SynthContext)) -> Stack {
        let mut ctx = SynthContext::new(stage, "latest").unwrap();
        mutate(&mut ctx);
        let mut registry = OutputRegistry::new();
        let network = NetworkBuilder.build(&ctx, &OutputRegistry::new()).unwrap();
        for (key, value) in network.exports() {
            registry.insert("network", key, value.clone());
        }
        DatabaseBuilder.build(&ctx, &registry).unwrap()
    }

    #[test]
    fn test_fresh_instance_uses_parameter_credentials() {
        let stack = build_with(Stage::Staging, |ctx| {
            ctx.config.rds.snapshot = false;
        });
        let instance = stack.resource("CreateRds").unwrap();
        assert!(stack.resource("RestoreRds").is_none());
        assert_eq!(
            instance.properties()["MasterUsername"],
            json!("{{resolve:ssm:/decidim-cfj/staging/RDS_USERNAME}}")
        );
        assert_eq!(
            instance.properties()["MasterUserPassword"],
            json!("{{resolve:ssm:/decidim-cfj/staging/RDS_PASSWORD}}")
        );
        assert!(instance.properties().get("DBSnapshotIdentifier").is_none());
    }

    #[test]
    fn test_restore_references_snapshot_and_no_credentials() {
        let stack = build_with(Stage::Staging, |ctx| {
            ctx.config.rds.snapshot = true;
            ctx.config.rds.snapshot_identifier = "snap-123".to_string();
        });
        let instance = stack.resource("RestoreRds").unwrap();
        assert!(stack.resource("CreateRds").is_none());
        assert_eq!(instance.properties()["DBSnapshotIdentifier"], "snap-123");
        assert!(instance.properties().get("DBName").is_none());
        assert!(instance.properties().get("MasterUsername").is_none());
        assert!(instance.properties().get("MasterUserPassword").is_none());
    }

    #[test]
    fn test_retention_is_always_explicit() {
        let stack = build_with(Stage::Dev, |_| {});
        let instance = stack.resources_of_type("AWS::RDS::DBInstance")[0];
        assert_eq!(instance.properties()["DeleteAutomatedBackups"], false);
        assert_eq!(instance.properties()["StorageType"], "gp2");
        assert!(instance.properties().contains_key("DeletionProtection"));
        assert!(instance.properties().contains_key("MultiAZ"));
    }

    #[test]
    fn test_endpoint_export_tracks_branch_logical_id() {
        let stack = build_with(Stage::Staging, |ctx| {
            ctx.config.rds.snapshot = true;
            ctx.config.rds.snapshot_identifier = "snap-9".to_string();
        });
        // Deferred handle becomes an export-backed import.
        assert!(stack
            .outputs()
            .iter()
            .any(|o| o.export_name.as_deref() == Some("stagingdecidimRdsStack:Endpoint")));
    }
}
