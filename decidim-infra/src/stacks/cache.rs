//! Cache builder: the Redis replication group.

use super::{StackBuilder, SynthContext};
use crate::errors::SynthError;
use crate::graph::{OutputRegistry, Resource, Stack, Value};

/// Builds the cache stack.
#[derive(Debug, Default)]
pub struct CacheBuilder;

impl StackBuilder for CacheBuilder {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["endpoint"]
    }

    fn consumes(&self) -> &'static [&'static str] {
        &["network/cache_sg_id", "network/cache_subnet_group"]
    }

    fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("ElastiCache"));
        let cache = &ctx.config.cache;
        let group_id = format!("{}-cache", ctx.prefix());

        let mut replication_group =
            Resource::new("ReplicationGroup", "AWS::ElastiCache::ReplicationGroup")
                .prop("ReplicationGroupId", group_id.clone())
                .prop("ReplicationGroupDescription", group_id)
                .prop("Engine", "redis")
                .prop("EngineVersion", cache.engine_version.clone())
                .prop("CacheNodeType", cache.node_type.clone())
                .prop("NumCacheClusters", cache.num_nodes)
                .prop("AutomaticFailoverEnabled", cache.automatic_failover)
                .prop(
                    "SecurityGroupIds",
                    Value::List(vec![outputs.get(self.name(), "network/cache_sg_id")?]),
                )
                .prop(
                    "CacheSubnetGroupName",
                    outputs.get(self.name(), "network/cache_subnet_group")?,
                );
        if ctx.policy.cache_multi_az {
            replication_group = replication_group.prop("MultiAZEnabled", true);
        }
        stack.add(replication_group)?;

        stack.export(
            "endpoint",
            Value::attr("ReplicationGroup", "ReaderEndPoint.Address"),
        );
        Ok(stack)
    }
}
