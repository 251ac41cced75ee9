//! Compute/service builder: cluster, tasks, load balancer, scheduling.
//!
//! Declares the ECS cluster, the Fargate task definition with the app and
//! sidekiq containers, the service with its mixed spot/on-demand capacity
//! strategy and target-tracking auto-scaling, the internet-facing ALB with
//! HTTP/HTTPS listeners, the Route53 alias the CDN points at, and the
//! recurring maintenance task invocations.

use super::{StackBuilder, SynthContext};
use crate::errors::SynthError;
use crate::graph::{pascal_case, DeletionPolicy, OutputRegistry, Resource, Stack, Value};
use crate::params::names;
use serde_json::json;

const CONTAINER_PORT: u16 = 3000;
const LOG_RETENTION_DAYS: u32 = 14;

/// Builds the service stack.
#[derive(Debug, Default)]
pub struct ServiceBuilder;

impl ServiceBuilder {
    /// The environment map shared by the app and worker containers,
    /// in the order the application documents its variables.
    fn container_environment(
        ctx: &SynthContext,
        cache_endpoint: &Value,
        database_endpoint: &Value,
        bucket_name: &Value,
    ) -> Vec<(&'static str, Value)> {
        let params = ctx.params();
        vec![
            (names::AWS_ACCESS_KEY_ID, params.read(names::AWS_ACCESS_KEY_ID)),
            (
                names::AWS_SECRET_ACCESS_KEY,
                params.read(names::AWS_SECRET_ACCESS_KEY),
            ),
            (
                names::AWS_CLOUD_FRONT_END_POINT,
                params.read(names::AWS_CLOUD_FRONT_END_POINT),
            ),
            (
                "REDIS_URL",
                Value::concat([
                    Value::str("redis://"),
                    cache_endpoint.clone(),
                    Value::str(":6379"),
                ]),
            ),
            (names::RDS_DB_NAME, params.read(names::RDS_DB_NAME)),
            ("RDS_HOSTNAME", database_endpoint.clone()),
            (names::RDS_USERNAME, params.read(names::RDS_USERNAME)),
            (names::RDS_PASSWORD, params.read(names::RDS_PASSWORD)),
            (names::SECRET_KEY_BASE, params.read(names::SECRET_KEY_BASE)),
            (
                names::NEW_RELIC_LICENSE_KEY,
                params.read(names::NEW_RELIC_LICENSE_KEY),
            ),
            (names::SMTP_ADDRESS, params.read(names::SMTP_ADDRESS)),
            (names::SMTP_USERNAME, params.read(names::SMTP_USERNAME)),
            (names::SMTP_PASSWORD, params.read(names::SMTP_PASSWORD)),
            ("SMTP_DOMAIN", Value::str(&ctx.config.service.smtp_domain)),
            ("AWS_BUCKET_NAME", bucket_name.clone()),
            ("DECIDIM_COMMENTS_LIMIT", Value::str("30")),
        ]
    }

    fn render_environment(environment: &[(&str, Value)]) -> serde_json::Value {
        serde_json::Value::Array(
            environment
                .iter()
                .map(|(name, value)| json!({"Name": name, "Value": value}))
                .collect(),
        )
    }

    fn image_uri(ctx: &SynthContext) -> String {
        format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            ctx.config.aws.account_id,
            ctx.config.aws.region,
            ctx.config.service.repository,
            ctx.image_tag
        )
    }

    fn log_group(stack: &mut Stack, logical_id: &str, name: String) -> Result<(), SynthError> {
        stack.add(
            Resource::new(logical_id, "AWS::Logs::LogGroup")
                .prop("LogGroupName", name)
                .prop("RetentionInDays", LOG_RETENTION_DAYS)
                .deletion_policy(DeletionPolicy::Delete),
        )
    }

    fn log_configuration(ctx: &SynthContext, log_group: &str, prefix: &str) -> serde_json::Value {
        json!({
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": Value::reference(log_group),
                "awslogs-region": &ctx.config.aws.region,
                "awslogs-stream-prefix": prefix,
            }
        })
    }

    fn health_check(command: &str) -> serde_json::Value {
        json!({
            "Command": ["CMD-SHELL", command],
            "Interval": 60,
            "Retries": 3,
            "StartPeriod": 120,
        })
    }

    fn iam_roles(stack: &mut Stack) -> Result<(), SynthError> {
        let assume = |service: &str| {
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": service},
                    "Action": "sts:AssumeRole",
                }]
            })
        };
        stack.add(
            Resource::new("TaskExecutionRole", "AWS::IAM::Role")
                .prop("AssumeRolePolicyDocument", assume("ecs-tasks.amazonaws.com"))
                .prop(
                    "ManagedPolicyArns",
                    json!(["arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy"]),
                ),
        )?;
        stack.add(
            Resource::new("TaskRole", "AWS::IAM::Role")
                .prop("AssumeRolePolicyDocument", assume("ecs-tasks.amazonaws.com"))
                .prop(
                    "Policies",
                    json!([{
                        "PolicyName": "exec-command",
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Action": [
                                    "ssmmessages:CreateControlChannel",
                                    "ssmmessages:CreateDataChannel",
                                    "ssmmessages:OpenControlChannel",
                                    "ssmmessages:OpenDataChannel",
                                ],
                                "Resource": "*",
                            }]
                        }
                    }]),
                ),
        )
    }

    fn scheduled_tasks(
        ctx: &SynthContext,
        stack: &mut Stack,
        subnets: &Value,
        service_sg: &Value,
    ) -> Result<(), SynthError> {
        if ctx.config.service.scheduled_tasks.is_empty() {
            return Ok(());
        }

        stack.add(
            Resource::new("ScheduledTaskRole", "AWS::IAM::Role")
                .prop(
                    "AssumeRolePolicyDocument",
                    json!({
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": {"Service": "events.amazonaws.com"},
                            "Action": "sts:AssumeRole",
                        }]
                    }),
                )
                .prop(
                    "Policies",
                    json!([{
                        "PolicyName": "run-task",
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [
                                {
                                    "Effect": "Allow",
                                    "Action": "ecs:RunTask",
                                    "Resource": Value::reference("TaskDefinition"),
                                },
                                {
                                    "Effect": "Allow",
                                    "Action": "iam:PassRole",
                                    "Resource": [
                                        Value::attr("TaskExecutionRole", "Arn"),
                                        Value::attr("TaskRole", "Arn"),
                                    ],
                                },
                            ]
                        }
                    }]),
                ),
        )?;

        for task in &ctx.config.service.scheduled_tasks {
            let input = serde_json::to_string(&json!({
                "containerOverrides": [{
                    "name": "appContainer",
                    "command": &task.command,
                }]
            }))?;
            stack.add(
                Resource::new(
                    format!("ScheduledTask{}", pascal_case(&task.name)),
                    "AWS::Events::Rule",
                )
                .prop("ScheduleExpression", task.schedule.clone())
                .prop("State", "ENABLED")
                .prop(
                    "Targets",
                    json!([{
                        "Id": &task.name,
                        "Arn": Value::attr("Cluster", "Arn"),
                        "RoleArn": Value::attr("ScheduledTaskRole", "Arn"),
                        "EcsParameters": {
                            "TaskDefinitionArn": Value::reference("TaskDefinition"),
                            "LaunchType": "FARGATE",
                            "NetworkConfiguration": {
                                "AwsVpcConfiguration": {
                                    "Subnets": subnets,
                                    "SecurityGroups": [service_sg],
                                    "AssignPublicIp": "ENABLED",
                                }
                            },
                        },
                        "Input": input,
                    }]),
                )
                .not_taggable(),
            )?;
        }
        Ok(())
    }
}

impl StackBuilder for ServiceBuilder {
    fn name(&self) -> &'static str {
        "service"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["origin_hostname", "alb_dns"]
    }

    fn consumes(&self) -> &'static [&'static str] {
        &[
            "network/vpc_id",
            "network/public_subnet_0",
            "network/public_subnet_1",
            "network/service_sg_id",
            "network/alb_sg_id",
            "cache/endpoint",
            "database/endpoint",
            "storage/bucket_name",
        ]
    }

    #[allow(clippy::too_many_lines)]
    fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("Decidim"));
        let service_cfg = &ctx.config.service;

        let vpc = outputs.get(self.name(), "network/vpc_id")?;
        let subnets = Value::List(vec![
            outputs.get(self.name(), "network/public_subnet_0")?,
            outputs.get(self.name(), "network/public_subnet_1")?,
        ]);
        let service_sg = outputs.get(self.name(), "network/service_sg_id")?;
        let alb_sg = outputs.get(self.name(), "network/alb_sg_id")?;
        let cache_endpoint = outputs.get(self.name(), "cache/endpoint")?;
        let database_endpoint = outputs.get(self.name(), "database/endpoint")?;
        let bucket_name = outputs.get(self.name(), "storage/bucket_name")?;

        let cluster_name = format!("{}DecidimCluster", ctx.stage);
        let service_name = format!("{}DecidimService", ctx.stage);

        stack.add(
            Resource::new("Cluster", "AWS::ECS::Cluster")
                .prop("ClusterName", cluster_name.clone())
                .prop("CapacityProviders", json!(["FARGATE", "FARGATE_SPOT"])),
        )?;

        Self::iam_roles(&mut stack)?;
        Self::log_group(
            &mut stack,
            "AppLogGroup",
            format!("{}-serviceLogGroup", ctx.prefix()),
        )?;
        Self::log_group(
            &mut stack,
            "SidekiqLogGroup",
            format!("{}-sidekiqLogGroup", ctx.prefix()),
        )?;

        let environment = Self::container_environment(
            ctx,
            &cache_endpoint,
            &database_endpoint,
            &bucket_name,
        );
        let environment = Self::render_environment(&environment);
        let image = Self::image_uri(ctx);

        stack.add(
            Resource::new("TaskDefinition", "AWS::ECS::TaskDefinition")
                .prop("Family", format!("{}DecidimTaskDefinition", ctx.stage))
                .prop("Cpu", service_cfg.container.cpu.to_string())
                .prop("Memory", service_cfg.container.memory_limit_mib.to_string())
                .prop("NetworkMode", "awsvpc")
                .prop("RequiresCompatibilities", json!(["FARGATE"]))
                .prop("ExecutionRoleArn", Value::attr("TaskExecutionRole", "Arn"))
                .prop("TaskRoleArn", Value::attr("TaskRole", "Arn"))
                .prop(
                    "ContainerDefinitions",
                    json!([
                        {
                            "Name": "appContainer",
                            "Essential": true,
                            "Image": image.clone(),
                            "Environment": environment.clone(),
                            "PortMappings": [{"ContainerPort": CONTAINER_PORT}],
                            "LogConfiguration":
                                Self::log_configuration(ctx, "AppLogGroup", "app"),
                            "HealthCheck": Self::health_check(
                                "curl --fail -s http://localhost:3000 || exit 1"
                            ),
                        },
                        {
                            "Name": "sidekiqContainer",
                            "Essential": true,
                            "Image": image,
                            "Environment": environment,
                            "Command": [
                                "bundle", "exec", "sidekiq", "-C", "/app/config/sidekiq.yml"
                            ],
                            "LogConfiguration":
                                Self::log_configuration(ctx, "SidekiqLogGroup", "sidekiq"),
                            "HealthCheck": Self::health_check("ps aux | grep '[s]idekiq'"),
                        },
                    ]),
                ),
        )?;

        // ALB access logs land in their own bucket.
        stack.add(
            Resource::new("AlbLogBucket", "AWS::S3::Bucket")
                .prop("BucketName", format!("{}-alb-logs", ctx.prefix()))
                .deletion_policy(DeletionPolicy::Delete),
        )?;
        stack.add(
            Resource::new("AlbLogBucketPolicy", "AWS::S3::BucketPolicy")
                .prop("Bucket", Value::reference("AlbLogBucket"))
                .prop(
                    "PolicyDocument",
                    json!({
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": {"Service": "logdelivery.elasticloadbalancing.amazonaws.com"},
                            "Action": "s3:PutObject",
                            "Resource": Value::concat([
                                Value::attr("AlbLogBucket", "Arn"),
                                Value::str("/*"),
                            ]),
                        }]
                    }),
                )
                .not_taggable(),
        )?;

        stack.add(
            Resource::new("Alb", "AWS::ElasticLoadBalancingV2::LoadBalancer")
                .prop("Name", format!("{}-Decidim-Alb", ctx.stage))
                .prop("Scheme", "internet-facing")
                .prop("Type", "application")
                .prop("SecurityGroups", Value::List(vec![alb_sg]))
                .prop("Subnets", subnets.clone())
                .prop(
                    "LoadBalancerAttributes",
                    json!([
                        {"Key": "routing.http2.enabled", "Value": "true"},
                        {"Key": "access_logs.s3.enabled", "Value": "true"},
                        {
                            "Key": "access_logs.s3.bucket",
                            "Value": Value::reference("AlbLogBucket"),
                        },
                    ]),
                )
                .depends_on("AlbLogBucketPolicy"),
        )?;

        stack.add(
            Resource::new("TargetGroup", "AWS::ElasticLoadBalancingV2::TargetGroup")
                .prop("Name", format!("{}-TargetGroup", ctx.prefix()))
                .prop("VpcId", vpc)
                .prop("Port", CONTAINER_PORT)
                .prop("Protocol", "HTTP")
                .prop("TargetType", "ip")
                .prop("HealthCheckPath", "/")
                .prop("HealthCheckPort", CONTAINER_PORT.to_string())
                .prop("HealthCheckProtocol", "HTTP")
                .prop("Matcher", json!({"HttpCode": "301"})),
        )?;

        let forward = json!([{
            "Type": "forward",
            "TargetGroupArn": Value::reference("TargetGroup"),
        }]);
        stack.add(
            Resource::new("HttpListener", "AWS::ElasticLoadBalancingV2::Listener")
                .prop("LoadBalancerArn", Value::reference("Alb"))
                .prop("Port", 80)
                .prop("Protocol", "HTTP")
                .prop("DefaultActions", forward.clone())
                .not_taggable(),
        )?;
        stack.add(
            Resource::new("HttpsListener", "AWS::ElasticLoadBalancingV2::Listener")
                .prop("LoadBalancerArn", Value::reference("Alb"))
                .prop("Port", 443)
                .prop("Protocol", "HTTPS")
                .prop(
                    "Certificates",
                    serde_json::Value::Array(
                        service_cfg
                            .certificates
                            .iter()
                            .map(|arn| json!({"CertificateArn": arn}))
                            .collect(),
                    ),
                )
                .prop("DefaultActions", forward)
                .not_taggable(),
        )?;

        let capacity = &service_cfg.capacity;
        stack.add(
            Resource::new("Service", "AWS::ECS::Service")
                .prop("ServiceName", service_name.clone())
                .prop("Cluster", Value::reference("Cluster"))
                .prop("TaskDefinition", Value::reference("TaskDefinition"))
                .prop("DesiredCount", service_cfg.autoscaling.min_capacity)
                .prop("EnableExecuteCommand", true)
                .prop(
                    "CapacityProviderStrategy",
                    json!([
                        {
                            "CapacityProvider": "FARGATE_SPOT",
                            "Weight": capacity.spot_weight,
                        },
                        {
                            "CapacityProvider": "FARGATE",
                            "Weight": capacity.on_demand_weight,
                            "Base": capacity.on_demand_base,
                        },
                    ]),
                )
                .prop(
                    "NetworkConfiguration",
                    json!({
                        "AwsvpcConfiguration": {
                            "AssignPublicIp": "ENABLED",
                            "Subnets": subnets.clone(),
                            "SecurityGroups": [service_sg.clone()],
                        }
                    }),
                )
                .prop(
                    "LoadBalancers",
                    json!([{
                        "ContainerName": "appContainer",
                        "ContainerPort": CONTAINER_PORT,
                        "TargetGroupArn": Value::reference("TargetGroup"),
                    }]),
                )
                .depends_on("HttpListener")
                .depends_on("HttpsListener"),
        )?;

        let scaling = &service_cfg.autoscaling;
        stack.add(
            Resource::new(
                "ScalableTarget",
                "AWS::ApplicationAutoScaling::ScalableTarget",
            )
            .prop("ServiceNamespace", "ecs")
            .prop("ScalableDimension", "ecs:service:DesiredCount")
            .prop(
                "ResourceId",
                format!("service/{cluster_name}/{service_name}"),
            )
            .prop("MinCapacity", scaling.min_capacity)
            .prop("MaxCapacity", scaling.max_capacity)
            .depends_on("Service")
            .not_taggable(),
        )?;
        for (logical_id, metric, target) in [
            (
                "CpuScalingPolicy",
                "ECSServiceAverageCPUUtilization",
                scaling.cpu_target_percent,
            ),
            (
                "MemoryScalingPolicy",
                "ECSServiceAverageMemoryUtilization",
                scaling.memory_target_percent,
            ),
        ] {
            stack.add(
                Resource::new(logical_id, "AWS::ApplicationAutoScaling::ScalingPolicy")
                    .prop("PolicyName", format!("{}-{logical_id}", ctx.prefix()))
                    .prop("PolicyType", "TargetTrackingScaling")
                    .prop("ScalingTargetId", Value::reference("ScalableTarget"))
                    .prop(
                        "TargetTrackingScalingPolicyConfiguration",
                        json!({
                            "PredefinedMetricSpecification": {
                                "PredefinedMetricType": metric,
                            },
                            "TargetValue": target,
                        }),
                    )
                    .not_taggable(),
            )?;
        }

        let origin_hostname = ctx.origin_hostname();
        stack.add(
            Resource::new("AliasRecord", "AWS::Route53::RecordSet")
                .prop("HostedZoneName", format!("{}.", service_cfg.domain))
                .prop("Name", format!("{origin_hostname}."))
                .prop("Type", "A")
                .prop(
                    "AliasTarget",
                    json!({
                        "DNSName": Value::attr("Alb", "DNSName"),
                        "HostedZoneId": Value::attr("Alb", "CanonicalHostedZoneID"),
                    }),
                )
                .not_taggable(),
        )?;

        Self::scheduled_tasks(ctx, &mut stack, &subnets, &service_sg)?;

        stack.output(
            "PublicDomain",
            Value::str(&origin_hostname),
            Some("accessDomain".to_string()),
        );
        stack.export("origin_hostname", Value::str(origin_hostname));
        stack.export("alb_dns", Value::attr("Alb", "DNSName"));
        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;
    use crate::stacks::{CacheBuilder, DatabaseBuilder, NetworkBuilder, StorageBuilder};
    use serde_json::json;

    fn build(stage: Stage) -> (SynthContext, Stack) {
        let ctx = SynthContext::new(stage, "v1.2.3").unwrap();
        let mut registry = OutputRegistry::new();
        for (name, builder) in [
            ("network", Box::new(NetworkBuilder) as Box<dyn StackBuilder>),
            ("storage", Box::new(StorageBuilder)),
            ("cache", Box::new(CacheBuilder)),
            ("database", Box::new(DatabaseBuilder)),
        ] {
            let stack = builder.build(&ctx, &registry).unwrap();
            for (key, value) in stack.exports() {
                registry.insert(name, key, value.clone());
            }
        }
        let stack = ServiceBuilder.build(&ctx, &registry).unwrap();
        (ctx, stack)
    }

    fn container(stack: &Stack, name: &str) -> serde_json::Value {
        let task = stack.resource("TaskDefinition").unwrap();
        let definitions = task.properties()["ContainerDefinitions"]
            .as_array()
            .unwrap();
        definitions
            .iter()
            .find(|c| c["Name"] == name)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }

    #[test]
    fn test_both_containers_share_environment_and_image() {
        let (_, stack) = build(Stage::Staging);
        let app = container(&stack, "appContainer");
        let sidekiq = container(&stack, "sidekiqContainer");
        assert_eq!(app["Environment"], sidekiq["Environment"]);
        assert_eq!(app["Image"], sidekiq["Image"]);
        assert!(app["Image"].as_str().unwrap().ends_with(":v1.2.3"));
        assert_eq!(
            sidekiq["Command"],
            json!(["bundle", "exec", "sidekiq", "-C", "/app/config/sidekiq.yml"])
        );
    }

    #[test]
    fn test_redis_url_concatenates_cache_endpoint() {
        let (_, stack) = build(Stage::Staging);
        let app = container(&stack, "appContainer");
        let redis = app["Environment"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["Name"] == "REDIS_URL")
            .cloned()
            .unwrap();
        let rendered = serde_json::to_string(&redis["Value"]).unwrap();
        assert!(rendered.contains("redis://"));
        assert!(rendered.contains(":6379"));
        assert!(rendered.contains("Fn::ImportValue"));
    }

    #[test]
    fn test_capacity_strategy_mixes_spot_and_on_demand() {
        let (ctx, stack) = build(Stage::Staging);
        let service = stack.resource("Service").unwrap();
        let strategy = service.properties()["CapacityProviderStrategy"]
            .as_array()
            .unwrap();
        assert_eq!(strategy[0]["CapacityProvider"], "FARGATE_SPOT");
        assert_eq!(
            strategy[0]["Weight"],
            i64::from(ctx.config.service.capacity.spot_weight)
        );
        assert_eq!(strategy[1]["CapacityProvider"], "FARGATE");
    }

    #[test]
    fn test_autoscaling_targets_cpu_and_memory() {
        let (ctx, stack) = build(Stage::Staging);
        let target = stack.resource("ScalableTarget").unwrap();
        assert_eq!(
            target.properties()["MaxCapacity"],
            i64::from(ctx.config.service.autoscaling.max_capacity)
        );
        let cpu = stack.resource("CpuScalingPolicy").unwrap();
        assert_eq!(
            cpu.properties()["TargetTrackingScalingPolicyConfiguration"]
                ["PredefinedMetricSpecification"]["PredefinedMetricType"],
            "ECSServiceAverageCPUUtilization"
        );
        assert!(stack.resource("MemoryScalingPolicy").is_some());
    }

    #[test]
    fn test_target_group_expects_redirect_status() {
        let (_, stack) = build(Stage::Dev);
        let group = stack.resource("TargetGroup").unwrap();
        assert_eq!(group.properties()["Matcher"], json!({"HttpCode": "301"}));
        assert_eq!(group.properties()["HealthCheckPath"], "/");
        assert_eq!(group.properties()["Port"], i64::from(CONTAINER_PORT));
    }

    #[test]
    fn test_service_waits_for_listeners() {
        let (_, stack) = build(Stage::Dev);
        let service = stack.resource("Service").unwrap();
        assert!(service.depends().contains(&"HttpListener".to_string()));
        assert!(service.depends().contains(&"HttpsListener".to_string()));
    }

    #[test]
    fn test_scheduled_tasks_override_app_command() {
        let (ctx, stack) = build(Stage::PrdV0292);
        assert!(
            !ctx.config.service.scheduled_tasks.is_empty(),
            "prd-v0292 carries maintenance jobs"
        );
        let first = &ctx.config.service.scheduled_tasks[0];
        let rule = stack
            .resource(&format!("ScheduledTask{}", pascal_case(&first.name)))
            .unwrap();
        assert_eq!(rule.properties()["ScheduleExpression"], first.schedule.as_str());
        let input = rule.properties()["Targets"][0]["Input"].as_str().unwrap();
        assert!(input.contains("appContainer"));
        assert!(stack.resource("ScheduledTaskRole").is_some());
    }

    #[test]
    fn test_public_domain_output_is_exported() {
        let (_, stack) = build(Stage::Staging);
        let output = stack
            .outputs()
            .iter()
            .find(|o| o.name == "PublicDomain")
            .unwrap();
        assert_eq!(output.export_name.as_deref(), Some("accessDomain"));
        assert_eq!(
            output.value,
            Value::Str("staging-decidim-alb-origin.example.org".to_string())
        );
    }
}
