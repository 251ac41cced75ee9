//! Network builder: VPC, subnets and the security group lattice.
//!
//! Either imports a pre-existing VPC described in configuration (publishing
//! its identifiers for cross-stack lookup) or creates a fresh one with a
//! public/private subnet split across two availability zones and a single
//! NAT egress path. Always declares the four security groups with the fixed
//! permission lattice: ALB 80/443 from anywhere, service 80 from the ALB,
//! database 5432 from the service, cache 6379 from the service.

use super::{StackBuilder, SynthContext};
use crate::config::VpcConfig;
use crate::errors::SynthError;
use crate::graph::{OutputRegistry, Resource, Stack, Value};
use serde_json::json;

const VPC_CIDR: &str = "10.0.0.0/16";

/// Builds the network stack.
#[derive(Debug, Default)]
pub struct NetworkBuilder;

impl NetworkBuilder {
    /// Handle key for the VPC id.
    pub const VPC_ID: &'static str = "vpc_id";

    /// Re-exports an imported VPC's identifiers as stack outputs and
    /// returns the literal handles.
    fn import_vpc(ctx: &SynthContext, stack: &mut Stack, vpc: &VpcConfig) -> ImportedVpc {
        let export = |name: &str| format!("{}{}{name}", ctx.stage, ctx.service);

        stack.output("VpcId", Value::str(&vpc.vpc_id), Some(export("VpcId")));
        stack.output(
            "VpcCidrBlock",
            Value::str(&vpc.cidr_block),
            Some(export("VpcCidrBlock")),
        );
        for (i, az) in vpc.availability_zones.iter().enumerate() {
            stack.output(
                format!("AvailabilityZone{i}"),
                Value::str(az),
                Some(export(&format!("AvailabilityZone{i}"))),
            );
        }
        for (tier, subnets) in [
            ("Public", &vpc.public_subnets),
            ("Private", &vpc.private_subnets),
        ] {
            for (i, subnet) in subnets.iter().enumerate() {
                stack.output(
                    format!("{tier}SubnetId{i}"),
                    Value::str(&subnet.subnet_id),
                    Some(export(&format!("{tier}SubnetId{i}"))),
                );
                stack.output(
                    format!("{tier}SubnetAz{i}"),
                    Value::str(&subnet.availability_zone),
                    Some(export(&format!("{tier}SubnetAz{i}"))),
                );
                stack.output(
                    format!("{tier}SubnetRouteTableId{i}"),
                    Value::str(&subnet.route_table_id),
                    Some(export(&format!("{tier}SubnetRouteTableId{i}"))),
                );
            }
        }

        ImportedVpc {
            vpc: Value::str(&vpc.vpc_id),
            public_subnets: vpc
                .public_subnets
                .iter()
                .map(|s| Value::str(&s.subnet_id))
                .collect(),
            private_subnets: vpc
                .private_subnets
                .iter()
                .map(|s| Value::str(&s.subnet_id))
                .collect(),
        }
    }

    /// Declares a fresh VPC: two AZs, a /24 public and private subnet per
    /// AZ, an internet gateway and one NAT gateway.
    fn create_vpc(ctx: &SynthContext, stack: &mut Stack) -> Result<ImportedVpc, SynthError> {
        let export = |name: &str| format!("{}{}{name}", ctx.stage, ctx.service);

        stack.add(
            Resource::new("Vpc", "AWS::EC2::VPC")
                .prop("CidrBlock", VPC_CIDR)
                .prop("EnableDnsSupport", true)
                .prop("EnableDnsHostnames", true)
                .prop(
                    "Tags",
                    json!([{"Key": "Name", "Value": format!("{}{}", ctx.stage, ctx.service)}]),
                ),
        )?;
        stack.add(Resource::new("InternetGateway", "AWS::EC2::InternetGateway"))?;
        stack.add(
            Resource::new("VpcGatewayAttachment", "AWS::EC2::VPCGatewayAttachment")
                .prop("VpcId", Value::reference("Vpc"))
                .prop("InternetGatewayId", Value::reference("InternetGateway"))
                .not_taggable(),
        )?;

        stack.add(
            Resource::new("PublicRouteTable", "AWS::EC2::RouteTable")
                .prop("VpcId", Value::reference("Vpc")),
        )?;
        stack.add(
            Resource::new("PublicDefaultRoute", "AWS::EC2::Route")
                .prop("RouteTableId", Value::reference("PublicRouteTable"))
                .prop("DestinationCidrBlock", "0.0.0.0/0")
                .prop("GatewayId", Value::reference("InternetGateway"))
                .depends_on("VpcGatewayAttachment")
                .not_taggable(),
        )?;
        stack.add(
            Resource::new("PrivateRouteTable", "AWS::EC2::RouteTable")
                .prop("VpcId", Value::reference("Vpc")),
        )?;

        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for az in 0..2u32 {
            let public_id = format!("PublicSubnet{az}");
            let private_id = format!("PrivateSubnet{az}");
            stack.add(
                Resource::new(&public_id, "AWS::EC2::Subnet")
                    .prop("VpcId", Value::reference("Vpc"))
                    .prop("CidrBlock", format!("10.0.{az}.0/24"))
                    .prop("AvailabilityZone", Value::availability_zone(az))
                    .prop("MapPublicIpOnLaunch", true),
            )?;
            stack.add(
                Resource::new(&private_id, "AWS::EC2::Subnet")
                    .prop("VpcId", Value::reference("Vpc"))
                    .prop("CidrBlock", format!("10.0.{}.0/24", az + 2))
                    .prop("AvailabilityZone", Value::availability_zone(az)),
            )?;
            stack.add(
                Resource::new(
                    format!("PublicSubnet{az}RouteTableAssociation"),
                    "AWS::EC2::SubnetRouteTableAssociation",
                )
                .prop("SubnetId", Value::reference(&public_id))
                .prop("RouteTableId", Value::reference("PublicRouteTable"))
                .not_taggable(),
            )?;
            stack.add(
                Resource::new(
                    format!("PrivateSubnet{az}RouteTableAssociation"),
                    "AWS::EC2::SubnetRouteTableAssociation",
                )
                .prop("SubnetId", Value::reference(&private_id))
                .prop("RouteTableId", Value::reference("PrivateRouteTable"))
                .not_taggable(),
            )?;

            stack.output(
                format!("AvailabilityZone{az}"),
                Value::availability_zone(az),
                Some(export(&format!("AvailabilityZone{az}"))),
            );
            stack.output(
                format!("PublicSubnetId{az}"),
                Value::reference(&public_id),
                Some(export(&format!("PublicSubnetId{az}"))),
            );
            stack.output(
                format!("PrivateSubnetId{az}"),
                Value::reference(&private_id),
                Some(export(&format!("PrivateSubnetId{az}"))),
            );

            public_subnets.push(Value::reference(&public_id));
            private_subnets.push(Value::reference(&private_id));
        }

        stack.add(
            Resource::new("NatEip", "AWS::EC2::EIP")
                .prop("Domain", "vpc")
                .depends_on("VpcGatewayAttachment"),
        )?;
        stack.add(
            Resource::new("NatGateway", "AWS::EC2::NatGateway")
                .prop("AllocationId", Value::attr("NatEip", "AllocationId"))
                .prop("SubnetId", Value::reference("PublicSubnet0")),
        )?;
        stack.add(
            Resource::new("PrivateDefaultRoute", "AWS::EC2::Route")
                .prop("RouteTableId", Value::reference("PrivateRouteTable"))
                .prop("DestinationCidrBlock", "0.0.0.0/0")
                .prop("NatGatewayId", Value::reference("NatGateway"))
                .not_taggable(),
        )?;

        stack.output("VpcId", Value::reference("Vpc"), Some(export("VpcId")));
        stack.output(
            "VpcCidrBlock",
            Value::attr("Vpc", "CidrBlock"),
            Some(export("VpcCidrBlock")),
        );

        Ok(ImportedVpc {
            vpc: Value::reference("Vpc"),
            public_subnets,
            private_subnets,
        })
    }

    /// Declares one security group.
    fn security_group(
        stack: &mut Stack,
        logical_id: &str,
        group_name: String,
        vpc: &Value,
    ) -> Result<(), SynthError> {
        stack.add(
            Resource::new(logical_id, "AWS::EC2::SecurityGroup")
                .prop("GroupName", group_name.clone())
                .prop("GroupDescription", group_name)
                .prop("VpcId", vpc.clone()),
        )
    }

    /// Declares a group-to-group permit rule. The source group is always
    /// declared before the rule that names it.
    fn permit(
        stack: &mut Stack,
        logical_id: &str,
        target: &str,
        source: &str,
        port: u16,
    ) -> Result<(), SynthError> {
        stack.add(
            Resource::new(logical_id, "AWS::EC2::SecurityGroupIngress")
                .prop("GroupId", Value::attr(target, "GroupId"))
                .prop("SourceSecurityGroupId", Value::attr(source, "GroupId"))
                .prop("IpProtocol", "tcp")
                .prop("FromPort", port)
                .prop("ToPort", port)
                .not_taggable(),
        )
    }
}

/// Handles produced while declaring (or importing) the VPC.
struct ImportedVpc {
    vpc: Value,
    public_subnets: Vec<Value>,
    private_subnets: Vec<Value>,
}

impl StackBuilder for NetworkBuilder {
    fn name(&self) -> &'static str {
        "network"
    }

    fn provides(&self) -> &'static [&'static str] {
        &[
            "vpc_id",
            "public_subnet_0",
            "public_subnet_1",
            "private_subnet_0",
            "private_subnet_1",
            "alb_sg_id",
            "service_sg_id",
            "rds_sg_id",
            "cache_sg_id",
            "cache_subnet_group",
        ]
    }

    fn build(&self, ctx: &SynthContext, _outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("Network"));

        let topology = match &ctx.config.vpc {
            Some(vpc) => {
                if vpc.public_subnets.len() < 2 || vpc.private_subnets.len() < 2 {
                    return Err(SynthError::MalformedConfiguration {
                        stage: ctx.stage.to_string(),
                        message: "vpc import requires two subnets per tier".to_string(),
                    });
                }
                Self::import_vpc(ctx, &mut stack, vpc)
            }
            None => Self::create_vpc(ctx, &mut stack)?,
        };

        // The fixed permission lattice. Groups first, then the rules that
        // reference them as sources.
        Self::security_group(
            &mut stack,
            "SecurityGroupForAlb",
            format!("{}ForAlb", ctx.stage),
            &topology.vpc,
        )?;
        Self::security_group(
            &mut stack,
            "SecurityGroupForDecidimService",
            format!("{}ForDecidimService", ctx.stage),
            &topology.vpc,
        )?;
        Self::security_group(
            &mut stack,
            "SecurityGroupForRds",
            format!("{}ForRDS", ctx.stage),
            &topology.vpc,
        )?;
        Self::security_group(
            &mut stack,
            "SecurityGroupForCache",
            format!("{}ForElasticCache", ctx.stage),
            &topology.vpc,
        )?;

        for port in [80u16, 443] {
            stack.add(
                Resource::new(
                    format!("AlbIngress{port}"),
                    "AWS::EC2::SecurityGroupIngress",
                )
                .prop("GroupId", Value::attr("SecurityGroupForAlb", "GroupId"))
                .prop("CidrIp", "0.0.0.0/0")
                .prop("IpProtocol", "tcp")
                .prop("FromPort", port)
                .prop("ToPort", port)
                .not_taggable(),
            )?;
        }
        Self::permit(
            &mut stack,
            "ServiceFromAlbIngress",
            "SecurityGroupForDecidimService",
            "SecurityGroupForAlb",
            80,
        )?;
        Self::permit(
            &mut stack,
            "RdsFromServiceIngress",
            "SecurityGroupForRds",
            "SecurityGroupForDecidimService",
            5432,
        )?;
        Self::permit(
            &mut stack,
            "CacheFromServiceIngress",
            "SecurityGroupForCache",
            "SecurityGroupForDecidimService",
            6379,
        )?;

        let subnet_group_name = format!("{}-SubnetGroup", ctx.prefix());
        stack.add(
            Resource::new("CacheSubnetGroup", "AWS::ElastiCache::SubnetGroup")
                .prop("Description", "Elasticache Subnet Group")
                .prop("CacheSubnetGroupName", subnet_group_name.clone())
                .prop(
                    "SubnetIds",
                    Value::List(topology.public_subnets.clone()),
                )
                .not_taggable(),
        )?;

        stack.export(Self::VPC_ID, topology.vpc);
        stack.export("public_subnet_0", topology.public_subnets[0].clone());
        stack.export("public_subnet_1", topology.public_subnets[1].clone());
        stack.export("private_subnet_0", topology.private_subnets[0].clone());
        stack.export("private_subnet_1", topology.private_subnets[1].clone());
        stack.export("alb_sg_id", Value::attr("SecurityGroupForAlb", "GroupId"));
        stack.export(
            "service_sg_id",
            Value::attr("SecurityGroupForDecidimService", "GroupId"),
        );
        stack.export("rds_sg_id", Value::attr("SecurityGroupForRds", "GroupId"));
        stack.export("cache_sg_id", Value::attr("SecurityGroupForCache", "GroupId"));
        stack.export("cache_subnet_group", Value::str(subnet_group_name));

        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;

    fn build(stage: Stage) -> Stack {
        let ctx = SynthContext::new(stage, "latest").unwrap();
        NetworkBuilder.build(&ctx, &OutputRegistry::new()).unwrap()
    }

    #[test]
    fn test_lattice_is_fixed_for_every_stage() {
        for stage in Stage::ALL {
            let stack = build(stage);
            let ingress = stack.resources_of_type("AWS::EC2::SecurityGroupIngress");
            // 80 + 443 from anywhere into the ALB, then the three
            // group-to-group permits.
            assert_eq!(ingress.len(), 5, "{stage}");

            let rule = |id: &str| stack.resource(id).unwrap().properties().clone();
            assert_eq!(rule("AlbIngress80")["CidrIp"], "0.0.0.0/0");
            assert_eq!(rule("AlbIngress443")["FromPort"], 443);
            assert_eq!(rule("ServiceFromAlbIngress")["FromPort"], 80);
            assert_eq!(rule("RdsFromServiceIngress")["FromPort"], 5432);
            assert_eq!(rule("CacheFromServiceIngress")["FromPort"], 6379);
            assert_eq!(
                rule("RdsFromServiceIngress")["SourceSecurityGroupId"],
                serde_json::json!({"Fn::GetAtt": ["SecurityGroupForDecidimService", "GroupId"]})
            );
        }
    }

    #[test]
    fn test_create_path_declares_vpc_and_nat() {
        // dev has no vpc block, so the builder creates the topology.
        let stack = build(Stage::Dev);
        assert!(stack.resource("Vpc").is_some());
        assert_eq!(stack.resources_of_type("AWS::EC2::Subnet").len(), 4);
        assert_eq!(stack.resources_of_type("AWS::EC2::NatGateway").len(), 1);
        assert_eq!(
            stack.resource("Vpc").unwrap().properties()["CidrBlock"],
            VPC_CIDR
        );
    }

    #[test]
    fn test_import_path_declares_no_vpc_resources() {
        // staging imports a pre-existing vpc.
        let stack = build(Stage::Staging);
        assert!(stack.resource("Vpc").is_none());
        assert!(stack.resources_of_type("AWS::EC2::Subnet").is_empty());
        // Identifiers are still published for cross-stack lookup.
        assert!(stack.outputs().iter().any(|o| o.name == "VpcId"));
        assert!(stack
            .outputs()
            .iter()
            .any(|o| o.name == "PublicSubnetRouteTableId0"));
    }

    #[test]
    fn test_subnet_group_spans_public_subnets() {
        let stack = build(Stage::Staging);
        let group = stack.resource("CacheSubnetGroup").unwrap();
        assert_eq!(
            group.properties()["CacheSubnetGroupName"],
            "staging-decidim-SubnetGroup"
        );
    }

    #[test]
    fn test_every_declared_handle_is_exported() {
        let stack = build(Stage::Dev);
        for handle in NetworkBuilder.provides() {
            assert!(
                stack.exports().iter().any(|(key, _)| key == handle),
                "missing {handle}"
            );
        }
    }
}
