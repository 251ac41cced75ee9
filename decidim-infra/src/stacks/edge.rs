//! Edge builder: web ACL, CDN distribution, and parameter publication.
//!
//! Fronts the ALB origin with a CloudFront distribution, attaches the WAF
//! rule ladder, routes `/s3/*` to the upload bucket through an origin access
//! control, and publishes the distribution coordinates to the parameter
//! store for the application and the bucket policy to read back.

use super::{StackBuilder, SynthContext};
use crate::errors::SynthError;
use crate::graph::{DeletionPolicy, OutputRegistry, Resource, Stack, Value};
use crate::params::names;
use crate::waf::{self, DISABLE_ACTION_BODY, DISABLE_ACTION_BODY_KEY};
use serde_json::json;

// AWS-managed cache and origin-request policy ids.
const CACHING_DISABLED: &str = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad";
const CACHING_OPTIMIZED: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";
const ALL_VIEWER: &str = "216adef6-5c7f-47e4-b989-5492eafa07d3";
const CORS_S3_ORIGIN: &str = "88a5eaf4-2fd4-4709-b370-b4c650ea3fcf";

const ALB_ORIGIN_ID: &str = "defaultEndPoint";
const S3_ORIGIN_ID: &str = "s3Origin";

/// Viewer-request function that rewrites `/s3/<key>` to `/<key>` before the
/// request reaches the bucket origin.
const STRIP_S3_PREFIX_FN: &str = r"function handler(event) {
  var req = event.request;
  req.headers['x-cf-uri-rewrite'] = { value: 'strip-s3-prefix' };
  req.headers['x-cf-func'] = { value: 'strip-s3-prefix' };
  if (!req || !req.uri) return req;
  if (req.uri.startsWith('/s3/')) {
    var rest = req.uri.substring(4);
    req.uri = ('/' + rest).replace(/\/+/g, '/');
  }
  return req;
}
";

/// Builds the edge stack.
#[derive(Debug, Default)]
pub struct EdgeBuilder;

impl EdgeBuilder {
    fn web_acl(ctx: &SynthContext, stack: &mut Stack) -> Result<(), SynthError> {
        let rules = waf::rule_ladder(&ctx.prefix(), &ctx.policy);
        waf::validate_priorities(&rules)?;
        let rules: Vec<serde_json::Value> = rules.iter().map(waf::WafRule::to_json).collect();

        stack.add(
            Resource::new("WebAcl", "AWS::WAFv2::WebACL")
                .prop("Name", format!("{}-webAcl", ctx.prefix()))
                .prop("Scope", "CLOUDFRONT")
                .prop("DefaultAction", json!({"Allow": {}}))
                .prop(
                    "Description",
                    format!("Web ACL for {}-cloudfront", ctx.prefix()),
                )
                .prop(
                    "VisibilityConfig",
                    json!({
                        "CloudWatchMetricsEnabled": true,
                        "SampledRequestsEnabled": true,
                        "MetricName": format!("{}-webAcl-metrics", ctx.prefix()),
                    }),
                )
                .prop("Rules", rules)
                .prop(
                    "CustomResponseBodies",
                    json!({
                        DISABLE_ACTION_BODY_KEY: {
                            "Content": DISABLE_ACTION_BODY,
                            "ContentType": "TEXT_HTML",
                        }
                    }),
                ),
        )
    }

    fn behavior(
        path_pattern: &str,
        origin_id: &str,
        cache_policy: &str,
        extra: serde_json::Value,
    ) -> serde_json::Value {
        let mut behavior = json!({
            "PathPattern": path_pattern,
            "TargetOriginId": origin_id,
            "AllowedMethods": ["GET", "HEAD", "OPTIONS"],
            "ViewerProtocolPolicy": "redirect-to-https",
            "CachePolicyId": cache_policy,
        });
        if let (Some(map), Some(extra)) = (behavior.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                map.insert(key.clone(), value.clone());
            }
        }
        behavior
    }
}

impl StackBuilder for EdgeBuilder {
    fn name(&self) -> &'static str {
        "edge"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["distribution_domain"]
    }

    fn consumes(&self) -> &'static [&'static str] {
        &["service/origin_hostname", "storage/bucket_name"]
    }

    #[allow(clippy::too_many_lines)]
    fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("CloudFront"));
        let service_cfg = &ctx.config.service;

        let origin_hostname = outputs.get(self.name(), "service/origin_hostname")?;
        let bucket_name = outputs.get(self.name(), "storage/bucket_name")?;

        Self::web_acl(ctx, &mut stack)?;

        stack.add(
            Resource::new("OriginAccessControl", "AWS::CloudFront::OriginAccessControl")
                .prop(
                    "OriginAccessControlConfig",
                    json!({
                        "Name": format!("{}-OriginAccessControl", ctx.prefix()),
                        "Description": format!("{}-OriginAccessControl", ctx.prefix()),
                        "OriginAccessControlOriginType": "s3",
                        "SigningBehavior": "always",
                        "SigningProtocol": "sigv4",
                    }),
                )
                .not_taggable(),
        )?;

        stack.add(
            Resource::new("StripS3PrefixFn", "AWS::CloudFront::Function")
                .prop("Name", format!("{}-strip-s3-prefix", ctx.prefix()))
                .prop("AutoPublish", true)
                .prop("FunctionCode", STRIP_S3_PREFIX_FN)
                .prop(
                    "FunctionConfig",
                    json!({"Comment": "strip /s3/ prefix", "Runtime": "cloudfront-js-1.0"}),
                )
                .not_taggable(),
        )?;

        stack.add(
            Resource::new("LogBucket", "AWS::S3::Bucket")
                .prop(
                    "BucketName",
                    Value::concat([bucket_name.clone(), Value::str("-cloudfront-logs")]),
                )
                .prop(
                    "OwnershipControls",
                    json!({"Rules": [{"ObjectOwnership": "ObjectWriter"}]}),
                )
                .prop(
                    "PublicAccessBlockConfiguration",
                    json!({
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true,
                    }),
                )
                .deletion_policy(DeletionPolicy::Delete),
        )?;

        let mut aliases = vec![origin_hostname.clone()];
        if ctx.policy.wildcard_domain {
            aliases.push(Value::str(format!("*.{}", service_cfg.domain)));
        }

        let s3_origin_domain = Value::concat([
            bucket_name.clone(),
            Value::str(format!(".s3.{}.amazonaws.com", ctx.config.aws.region)),
        ]);

        stack.add(
            Resource::new("Distribution", "AWS::CloudFront::Distribution")
                .prop(
                    "DistributionConfig",
                    json!({
                        "Enabled": true,
                        "Comment": format!("{}-cloudfront", ctx.prefix()),
                        "PriceClass": "PriceClass_All",
                        "Aliases": Value::List(aliases),
                        "WebACLId": Value::attr("WebAcl", "Arn"),
                        "ViewerCertificate": {
                            "AcmCertificateArn": &service_cfg.cloudfront_certificate,
                            "SslSupportMethod": "sni-only",
                            "MinimumProtocolVersion": "TLSv1.2_2021",
                        },
                        "Logging": {
                            "Bucket": Value::attr("LogBucket", "RegionalDomainName"),
                            "Prefix": "cloudfront-logs/",
                        },
                        "Origins": [
                            {
                                "Id": ALB_ORIGIN_ID,
                                "DomainName": origin_hostname,
                                "CustomOriginConfig": {
                                    "OriginProtocolPolicy": "https-only",
                                    "OriginSSLProtocols": ["TLSv1.2"],
                                },
                            },
                            {
                                "Id": S3_ORIGIN_ID,
                                "DomainName": s3_origin_domain,
                                "OriginAccessControlId": Value::reference("OriginAccessControl"),
                                "S3OriginConfig": {"OriginAccessIdentity": ""},
                            },
                        ],
                        "DefaultCacheBehavior": {
                            "TargetOriginId": ALB_ORIGIN_ID,
                            "AllowedMethods": [
                                "GET", "HEAD", "OPTIONS", "PUT", "PATCH", "POST", "DELETE"
                            ],
                            "ViewerProtocolPolicy": "redirect-to-https",
                            "CachePolicyId": CACHING_DISABLED,
                            "OriginRequestPolicyId": ALL_VIEWER,
                        },
                        "CacheBehaviors": [
                            Self::behavior(
                                "decidim-packs/*",
                                ALB_ORIGIN_ID,
                                CACHING_OPTIMIZED,
                                json!({}),
                            ),
                            Self::behavior(
                                "/s3/*",
                                S3_ORIGIN_ID,
                                CACHING_OPTIMIZED,
                                json!({
                                    "ViewerProtocolPolicy": "https-only",
                                    "OriginRequestPolicyId": CORS_S3_ORIGIN,
                                    "FunctionAssociations": [{
                                        "EventType": "viewer-request",
                                        "FunctionARN":
                                            Value::attr("StripS3PrefixFn", "FunctionARN"),
                                    }],
                                }),
                            ),
                        ],
                    }),
                ),
        )?;

        let params = ctx.params();
        stack.publish(
            &params.path(names::AWS_CLOUD_FRONT_END_POINT),
            Value::concat([Value::attr("Distribution", "DomainName"), Value::str("/s3")]),
        )?;
        stack.publish(
            &params.path(names::CLOUDFRONT_DISTRIBUTION_ID),
            Value::reference("Distribution"),
        )?;
        stack.publish(
            &params.path(names::CLOUDFRONT_DISTRIBUTION_ARN),
            Value::concat([
                Value::str(format!(
                    "arn:aws:cloudfront::{}:distribution/",
                    ctx.config.aws.account_id
                )),
                Value::reference("Distribution"),
            ]),
        )?;

        stack.output(
            "CloudFrontDomainName",
            Value::attr("Distribution", "DomainName"),
            Some(format!("{}-CloudFrontDomainName", ctx.prefix())),
        );
        stack.output(
            "OriginAccessControlId",
            Value::reference("OriginAccessControl"),
            Some(format!("{}-OAC-ID", ctx.prefix())),
        );

        stack.export(
            "distribution_domain",
            Value::attr("Distribution", "DomainName"),
        );
        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;

    fn build(stage: Stage) -> Stack {
        let ctx = SynthContext::new(stage, "latest").unwrap();
        let mut registry = OutputRegistry::new();
        registry.insert(
            "service",
            "origin_hostname",
            Value::str(ctx.origin_hostname()),
        );
        registry.insert("storage", "bucket_name", Value::str(ctx.bucket_name()));
        EdgeBuilder.build(&ctx, &registry).unwrap()
    }

    fn distribution_config(stack: &Stack) -> serde_json::Value {
        stack.resource("Distribution").unwrap().properties()["DistributionConfig"].clone()
    }

    #[test]
    fn test_web_acl_carries_custom_response_body() {
        let stack = build(Stage::Staging);
        let acl = stack.resource("WebAcl").unwrap();
        assert_eq!(acl.properties()["Scope"], "CLOUDFRONT");
        assert_eq!(
            acl.properties()["CustomResponseBodies"][DISABLE_ACTION_BODY_KEY]["Content"],
            DISABLE_ACTION_BODY
        );
        assert_eq!(acl.properties()["Rules"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_wildcard_alias_only_where_policy_grants_it() {
        let config = distribution_config(&build(Stage::PrdV0292));
        let rendered = serde_json::to_string(&config["Aliases"]).unwrap();
        assert!(rendered.contains("*.diycities.jp"));

        let config = distribution_config(&build(Stage::Staging));
        let rendered = serde_json::to_string(&config["Aliases"]).unwrap();
        assert!(!rendered.contains("*."));
    }

    #[test]
    fn test_s3_behavior_strips_prefix_through_function() {
        let stack = build(Stage::Dev);
        let config = distribution_config(&stack);
        let behaviors = config["CacheBehaviors"].as_array().unwrap();
        let s3 = behaviors
            .iter()
            .find(|b| b["PathPattern"] == "/s3/*")
            .unwrap();
        assert_eq!(s3["TargetOriginId"], S3_ORIGIN_ID);
        assert_eq!(s3["OriginRequestPolicyId"], CORS_S3_ORIGIN);
        assert_eq!(
            s3["FunctionAssociations"][0]["EventType"],
            "viewer-request"
        );
        let function = stack.resource("StripS3PrefixFn").unwrap();
        assert!(function.properties()["FunctionCode"]
            .as_str()
            .unwrap()
            .contains("startsWith('/s3/')"));
    }

    #[test]
    fn test_default_behavior_disables_caching() {
        let config = distribution_config(&build(Stage::Staging));
        let default = &config["DefaultCacheBehavior"];
        assert_eq!(default["CachePolicyId"], CACHING_DISABLED);
        assert_eq!(default["OriginRequestPolicyId"], ALL_VIEWER);
        assert_eq!(default["TargetOriginId"], ALB_ORIGIN_ID);
    }

    #[test]
    fn test_distribution_coordinates_are_published() {
        let stack = build(Stage::Staging);
        let paths: Vec<&str> = stack
            .published()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/decidim-cfj/staging/AWS_CLOUD_FRONT_END_POINT",
                "/decidim-cfj/staging/CLOUDFRONT_DISTRIBUTION_ID",
                "/decidim-cfj/staging/CLOUDFRONT_DISTRIBUTION_ARN",
            ]
        );
        // The readback parameters exist as first-class resources.
        assert!(stack
            .resource("ParamCloudfrontDistributionArn")
            .is_some());
    }

    #[test]
    fn test_outputs_expose_domain_and_oac() {
        let stack = build(Stage::Dev);
        let names: Vec<&str> = stack.outputs().iter().map(|o| o.name.as_str()).collect();
        assert!(names.contains(&"CloudFrontDomainName"));
        assert!(names.contains(&"OriginAccessControlId"));
    }
}
