//! Storage builder: the upload bucket and its reader grant.
//!
//! One bucket per stage, named deterministically, fully closed to public
//! access. Exactly one principal gets read access: the legacy origin
//! access identity on the stage that still uses it, otherwise the CDN
//! service principal scoped to the distribution ARN published by the edge
//! stack (read back by name from the parameter store, not a graph edge,
//! so stack ordering stays acyclic).

use super::{StackBuilder, SynthContext};
use crate::errors::SynthError;
use crate::graph::{DeletionPolicy, OutputRegistry, Resource, Stack, Value};
use crate::params::names;
use serde_json::json;

/// Builds the storage stack.
#[derive(Debug, Default)]
pub struct StorageBuilder;

impl StorageBuilder {
    fn bucket_arn(bucket_name: &str) -> String {
        format!("arn:aws:s3:::{bucket_name}")
    }

    /// The read-only grant statement for the stage's designated principal.
    fn reader_statement(ctx: &SynthContext, bucket_name: &str) -> serde_json::Value {
        let objects = format!("{}/*", Self::bucket_arn(bucket_name));
        if ctx.policy.legacy_origin_identity {
            json!({
                "Effect": "Allow",
                "Principal": {
                    "CanonicalUser": Value::attr("OriginAccessIdentity", "S3CanonicalUserId")
                },
                "Action": "s3:GetObject",
                "Resource": objects,
            })
        } else {
            json!({
                "Sid": "AllowCloudFrontOACRead",
                "Effect": "Allow",
                "Principal": { "Service": "cloudfront.amazonaws.com" },
                "Action": "s3:GetObject",
                "Resource": objects,
                "Condition": {
                    "StringEquals": {
                        "AWS:SourceArn": ctx.params().read(names::CLOUDFRONT_DISTRIBUTION_ARN)
                    }
                },
            })
        }
    }
}

impl StackBuilder for StorageBuilder {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn provides(&self) -> &'static [&'static str] {
        &["bucket_name", "bucket_arn"]
    }

    fn build(&self, ctx: &SynthContext, _outputs: &OutputRegistry) -> Result<Stack, SynthError> {
        let mut stack = Stack::new(ctx.stack_name("S3"));
        let bucket_name = ctx.bucket_name();

        let mut bucket = Resource::new("Bucket", "AWS::S3::Bucket")
            .prop("BucketName", bucket_name.clone())
            .prop(
                "PublicAccessBlockConfiguration",
                json!({
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                }),
            )
            .deletion_policy(DeletionPolicy::Delete);
        if ctx.policy.versioned_bucket {
            bucket = bucket.prop("VersioningConfiguration", json!({"Status": "Enabled"}));
        }
        if !ctx.config.upload_cors_origins.is_empty() {
            bucket = bucket.prop(
                "CorsConfiguration",
                json!({
                    "CorsRules": [{
                        "AllowedOrigins": &ctx.config.upload_cors_origins,
                        "AllowedMethods": ["GET", "PUT", "POST"],
                        "AllowedHeaders": ["*"],
                        "MaxAge": 3000,
                    }]
                }),
            );
        }
        stack.add(bucket)?;

        if ctx.policy.legacy_origin_identity {
            stack.add(
                Resource::new(
                    "OriginAccessIdentity",
                    "AWS::CloudFront::CloudFrontOriginAccessIdentity",
                )
                .prop(
                    "CloudFrontOriginAccessIdentityConfig",
                    json!({"Comment": format!("{}-OriginAccessIdentity", ctx.prefix())}),
                )
                .not_taggable(),
            )?;
        }

        stack.add(
            Resource::new("BucketPolicy", "AWS::S3::BucketPolicy")
                .prop("Bucket", Value::reference("Bucket"))
                .prop(
                    "PolicyDocument",
                    json!({
                        "Version": "2012-10-17",
                        "Statement": [Self::reader_statement(ctx, &bucket_name)],
                    }),
                )
                .not_taggable(),
        )?;

        stack.export("bucket_name", Value::str(&bucket_name));
        stack.export("bucket_arn", Value::str(Self::bucket_arn(&bucket_name)));
        Ok(stack)
    }
}
