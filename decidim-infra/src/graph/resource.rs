//! A single resource declaration.

use serde_json::Map;

/// Teardown behavior attached to a resource declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the resource with the stack.
    Delete,
    /// Keep the resource when the stack is torn down.
    Retain,
    /// Take a final snapshot, then delete.
    Snapshot,
}

impl DeletionPolicy {
    /// The template spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// A declared-but-not-yet-materialized cloud resource.
///
/// Properties are collected in declaration order and rendered verbatim;
/// deferred [`Value`](super::Value)s serialize to intrinsic forms.
#[derive(Debug, Clone)]
pub struct Resource {
    logical_id: String,
    resource_type: String,
    properties: Map<String, serde_json::Value>,
    depends_on: Vec<String>,
    deletion_policy: Option<DeletionPolicy>,
    taggable: bool,
}

impl Resource {
    /// Creates a resource declaration.
    #[must_use]
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
            deletion_policy: None,
            taggable: true,
        }
    }

    /// Sets a property. Later writes to the same key win.
    #[must_use]
    pub fn prop(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Adds an explicit ordering edge to another resource in the stack.
    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Sets the teardown behavior.
    #[must_use]
    pub const fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Marks the resource type as not accepting the standard tag list.
    #[must_use]
    pub const fn not_taggable(mut self) -> Self {
        self.taggable = false;
        self
    }

    /// The resource's logical id.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The resource type string.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The property map.
    #[must_use]
    pub const fn properties(&self) -> &Map<String, serde_json::Value> {
        &self.properties
    }

    /// Explicit ordering edges.
    #[must_use]
    pub fn depends(&self) -> &[String] {
        &self.depends_on
    }

    /// Whether the fixed tag set applies to this resource.
    #[must_use]
    pub const fn is_taggable(&self) -> bool {
        self.taggable
    }

    /// Renders the resource body (everything under its logical id).
    #[must_use]
    pub fn render(&self, tags: &[(String, String)]) -> serde_json::Value {
        let mut properties = self.properties.clone();
        if self.taggable && !tags.is_empty() {
            let mut list = match properties.remove("Tags") {
                Some(serde_json::Value::Array(existing)) => existing,
                _ => Vec::new(),
            };
            for (key, value) in tags {
                list.push(serde_json::json!({"Key": key, "Value": value}));
            }
            properties.insert("Tags".to_string(), serde_json::Value::Array(list));
        }

        let mut body = Map::new();
        body.insert(
            "Type".to_string(),
            serde_json::Value::String(self.resource_type.clone()),
        );
        body.insert(
            "Properties".to_string(),
            serde_json::Value::Object(properties),
        );
        if !self.depends_on.is_empty() {
            body.insert(
                "DependsOn".to_string(),
                serde_json::Value::Array(
                    self.depends_on
                        .iter()
                        .map(|id| serde_json::Value::String(id.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(policy) = self.deletion_policy {
            body.insert(
                "DeletionPolicy".to_string(),
                serde_json::Value::String(policy.as_str().to_string()),
            );
        }
        serde_json::Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Value;
    use serde_json::json;

    #[test]
    fn test_render_includes_type_and_properties() {
        let resource = Resource::new("Bucket", "AWS::S3::Bucket")
            .prop("BucketName", "dev-decidim-bucket")
            .deletion_policy(DeletionPolicy::Delete);
        let body = resource.render(&[]);
        assert_eq!(body["Type"], json!("AWS::S3::Bucket"));
        assert_eq!(body["Properties"]["BucketName"], json!("dev-decidim-bucket"));
        assert_eq!(body["DeletionPolicy"], json!("Delete"));
    }

    #[test]
    fn test_tags_appended_to_taggable_resources() {
        let resource = Resource::new("Vpc", "AWS::EC2::VPC");
        let body = resource.render(&[("Stage".to_string(), "dev".to_string())]);
        assert_eq!(
            body["Properties"]["Tags"],
            json!([{"Key": "Stage", "Value": "dev"}])
        );
    }

    #[test]
    fn test_tags_skipped_when_not_taggable() {
        let resource = Resource::new("Route", "AWS::EC2::Route").not_taggable();
        let body = resource.render(&[("Stage".to_string(), "dev".to_string())]);
        assert!(body["Properties"].get("Tags").is_none());
    }

    #[test]
    fn test_deferred_property_values_render_as_intrinsics() {
        let resource =
            Resource::new("Record", "AWS::Route53::RecordSet").prop("Target", Value::attr("Alb", "DNSName"));
        let body = resource.render(&[]);
        assert_eq!(
            body["Properties"]["Target"],
            json!({"Fn::GetAtt": ["Alb", "DNSName"]})
        );
    }
}
