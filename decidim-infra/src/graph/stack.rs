//! A stack: one cohesive group of resource declarations.

use super::resource::Resource;
use super::value::Value;
use crate::errors::SynthError;
use serde_json::Map;
use std::collections::HashSet;

/// A template output, optionally exported for cross-stack lookup.
#[derive(Debug, Clone)]
pub struct Output {
    /// Output name within the template.
    pub name: String,
    /// The output value.
    pub value: Value,
    /// Export name for cross-stack imports.
    pub export_name: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
}

/// A key/value pair written to the external parameter store.
#[derive(Debug, Clone)]
pub struct PublishedParameter {
    /// Full parameter path.
    pub name: String,
    /// The published value.
    pub value: Value,
}

/// Converts a snake_case handle key to the PascalCase spelling used in
/// output and export names.
#[must_use]
pub fn pascal_case(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c == '/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect()
}

/// A named, ordered collection of resource declarations plus the
/// identifiers it hands to downstream stacks.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    resources: Vec<Resource>,
    ids: HashSet<String>,
    outputs: Vec<Output>,
    exports: Vec<(String, Value)>,
    published: Vec<PublishedParameter>,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            ids: HashSet::new(),
            outputs: Vec::new(),
            exports: Vec::new(),
            published: Vec::new(),
        }
    }

    /// The stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a resource declaration.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::DuplicateLogicalId`] if the logical id is
    /// already taken in this stack.
    pub fn add(&mut self, resource: Resource) -> Result<(), SynthError> {
        if !self.ids.insert(resource.logical_id().to_string()) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                id: resource.logical_id().to_string(),
            });
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Adds a template output.
    pub fn output(&mut self, name: impl Into<String>, value: Value, export_name: Option<String>) {
        self.outputs.push(Output {
            name: name.into(),
            value,
            export_name,
            description: None,
        });
    }

    /// Hands an identifier to downstream stacks under a handle key.
    ///
    /// Literal values pass through as-is. Deferred values become an
    /// exported template output, and consumers receive an import of that
    /// export, so the cross-stack edge is explicit in the emitted artifact.
    pub fn export(&mut self, key: &str, value: Value) {
        if value.is_literal() {
            self.exports.push((key.to_string(), value));
        } else {
            let output_name = pascal_case(key);
            let export_name = format!("{}:{output_name}", self.name);
            self.output(output_name, value, Some(export_name.clone()));
            self.exports.push((key.to_string(), Value::Import(export_name)));
        }
    }

    /// Publishes a named value to the external parameter store, declaring
    /// the write as a parameter resource in this stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the derived logical id collides.
    pub fn publish(&mut self, path: &str, value: Value) -> Result<(), SynthError> {
        let suffix = path.rsplit('/').next().unwrap_or(path);
        let logical_id = format!("Param{}", pascal_case(suffix));
        self.add(
            Resource::new(logical_id, "AWS::SSM::Parameter")
                .prop("Name", path)
                .prop("Type", "String")
                .prop("Value", value.clone())
                .not_taggable(),
        )?;
        self.published.push(PublishedParameter {
            name: path.to_string(),
            value,
        });
        Ok(())
    }

    /// The declared resources, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Looks up a resource by logical id.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.logical_id() == logical_id)
    }

    /// All resources of a given type.
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type() == resource_type)
            .collect()
    }

    /// The template outputs.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// The handles exported for downstream stacks.
    #[must_use]
    pub fn exports(&self) -> &[(String, Value)] {
        &self.exports
    }

    /// Parameters published to the external store.
    #[must_use]
    pub fn published(&self) -> &[PublishedParameter] {
        &self.published
    }

    /// Renders the stack into the provisioning engine's template format.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::DanglingReference`] if any `Ref`/`Fn::GetAtt`
    /// in the rendered body targets a logical id this stack never declared.
    pub fn to_template(&self, tags: &[(String, String)]) -> Result<serde_json::Value, SynthError> {
        let mut resources = Map::new();
        for resource in &self.resources {
            for dep in resource.depends() {
                if !self.ids.contains(dep) {
                    return Err(SynthError::DanglingReference {
                        stack: self.name.clone(),
                        id: dep.clone(),
                    });
                }
            }
            resources.insert(resource.logical_id().to_string(), resource.render(tags));
        }

        let mut outputs = Map::new();
        for output in &self.outputs {
            let mut body = Map::new();
            body.insert("Value".to_string(), serde_json::to_value(&output.value)?);
            if let Some(description) = &output.description {
                body.insert(
                    "Description".to_string(),
                    serde_json::Value::String(description.clone()),
                );
            }
            if let Some(export) = &output.export_name {
                body.insert(
                    "Export".to_string(),
                    serde_json::json!({ "Name": export }),
                );
            }
            outputs.insert(output.name.clone(), serde_json::Value::Object(body));
        }

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            serde_json::Value::String("2010-09-09".to_string()),
        );
        template.insert(
            "Description".to_string(),
            serde_json::Value::String(format!("decidim-infra stack {}", self.name)),
        );
        template.insert("Resources".to_string(), serde_json::Value::Object(resources));
        if !outputs.is_empty() {
            template.insert("Outputs".to_string(), serde_json::Value::Object(outputs));
        }
        let template = serde_json::Value::Object(template);

        self.check_references(&template)?;
        Ok(template)
    }

    /// Walks the rendered template for `Ref`/`Fn::GetAtt` targets outside
    /// this stack's logical id set.
    fn check_references(&self, node: &serde_json::Value) -> Result<(), SynthError> {
        match node {
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(id)) = map.get("Ref") {
                        if !self.ids.contains(id) {
                            return Err(SynthError::DanglingReference {
                                stack: self.name.clone(),
                                id: id.clone(),
                            });
                        }
                        return Ok(());
                    }
                    if let Some(serde_json::Value::Array(parts)) = map.get("Fn::GetAtt") {
                        if let Some(serde_json::Value::String(id)) = parts.first() {
                            if !self.ids.contains(id) {
                                return Err(SynthError::DanglingReference {
                                    stack: self.name.clone(),
                                    id: id.clone(),
                                });
                            }
                        }
                        return Ok(());
                    }
                }
                for value in map.values() {
                    self.check_references(value)?;
                }
                Ok(())
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    self.check_references(item)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
