//! End-to-end synthesis tests across every stage.

#[cfg(test)]
mod tests {
    use crate::config::Stage;
    use crate::stacks::SynthContext;
    use crate::synth::{assemble, write_assembly};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::fs;

    fn templates(stage: Stage) -> Vec<(String, serde_json::Value)> {
        let ctx = SynthContext::new(stage, "v9.9.9").unwrap();
        let assembly = assemble(&ctx).unwrap();
        let tags = ctx.tags();
        assembly
            .stacks
            .iter()
            .map(|stack| (stack.name().to_string(), stack.to_template(&tags).unwrap()))
            .collect()
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        for stage in Stage::ALL {
            let first = serde_json::to_string(&templates(stage)).unwrap();
            let second = serde_json::to_string(&templates(stage)).unwrap();
            assert_eq!(first, second, "{stage}");
        }
    }

    #[test]
    fn test_every_import_has_a_matching_export() {
        for stage in Stage::ALL {
            let rendered = templates(stage);

            let mut exports = HashSet::new();
            for (_, template) in &rendered {
                if let Some(outputs) = template["Outputs"].as_object() {
                    for output in outputs.values() {
                        if let Some(name) = output["Export"]["Name"].as_str() {
                            exports.insert(name.to_string());
                        }
                    }
                }
            }

            let walk = |value: &serde_json::Value| {
                let mut stack = vec![value.clone()];
                while let Some(node) = stack.pop() {
                    match node {
                        serde_json::Value::Object(map) => {
                            if let Some(name) = map.get("Fn::ImportValue").and_then(|v| v.as_str())
                            {
                                assert!(
                                    exports.contains(name),
                                    "{stage}: import of unexported {name}"
                                );
                            }
                            stack.extend(map.values().cloned());
                        }
                        serde_json::Value::Array(items) => stack.extend(items),
                        _ => {}
                    }
                }
            };
            for (_, template) in &rendered {
                walk(template);
            }
        }
    }

    #[test]
    fn test_templates_carry_the_fixed_tag_set() {
        for (name, template) in templates(Stage::Staging) {
            let resources = template["Resources"].as_object().unwrap();
            let tagged = resources.values().filter_map(|r| r["Properties"]["Tags"].as_array());
            for tags in tagged {
                let keys: Vec<&str> =
                    tags.iter().filter_map(|t| t["Key"].as_str()).collect();
                assert!(keys.contains(&"Project"), "{name}: missing Project tag");
                assert!(keys.contains(&"Stage"), "{name}: missing Stage tag");
                assert!(keys.contains(&"ManagedBy"), "{name}: missing ManagedBy tag");
            }
        }
    }

    #[test]
    fn test_write_assembly_emits_templates_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SynthContext::new(Stage::Dev, "latest").unwrap();
        let assembly = assemble(&ctx).unwrap();
        write_assembly(&assembly, &ctx, dir.path()).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["stage"], "dev");
        assert_eq!(manifest["order"].as_array().unwrap().len(), 6);

        for entry in manifest["stacks"].as_array().unwrap() {
            let file = entry["template"].as_str().unwrap();
            let template: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(dir.path().join(file)).unwrap()).unwrap();
            assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
            assert!(!template["Resources"].as_object().unwrap().is_empty());
        }
    }

    #[test]
    fn test_edge_manifest_lists_published_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SynthContext::new(Stage::Staging, "latest").unwrap();
        let assembly = assemble(&ctx).unwrap();
        write_assembly(&assembly, &ctx, dir.path()).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap())
                .unwrap();
        let edge = manifest["stacks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|entry| entry["builder"] == "edge")
            .unwrap();
        let published: Vec<&str> = edge["published_parameters"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p.as_str())
            .collect();
        assert!(published.contains(&"/decidim-cfj/staging/AWS_CLOUD_FRONT_END_POINT"));
        assert!(published.contains(&"/decidim-cfj/staging/CLOUDFRONT_DISTRIBUTION_ID"));
        assert!(published.contains(&"/decidim-cfj/staging/CLOUDFRONT_DISTRIBUTION_ARN"));
    }

    #[test]
    fn test_image_tag_threads_into_task_definition() {
        let ctx = SynthContext::new(Stage::Staging, "sha-abc123").unwrap();
        let assembly = assemble(&ctx).unwrap();
        let service = assembly.stack("service").unwrap();
        let task = service.resource("TaskDefinition").unwrap();
        let rendered = serde_json::to_string(&task.properties()["ContainerDefinitions"]).unwrap();
        assert!(rendered.contains(":sha-abc123"));
    }
}
