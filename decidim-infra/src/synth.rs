//! Full-application assembly and template emission.

use crate::errors::SynthError;
use crate::graph::{App, Assembly};
use crate::stacks::{
    CacheBuilder, DatabaseBuilder, EdgeBuilder, NetworkBuilder, ServiceBuilder, StorageBuilder,
    SynthContext,
};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

/// Registers the six builders with their ordering edges.
///
/// Handle flow already orders most of the graph; the database and cache
/// edges are declared explicitly as well so the ordering survives even if
/// their consumed handles change.
///
/// # Errors
///
/// Returns an error if registration is inconsistent; with the fixed
/// builder set this does not happen.
pub fn app() -> Result<App, SynthError> {
    let mut app = App::new();
    app.add(Box::new(NetworkBuilder))?;
    app.add(Box::new(StorageBuilder))?;
    app.add(Box::new(CacheBuilder))?;
    app.add(Box::new(DatabaseBuilder))?;
    app.add(Box::new(ServiceBuilder))?;
    app.add(Box::new(EdgeBuilder))?;
    app.add_dependency("cache", "network")?;
    app.add_dependency("database", "network")?;
    Ok(app)
}

/// Synthesizes every stack for the context's stage.
///
/// # Errors
///
/// Returns the first error any builder raises.
pub fn assemble(ctx: &SynthContext) -> Result<Assembly, SynthError> {
    app()?.synth(ctx)
}

/// Writes one template file per stack plus a manifest into `out_dir`.
///
/// # Errors
///
/// Returns an error on template rendering failure or if the output
/// directory is not writable.
pub fn write_assembly(
    assembly: &Assembly,
    ctx: &SynthContext,
    out_dir: &Path,
) -> Result<(), SynthError> {
    fs::create_dir_all(out_dir)?;
    let tags = ctx.tags();

    let mut manifest_stacks = Vec::with_capacity(assembly.stacks.len());
    for (builder, stack) in assembly.order.iter().zip(&assembly.stacks) {
        let file_name = format!("{}.template.json", stack.name());
        let template = stack.to_template(&tags)?;
        fs::write(
            out_dir.join(&file_name),
            serde_json::to_string_pretty(&template)? + "\n",
        )?;
        info!(stack = stack.name(), file = %file_name, "wrote template");

        manifest_stacks.push(json!({
            "builder": builder,
            "stack": stack.name(),
            "template": file_name,
            "published_parameters": stack
                .published()
                .iter()
                .map(|p| p.name.clone())
                .collect::<Vec<_>>(),
        }));
    }

    let manifest = json!({
        "stage": ctx.stage.to_string(),
        "image_tag": &ctx.image_tag,
        "order": &assembly.order,
        "stacks": manifest_stacks,
    });
    fs::write(
        out_dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)? + "\n",
    )?;
    info!(stage = %ctx.stage, stacks = assembly.stacks.len(), "assembly written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;

    #[test]
    fn test_producers_precede_consumers() {
        let order = app().unwrap().synth_order().unwrap();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("network") < position("cache"));
        assert!(position("network") < position("database"));
        assert!(position("cache") < position("service"));
        assert!(position("database") < position("service"));
        assert!(position("storage") < position("service"));
        assert!(position("service") < position("edge"));
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn test_every_stage_assembles() {
        for stage in Stage::ALL {
            let ctx = SynthContext::new(stage, "latest").unwrap();
            let assembly = assemble(&ctx).unwrap();
            assert_eq!(assembly.stacks.len(), 6, "{stage}");
        }
    }
}
