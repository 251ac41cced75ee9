//! Command-line entry point: synthesize one stage's templates.

use anyhow::Context;
use clap::Parser;
use decidim_infra::config::Stage;
use decidim_infra::stacks::SynthContext;
use decidim_infra::synth;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "decidim-infra", version, about = "Synthesize Decidim stack templates")]
struct Args {
    /// Deployment stage to synthesize.
    #[arg(long)]
    stage: Stage,

    /// Container image tag to deploy.
    #[arg(long, default_value = "latest")]
    tag: String,

    /// Directory the templates and manifest are written to.
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let ctx = SynthContext::new(args.stage, args.tag)?;
    let assembly = synth::assemble(&ctx)
        .with_context(|| format!("synthesizing stage {}", args.stage))?;
    synth::write_assembly(&assembly, &ctx, &args.out)
        .with_context(|| format!("writing assembly to {}", args.out.display()))?;
    Ok(())
}
