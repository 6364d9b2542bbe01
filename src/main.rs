use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kira_dvh::cli::{Cli, Commands, RunArgs, ValidateArgs};
use kira_dvh::ctx::Ctx;
use kira_dvh::dvh::HistogramOptions;
use kira_dvh::io;
use kira_dvh::pipeline::Pipeline;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Validate(args) => validate(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    if args.bins == 0 {
        bail!("--bins must be positive");
    }
    let queries = args.queries()?;
    let options = HistogramOptions {
        bins: args.bins,
        anchor: args.anchor.into(),
        threshold: args.threshold.into(),
    };
    let mut ctx = Ctx::new(
        args.plan,
        args.out,
        options,
        args.delimiter.into(),
        env!("CARGO_PKG_VERSION"),
    );
    ctx.queries = queries;
    ctx.write_curves = args.curves;
    ctx.write_json = args.json;

    Pipeline::full().run(&mut ctx)?;
    print_summary(&ctx)
}

fn validate(args: ValidateArgs) -> Result<()> {
    let mut ctx = Ctx::new(
        args.plan,
        PathBuf::from("."),
        HistogramOptions::default(),
        Default::default(),
        env!("CARGO_PKG_VERSION"),
    );
    Pipeline::validate().run(&mut ctx)?;

    let dose = ctx.dose()?;
    println!("kira-dvh validate ok");
    println!("dose: {} ({} voxels)", dose.id, dose.geometry.voxel_count());
    println!("transforms: {}", ctx.transforms.len());
    println!("structures resolved: {}", ctx.resolved_structures);
    for failure in &ctx.failures {
        println!("- {} ({}): {}", failure.structure, failure.error.kind(), failure.error);
    }
    print_warnings(&ctx);
    if !ctx.failures.is_empty() {
        bail!("{} structure(s) failed to resolve", ctx.failures.len());
    }
    Ok(())
}

fn print_summary(ctx: &Ctx) -> Result<()> {
    let summary = io::summary::format_summary(ctx)?;
    print!("{}", summary);
    print_warnings(ctx);
    Ok(())
}

fn print_warnings(ctx: &Ctx) {
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
}
