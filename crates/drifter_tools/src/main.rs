//! Drifter asset tool
//!
//! Run with: cargo run -p drifter_tools -- validate --input assets

use clap::{Parser, Subcommand};
use drifter_reflect::ReflectionSystem;
use drifter_tools::{demo_registry, ToolConfig, ToolError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "drifter-assets")]
#[command(about = "Chronicles of a Drifter asset processing tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Input directory
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Manifest file
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Config file (defaults to ./drifter.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Write the type index and copy assets to the output directory
    Process,
    /// Check JSON assets against the registered types
    Validate,
    /// Write an inventory of the input directory
    Manifest,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> drifter_tools::Result<()> {
    let mut config = ToolConfig::load(cli.config.as_deref())?;
    config.apply_flags(cli.input, cli.output, cli.manifest);

    let system = ReflectionSystem::load(|| demo_registry().map(Arc::new));
    let Some(registry) = system.registry() else {
        return Err(ToolError::not_found("type catalogue"));
    };

    println!("Available types for asset metadata: {}", system.get_all_types().len());
    for name in system.get_all_types() {
        if let Some(info) = system.get_type_info(&name) {
            println!("  - {}: {} fields", name, info.fields.len());
        }
    }
    println!();

    match cli.command {
        Command::Process => {
            let report = drifter_tools::process(registry, &config)?;
            println!("Type index: {}", report.type_index.display());
            println!(
                "Copied {} files ({} bytes) to {}",
                report.copied.len(),
                report.bytes_copied,
                config.output.display()
            );
        }
        Command::Validate => {
            let report = drifter_tools::validate(registry, &config.input)?;
            println!(
                "Checked {} JSON files ({} typed records)",
                report.checked, report.records
            );
            for problem in &report.problems {
                println!("  {}: {}", problem.path.display(), problem.message);
            }
            if !report.is_ok() {
                return Err(ToolError::ValidationFailed(report.problems.len()));
            }
        }
        Command::Manifest => {
            let manifest = drifter_tools::manifest(&config)?;
            println!(
                "{} assets, {} bytes -> {}",
                manifest.asset_count,
                manifest.total_bytes,
                config.manifest.display()
            );
            for (extension, count) in &manifest.by_extension {
                let label = if extension.is_empty() { "(none)" } else { extension.as_str() };
                println!("  {:>8}: {}", label, count);
            }
        }
    }
    Ok(())
}
