//! Scaffold CLI
//!
//! Command-line interface for the Scaffold layered content compiler.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scaffold::cli::commands::{self, CompileOptions};
use scaffold::cli::{Cli, Commands};
use scaffold::{Conductor, ScaffoldConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Scaffold v{}", env!("CARGO_PKG_VERSION"));

    let config = ScaffoldConfig::load(cli.config.as_deref()).context("loading settings")?;
    let profiles_dir = cli
        .profiles_dir
        .clone()
        .unwrap_or_else(|| config.profiles_dir.clone());
    let conductor = Conductor::new(profiles_dir);

    handle_command(cli.command, &conductor, &config)
}

fn handle_command(cmd: Commands, conductor: &Conductor, config: &ScaffoldConfig) -> Result<()> {
    match cmd {
        Commands::Compile {
            topic,
            audience,
            profile,
            disable,
            require,
            regenerate,
            regenerate_below,
            format,
            json,
        } => {
            let profile = profile.unwrap_or_else(|| config.default_profile.clone());
            let options = CompileOptions {
                disable,
                require,
                regenerate_below: regenerate_below
                    .or(regenerate.then_some(config.regeneration_threshold)),
                format,
                json,
            };
            commands::compile(conductor, &topic, &audience, &profile, &options)
                .context("compile failed")?;
        }
        Commands::Experiment {
            topic,
            audience,
            profile,
            layers,
            repetitions,
            json,
        } => {
            let profile = profile.unwrap_or_else(|| config.default_profile.clone());
            commands::experiment(conductor, &topic, &audience, &profile, layers, repetitions, json)
                .context("experiment failed")?;
        }
        Commands::Profiles => commands::list_profiles(conductor)?,
    }
    Ok(())
}
