//! CLI Module
//!
//! Command-line interface for compiling artifacts and running layer
//! experiments.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::Layer;

/// Scaffold - compile layered explanations and A/B test their layers
#[derive(Parser, Debug)]
#[command(name = "scaffold-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding profile files (overrides the settings file)
    #[arg(long, global = true)]
    pub profiles_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Integration view printed by `compile --format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Chat messages in disclosure order
    Chatbot,
    /// Retrieval chunks with metadata
    Rag,
    /// One flat warehouse row
    Etl,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile an artifact for a topic and audience
    #[command(name = "compile")]
    Compile {
        /// Topic to explain
        #[arg(short, long)]
        topic: String,

        /// Audience id (e.g. child, general, data_scientist, phd)
        #[arg(short, long)]
        audience: String,

        /// Profile name (defaults to the configured profile)
        #[arg(short, long)]
        profile: Option<String>,

        /// Disable a layer for this run (repeatable)
        #[arg(long = "disable")]
        disable: Vec<Layer>,

        /// Mark a layer required for this run (repeatable)
        #[arg(long = "require")]
        require: Vec<Layer>,

        /// Regenerate weak layers using the configured threshold
        #[arg(long)]
        regenerate: bool,

        /// Regenerate layers scoring below this threshold after compiling
        #[arg(long)]
        regenerate_below: Option<f64>,

        /// Format the record for an integration instead of the score report
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Print as JSON (the full record, or the formatted view with --format)
        #[arg(long)]
        json: bool,
    },

    /// Run an A/B experiment over one or more layers
    #[command(name = "experiment")]
    Experiment {
        /// Topic to explain
        #[arg(short, long)]
        topic: String,

        /// Audience id
        #[arg(short, long)]
        audience: String,

        /// Profile name (defaults to the configured profile)
        #[arg(short, long)]
        profile: Option<String>,

        /// Layers to toggle, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        layers: Vec<Layer>,

        /// Compiles per variant
        #[arg(short, long, default_value_t = 1)]
        repetitions: u32,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available profiles
    #[command(name = "profiles")]
    Profiles,
}
