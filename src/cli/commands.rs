//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use tracing::info;

use super::OutputFormat;
use crate::adapters::{Adapter, ChatMessage, ChatbotAdapter, EtlAdapter, RagAdapter, RagChunk};
use crate::core::{Layer, Record};
use crate::error::Result;
use crate::orchestrator::{
    Conductor, ExperimentConfig, ExperimentReport, ExperimentRunner, LayerOverrides,
};

/// Options for a single compile
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub disable: Vec<Layer>,
    pub require: Vec<Layer>,
    pub regenerate_below: Option<f64>,
    pub format: Option<OutputFormat>,
    pub json: bool,
}

impl CompileOptions {
    /// Runtime overrides built from `--disable` and `--require`
    pub fn overrides(&self) -> LayerOverrides {
        let mut overrides = LayerOverrides::new();
        for layer in &self.require {
            overrides.entry(*layer).or_default().required = Some(true);
        }
        for layer in &self.disable {
            overrides.entry(*layer).or_default().enabled = Some(false);
        }
        overrides
    }
}

/// Compile an artifact and print it.
pub fn compile(
    conductor: &Conductor,
    topic: &str,
    audience: &str,
    profile: &str,
    options: &CompileOptions,
) -> Result<()> {
    info!("Compiling '{}' for '{}' with profile '{}'", topic, audience, profile);

    let overrides = options.overrides();
    let mut record = conductor.compile(topic, audience, profile, Some(&overrides), None)?;

    if let Some(threshold) = options.regenerate_below {
        let configs = conductor.resolve_configs(profile, Some(&overrides));
        let changed = conductor.regenerate(&mut record, &configs, threshold);
        info!("Regenerated {} layer(s)", changed.len());
    }

    match (options.format, options.json) {
        (None, true) => println!("{}", serde_json::to_string_pretty(&record)?),
        (None, false) => print_record(&record),
        (Some(format), json) => print_formatted(&record, format, json)?,
    }

    Ok(())
}

/// Print a record through one of the integration adapters
fn print_formatted(record: &Record, format: OutputFormat, json: bool) -> Result<()> {
    match format {
        OutputFormat::Chatbot => {
            let messages = ChatbotAdapter.format(record);
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                print_chat(&messages);
            }
        }
        OutputFormat::Rag => {
            let chunks = RagAdapter.format(record);
            if json {
                println!("{}", serde_json::to_string_pretty(&chunks)?);
            } else {
                print_chunks(&chunks);
            }
        }
        OutputFormat::Etl => {
            let row = serde_json::to_value(EtlAdapter.format(record))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&row)?);
            } else if let Some(fields) = row.as_object() {
                for (key, value) in fields {
                    match value.as_f64() {
                        Some(v) if value.is_f64() => println!("  {:<30} : {:.4}", key, v),
                        _ => println!("  {:<30} : {}", key, value),
                    }
                }
                println!("Total fields: {}", fields.len());
            }
        }
    }
    Ok(())
}

fn print_chat(messages: &[ChatMessage]) {
    for message in messages {
        println!(
            "[{} | {} | confidence {:.2}]",
            message.role.as_str(),
            message.layer,
            message.confidence
        );
        println!("{}", message.content);
        println!();
    }
}

fn print_chunks(chunks: &[RagChunk]) {
    println!("{} chunk(s)", chunks.len());
    for chunk in chunks {
        println!("{:-<60}", "");
        println!("{}", chunk.chunk_id);
        println!(
            "layer={} field={} confidence={:.2}",
            chunk.metadata.layer, chunk.metadata.field, chunk.metadata.confidence
        );
        println!("{}", chunk.content);
    }
}

/// Run an A/B experiment and print the summary.
pub fn experiment(
    conductor: &Conductor,
    topic: &str,
    audience: &str,
    profile: &str,
    layers: Vec<Layer>,
    repetitions: u32,
    json: bool,
) -> Result<()> {
    let config = ExperimentConfig::new(topic, audience, profile, layers).with_repetitions(repetitions);
    let report = ExperimentRunner::new(conductor).run(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// List profiles in the profiles directory.
pub fn list_profiles(conductor: &Conductor) -> Result<()> {
    let dir = conductor.toggles().profiles_dir();
    info!("Listing profiles in {}", dir.display());

    let profiles = conductor.toggles().list_profiles();
    if profiles.is_empty() {
        println!("No profiles found in {}", dir.display());
        return Ok(());
    }

    println!("Profiles ({}):", dir.display());
    for name in profiles {
        println!("  {}", name);
    }

    Ok(())
}

fn print_record(record: &Record) {
    let artifact = &record.artifact;
    println!("=== {} ===", artifact.topic());
    println!(
        "Audience: {} ({})",
        artifact.audience().name,
        artifact.audience().expertise
    );
    println!("Profile: {}", record.profile_name);
    println!("{:-<60}", "");

    if let Some(evaluation) = &artifact.evaluation {
        for (layer, score) in &evaluation.layer_scores {
            let status = if artifact.is_populated(*layer) { "" } else { "  (empty)" };
            println!("  {:<14} {:.2}{}", layer.as_str(), score, status);
        }
        println!("{:-<60}", "");
        println!("Overall score: {:.4}", evaluation.overall_score);
        if let Some(reason) = &evaluation.penalty_reason {
            println!("Penalty: {}", reason);
        }
    }

    println!("Revision: {}", record.current_revision());
    for tracker in &record.provenance {
        let summary = tracker.summary();
        println!(
            "Run {}: {} step(s), {:.1} ms, {} failed",
            summary.run_id,
            summary.total_steps,
            summary.total_duration_ms,
            summary.failed.len()
        );
    }
}

fn print_report(report: &ExperimentReport) {
    let summary = report.summary();
    println!("=== Experiment {} ===", summary.experiment_id);
    println!("Topic: {}", report.config.topic);
    println!("Baseline score: {:.4}", summary.baseline_score);
    println!("{:-<60}", "");
    println!("  {:<14} {:>9} {:>9} {:>9}", "layer", "enabled", "disabled", "delta");
    for result in &report.layer_results {
        println!(
            "  {:<14} {:>9.4} {:>9.4} {:>+9.4}",
            result.layer.as_str(),
            result.enabled_score,
            result.disabled_score,
            result.score_delta
        );
    }
    println!("{:-<60}", "");
    if let (Some(best), Some(worst)) = (summary.best_layer, summary.worst_layer) {
        println!("Best layer: {}", best);
        println!("Worst layer: {}", worst);
    }
    println!("Duration: {:.1} ms", summary.total_duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::LayerOverride;

    #[test]
    fn test_overrides_from_flags() {
        let options = CompileOptions {
            disable: vec![Layer::Metaphor],
            require: vec![Layer::Structure, Layer::Metaphor],
            ..Default::default()
        };
        let overrides = options.overrides();

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[&Layer::Structure], LayerOverride::required(true));
        assert_eq!(overrides[&Layer::Metaphor].enabled, Some(false));
        assert_eq!(overrides[&Layer::Metaphor].required, Some(true));
    }

    #[test]
    fn test_no_flags_no_overrides() {
        assert!(CompileOptions::default().overrides().is_empty());
    }

    #[test]
    fn test_compile_every_format() {
        let conductor = Conductor::new("does-not-exist");
        for format in [OutputFormat::Chatbot, OutputFormat::Rag, OutputFormat::Etl] {
            for json in [false, true] {
                let options = CompileOptions {
                    format: Some(format),
                    json,
                    ..Default::default()
                };
                compile(&conductor, "entropy", "general", "default", &options).unwrap();
            }
        }
    }
}
