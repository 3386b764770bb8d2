//! CLI interface for remediation-engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, EngineConfig};
use crate::engine::EngineState;
use crate::prediction::{ArtifactMetadata, TrainingOutcome};

#[derive(Parser)]
#[command(name = "remediation-engine")]
#[command(about = "Inspect and maintain the adaptive remediation learning store", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "REMEDIATION_ENGINE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the SQLite database path
    #[arg(short, long, global = true, env = "REMEDIATION_ENGINE_DB")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast violations for an artifact described by a metadata JSON file
    Predict {
        /// Path to artifact metadata (JSON)
        metadata: PathBuf,
        /// Print the full forecast as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show model and strategy statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Retrain the classifier from the stored corpus now
    Retrain,
    /// Show or initialise configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Print the config file path
        #[arg(long)]
        path: bool,
        /// Print the default configuration
        #[arg(long)]
        defaults: bool,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    if let Some(db) = &cli.database {
        config.storage.database_path = Some(db.clone());
    }
    Ok(config)
}

async fn open_state(cli: &Cli) -> Result<EngineState> {
    let config = load_config(cli)?;
    EngineState::open(config)
        .await
        .context("Failed to open learning store")
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Predict { metadata, json } => {
            let contents = std::fs::read_to_string(metadata)
                .with_context(|| format!("Failed to read {}", metadata.display()))?;
            let metadata: ArtifactMetadata =
                serde_json::from_str(&contents).context("Failed to parse artifact metadata")?;

            let state = open_state(&cli).await?;
            let forecast = state.predict_violations(&metadata).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&forecast)?);
                return Ok(());
            }

            println!("Document:        {}", forecast.document_id);
            println!(
                "Has violations:  {} (p={:.3})",
                if forecast.has_violations { "likely" } else { "unlikely" },
                forecast.confidence
            );
            if forecast.likely_violations.is_empty() {
                println!("Likely:          none above threshold");
            } else {
                println!("Likely:");
                for row in &forecast.likely_violations {
                    println!("  {:<24} {:.2}  {}", row.kind, row.probability, row.reason);
                }
            }
            if !forecast.recommended_checks.is_empty() {
                println!("Checks:");
                for check in &forecast.recommended_checks {
                    println!(
                        "  [{:<8}] {} (~{} min)",
                        check.priority, check.check, check.estimated_minutes
                    );
                }
            }
            if !forecast.prevention_strategies.is_empty() {
                println!("Prevention:");
                for strategy in &forecast.prevention_strategies {
                    println!(
                        "  {} (saves ~{} min)",
                        strategy.action, strategy.estimated_minutes_saved
                    );
                    for (i, step) in strategy.steps.iter().enumerate() {
                        println!("    {}. {}", i + 1, step);
                    }
                }
            }
        }
        Commands::Stats { json } => {
            let state = open_state(&cli).await?;
            let model = state.model_statistics().await?;
            let learning = state.learning_statistics().await?;

            if *json {
                let combined = serde_json::json!({ "model": model, "learning": learning });
                println!("{}", serde_json::to_string_pretty(&combined)?);
                return Ok(());
            }

            println!("Classifier");
            match model.trained_at {
                Some(at) => println!(
                    "  trained:            {} ({:.1}% accuracy)",
                    at.format("%Y-%m-%d %H:%M"),
                    model.accuracy
                ),
                None => println!("  trained:            never"),
            }
            println!("  training runs:      {}", model.training_runs);
            println!("  corpus size:        {}", model.corpus_size);
            println!(
                "  predictions:        {} ({} resolved, {:.1}% correct)",
                model.predictions_total, model.predictions_resolved, model.prediction_accuracy
            );
            println!("  retraining due:     {}", model.retraining_due);
            println!();
            println!("Strategies ({} attempts, {} succeeded)", learning.total_attempts, learning.successful_attempts);
            for profile in &learning.profiles {
                println!(
                    "  {:<20} success {:.2}  confidence {:.2}  avg {:>6.0}ms",
                    profile.technique, profile.success_rate, profile.confidence, profile.avg_time_ms
                );
            }
            if !learning.recent_improvements.is_empty() {
                println!();
                println!("Recent suggestions");
                for imp in &learning.recent_improvements {
                    println!(
                        "  {:<20} {:<16} +{:.2}  {}",
                        imp.technique, imp.category, imp.estimated_impact, imp.suggestion
                    );
                }
            }
        }
        Commands::Retrain => {
            let state = open_state(&cli).await?;
            match state.retrain().await? {
                TrainingOutcome::Trained { samples, accuracy } => {
                    println!("Retrained on {} samples ({:.1}% accuracy)", samples, accuracy);
                }
                TrainingOutcome::Skipped { samples, required } => {
                    println!(
                        "Not enough training data: {} samples (need {}). Model unchanged.",
                        samples, required
                    );
                }
            }
        }
        Commands::Config { show, path, defaults } => {
            if *path {
                match &cli.config {
                    Some(p) => println!("{}", p.display()),
                    None => println!("{}", config::config_path()?.display()),
                }
            } else if *defaults {
                print!("{}", config::default_config_toml());
            } else if *show {
                let config = load_config(&cli)?;
                print!("{}", toml::to_string_pretty(&config)?);
                println!("# database: {}", config.storage.resolve_database_path()?.display());
            } else {
                println!("Use --show, --path, or --defaults");
            }
        }
    }

    Ok(())
}
