use anyhow::Context;
use clap::Parser;
use impactsense::{
    config::Config,
    dataset::DataAcquirer,
    ml::{ArtifactPaths, TrainingPipeline},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "impactsense-train", version)]
#[command(about = "Train the earthquake impact classifier", long_about = None)]
struct Cli {
    /// Seed for data synthesis, splitting, search and tree growth
    #[arg(long)]
    seed: Option<u64>,

    /// Skip remote datasets and train on synthetic data
    #[arg(long)]
    synthetic: bool,

    /// Where to write the model and feature-order artifacts
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Number of sampled hyperparameter configurations
    #[arg(long)]
    n_iter: Option<usize>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
        config.data.seed = seed;
    }
    if let Some(n_iter) = cli.n_iter {
        config.training.n_iter = n_iter;
    }
    if let Some(dir) = cli.artifact_dir {
        config.artifacts.dir = dir;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.observability.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut acquirer = DataAcquirer::from_config(&config.data);
    if cli.synthetic {
        acquirer = acquirer.synthetic_only();
    }

    let report = TrainingPipeline::from_config(&config)
        .with_acquirer(acquirer)
        .run()
        .await
        .context("training failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let ArtifactPaths {
        model,
        feature_order,
    } = &report.artifacts;

    println!("Run id:        {}", report.run_id);
    println!("Data:          {}", report.origin);
    println!(
        "Rows:          {} kept of {} ({} duplicates, {} unknown labels)",
        report.cleaning.output_rows,
        report.cleaning.input_rows,
        report.cleaning.duplicates_removed,
        report.cleaning.unknown_labels_dropped
    );
    for (class, count) in &report.class_distribution {
        println!("  {:<8} {}", class, count);
    }
    println!("Split:         {} train / {} test", report.train_rows, report.test_rows);
    println!("Best params:   {}", report.best_params);
    println!("CV F1:         {:.4}", report.cv_score);
    println!("Test accuracy: {:.4}", report.test_metrics.accuracy);
    println!("Test F1:       {:.4}", report.test_metrics.f1_score);
    for (class, m) in &report.test_metrics.per_class_metrics {
        println!(
            "  {:<8} precision {:.3} recall {:.3} f1 {:.3} support {}",
            class, m.precision, m.recall, m.f1_score, m.support
        );
    }
    println!("Model:         {}", model.display());
    println!("Feature order: {}", feature_order.display());
    Ok(())
}
