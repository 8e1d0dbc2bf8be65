use anyhow::Context;
use clap::{Parser, Subcommand};
use impactsense::{
    api::{build_router, AppState},
    config::Config,
    ml::{artifacts::read_feature_order, global_predictor, ArtifactPaths, Classifier, TrainedModel},
    models::SeismicObservation,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "impactsense", version)]
#[command(about = "Earthquake impact alert prediction", long_about = None)]
struct Cli {
    /// Directory holding the model and feature-order artifacts
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve predictions over HTTP (default)
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Predict the alert level for one observation
    Predict {
        #[arg(long)]
        magnitude: f64,

        /// Depth in kilometres
        #[arg(long)]
        depth: f64,

        #[arg(long)]
        cdi: f64,

        #[arg(long)]
        mmi: f64,

        #[arg(long, allow_hyphen_values = true)]
        sig: i32,
    },

    /// Inspect the model artifacts
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });
    if let Some(dir) = cli.artifact_dir {
        config.artifacts.dir = dir;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.observability.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let paths = config.artifacts.paths();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.http_port = port;
            }
            serve(&config, &paths).await
        }
        Commands::Predict {
            magnitude,
            depth,
            cdi,
            mmi,
            sig,
        } => {
            let predictor = global_predictor(&paths).context("failed to load model artifacts")?;
            let observation = SeismicObservation::new(magnitude, depth, cdi, mmi, sig)
                .context("invalid observation")?;
            let result = predictor.predict(&observation)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Check => check(&paths),
    }
}

async fn serve(config: &Config, paths: &ArtifactPaths) -> anyhow::Result<()> {
    tracing::info!("Starting ImpactSense v{}", env!("CARGO_PKG_VERSION"));

    let predictor = global_predictor(paths).context("failed to load model artifacts")?;
    tracing::info!(
        run_id = ?predictor.run_id(),
        features = ?predictor.feature_order().to_strings(),
        "Model loaded"
    );

    let app = build_router(AppState::new(predictor));

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("HTTP API listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: POST http://{}/v1/predict", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn check(paths: &ArtifactPaths) -> anyhow::Result<()> {
    println!("Model:         {} (exists: {})", paths.model.display(), paths.model.exists());
    println!(
        "Feature order: {} (exists: {})",
        paths.feature_order.display(),
        paths.feature_order.exists()
    );

    if let Ok(order) = read_feature_order(&paths.feature_order) {
        println!("Features:      {}", order.features.join(", "));
    }

    let model = TrainedModel::load(paths).context("artifacts failed to load")?;
    let metadata = model.classifier.metadata();
    println!("Run id:        {}", model.run_id);
    println!("Trained at:    {}", metadata.trained_at);
    println!("Trees:         {}", metadata.hyperparameters.n_estimators);
    if let Some(cv) = metadata.cv_score {
        println!("CV F1:         {:.4}", cv);
    }
    println!("Status:        OK");
    Ok(())
}
