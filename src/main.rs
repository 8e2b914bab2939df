use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use affinity::{
    api::{create_router, AppState},
    config::{Config, EngineConfig},
    db,
    services::{
        run_batch,
        sources::{JsonFileSource, PostgresSource, RecordSource},
        ArtifactPublisher, RecommendationPipeline,
    },
};

#[derive(Parser)]
#[command(name = "affinity")]
#[command(about = "Content-based similar-item recommendations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Recompute the recommendation map and publish it")]
    Compute {
        #[arg(long, help = "JSON or JSON Lines record file (overrides INPUT_PATH)")]
        input: Option<PathBuf>,

        #[arg(long, help = "Artifact path (overrides OUTPUT_PATH)")]
        output: Option<PathBuf>,
    },

    #[command(about = "Serve the published recommendation map over HTTP")]
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Compute {
        input: None,
        output: None,
    }) {
        Commands::Compute { input, output } => {
            if input.is_some() {
                config.input_path = input;
            }
            if let Some(output) = output {
                config.output_path = output;
            }
            compute(config).await
        }
        Commands::Serve => serve(config).await,
    }
}

async fn compute(config: Config) -> anyhow::Result<()> {
    let engine_config = EngineConfig::from_env()?;
    let pipeline = Arc::new(RecommendationPipeline::new(engine_config)?);
    let publisher = ArtifactPublisher::new(&config.output_path);
    let source = open_source(&config).await?;

    let report = run_batch(source.as_ref(), pipeline, &publisher).await?;

    tracing::info!(
        total_records = report.total_records,
        excluded_missing_fields = report.excluded_missing_fields,
        excluded_below_quality = report.excluded_below_quality,
        excluded_duplicates = report.excluded_duplicates,
        avg_recommendations = report.avg_recommendations_per_item,
        artifact_bytes = report.artifact_bytes,
        path = %publisher.path().display(),
        "Recommendation map published"
    );

    Ok(())
}

async fn open_source(config: &Config) -> anyhow::Result<Box<dyn RecordSource>> {
    if let Some(path) = &config.input_path {
        return Ok(Box::new(JsonFileSource::new(path)));
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("either INPUT_PATH (or --input) or DATABASE_URL must be set")?;
    let pool = db::create_pool(database_url).await?;

    Ok(Box::new(PostgresSource::new(pool)))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let publisher = ArtifactPublisher::new(&config.output_path);
    let state = AppState::load(publisher)
        .await
        .with_context(|| format!("failed to load {}", config.output_path.display()))?;

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
