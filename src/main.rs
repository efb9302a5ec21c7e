use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rml_core::config::RunnerConfig;
use rml_core::types::SourceOverrides;
use rml_engine::{EngineArtifactResolver, Orchestrator, ProcessRunner, ReleaseDownloader, StreamingAdapter};
use rml_mapping::HttpFileFetcher;

#[derive(Parser)]
#[command(
    name = "rml-runner",
    version,
    about = "Run RML mapping engines from pipeline descriptions",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "rml-runner.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Pipeline document to run (shorthand for `run <pipeline>`)
    pipeline: Option<String>,

    /// Never download the engine artifact
    #[arg(short = 'f', long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every mapping execution declared in a pipeline document
    Run {
        /// Pipeline document (path or URL)
        pipeline: String,
        /// Never download the engine artifact
        #[arg(short = 'f', long)]
        offline: bool,
    },
    /// Map data files one chunk at a time and print the results
    Map(MapArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Args)]
struct MapArgs {
    /// Mapping document applied to every chunk
    #[arg(short, long)]
    mapping: PathBuf,
    /// Reference formulation IRI forced onto the logical source
    #[arg(long)]
    reference_formulation: Option<String>,
    /// Iterator forced onto the logical source
    #[arg(long)]
    iterator: Option<String>,
    /// Engine artifact location
    #[arg(long)]
    jar: Option<PathBuf>,
    /// Never download the engine artifact
    #[arg(short = 'f', long)]
    offline: bool,
    /// Data files, each mapped as one chunk
    #[arg(required = true)]
    chunks: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RunnerConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run { pipeline, offline }) => run_pipeline(&config, &pipeline, offline).await,
        Some(Commands::Map(args)) => map_files(&config, args).await,
        Some(Commands::Config) => {
            println!("Config file: {}", cli.config.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        None => match cli.pipeline {
            Some(pipeline) => run_pipeline(&config, &pipeline, cli.offline).await,
            None => anyhow::bail!("no pipeline given; try `rml-runner run <pipeline.ttl>`"),
        },
    }
}

fn downloader(config: &RunnerConfig) -> anyhow::Result<Arc<ReleaseDownloader>> {
    let timeout = Duration::from_secs(config.engine.download_timeout_secs);
    Ok(Arc::new(ReleaseDownloader::new(timeout)?))
}

async fn run_pipeline(config: &RunnerConfig, pipeline: &str, offline: bool) -> anyhow::Result<()> {
    let temp_dir = config.temp_dir();
    let resolver = Arc::new(EngineArtifactResolver::new(
        config.engine.streamer_release.clone(),
        &temp_dir,
        downloader(config)?,
    ));
    let runner = Arc::new(ProcessRunner::from_config(&config.engine).with_label("rmlstreamer"));
    let fetcher = Arc::new(HttpFileFetcher::new()?);

    let orchestrator = Orchestrator::new(temp_dir, fetcher, resolver, runner).offline(offline);
    let outcomes = orchestrator
        .run_pipeline(pipeline)
        .await
        .with_context(|| format!("failed to run pipeline {pipeline}"))?;

    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_ok()).collect();
    for outcome in &failed {
        if let Err(e) = &outcome.result {
            error!(binding = %outcome.binding.label(), error = %e, "Mapping execution failed");
        }
    }
    if !failed.is_empty() {
        anyhow::bail!(
            "{} of {} mapping executions failed",
            failed.len(),
            outcomes.len()
        );
    }

    info!(executions = outcomes.len(), "Pipeline finished");
    Ok(())
}

async fn map_files(config: &RunnerConfig, args: MapArgs) -> anyhow::Result<()> {
    let temp_dir = config.temp_dir();
    tokio::fs::create_dir_all(&temp_dir).await?;

    let resolver = EngineArtifactResolver::new(
        config.engine.mapper_release.clone(),
        &temp_dir,
        downloader(config)?,
    );
    let artifact = resolver.resolve(args.jar.as_deref(), args.offline).await?;
    let runner = Arc::new(ProcessRunner::from_config(&config.engine).with_label("rmlmapper"));
    let overrides = SourceOverrides {
        reference_formulation: args.reference_formulation,
        iterator: args.iterator,
    };
    let adapter = StreamingAdapter::new(&temp_dir, artifact, runner, overrides);

    let (data_tx, data_rx) = mpsc::channel(1);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(1);
    let expected = args.chunks.len();
    let chunks = args.chunks;

    let feed = async move {
        for path in chunks {
            let chunk = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            if data_tx.send(chunk).await.is_err() {
                break;
            }
        }
        Ok::<_, anyhow::Error>(())
    };

    let print = async move {
        let mut printed = 0usize;
        while let Some(chunk) = out_rx.recv().await {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
            printed += 1;
        }
        Ok::<_, std::io::Error>(printed)
    };

    let (served, fed, printed) = tokio::join!(
        adapter.run_with_mapping_file(&args.mapping, data_rx, out_tx),
        feed,
        print
    );
    served?;
    fed?;
    let printed = printed?;

    if printed < expected {
        anyhow::bail!("{} of {expected} chunks failed to map", expected - printed);
    }
    Ok(())
}
