use std::error::Error;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::FutureExt;
use horoskop_core::model::config::Settings;
use horoskop_core::services::http::{HttpFetcher, PageFetcher};
use horoskop_core::services::instance::Instance;
use horoskop_core::services::{config, encoding};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
use protocol::Registry;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "horoskop-core", version, about = "ehoroskop.net extraction and translation core")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Refresh on schedule and answer JSON-lines commands on stdin
    Serve,
    /// Refresh once and print the payload
    Once {
        #[arg(long)]
        instance: Option<String>,
    },
    /// Print the decode report for a local HTML file
    Inspect {
        path: PathBuf,
        #[arg(long)]
        charset: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horoskop_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.mode.unwrap_or(Mode::Serve) {
        Mode::Serve => serve(cli.config).await,
        Mode::Once { instance } => once(cli.config, instance).await,
        Mode::Inspect { path, charset } => inspect(&path, charset.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "horoskop-core failed");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings, BoxError> {
    let path = config::resolve_path(path);
    Ok(config::load(path.as_deref())?)
}

fn build_instances(settings: &Settings) -> Result<Vec<Arc<Instance>>, BoxError> {
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&settings.http)?);
    let generator = config::build_generator(settings)?;

    Ok(settings
        .instances
        .iter()
        .map(|s| {
            Arc::new(Instance::new(
                s,
                settings.http.base_url.clone(),
                fetcher.clone(),
                generator.clone(),
            ))
        })
        .collect())
}

async fn serve(config_path: Option<PathBuf>) -> Result<(), BoxError> {
    let settings = load_settings(config_path)?;
    let mut registry = Registry::new(build_instances(&settings)?);

    for instance in registry.instances() {
        // Startup refresh; a failure here is logged and the schedule retries.
        let _ = instance.refresh().await;
    }
    registry.start_schedules();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let result = AssertUnwindSafe(protocol::handle(&registry, &line))
            .catch_unwind()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(_) => serde_json::json!({
                "status": "error",
                "message": "internal core error"
            })
            .to_string(),
        };

        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

async fn once(config_path: Option<PathBuf>, name: Option<String>) -> Result<(), BoxError> {
    let mut settings = load_settings(config_path)?;
    let selected = match &name {
        Some(name) => settings
            .instances
            .iter()
            .position(|i| &i.name == name)
            .ok_or_else(|| format!("unknown instance `{name}`"))?,
        None => 0,
    };

    // Translate inline instead of in the background so the result is printed.
    let translate = settings.instances[selected].translation_enabled;
    settings.instances[selected].translation_enabled = false;

    let instance = build_instances(&settings)?.swap_remove(selected);
    instance.refresh().await?;
    if translate {
        if let Err(e) = instance.translate().await {
            tracing::warn!(error = %e, "translation failed, printing untranslated payload");
        }
    }

    let snapshot = instance
        .snapshot()
        .await
        .ok_or("refresh produced no snapshot")?;
    println!("{}", serde_json::to_string_pretty(&snapshot.payload())?);
    Ok(())
}

fn inspect(path: &std::path::Path, charset: Option<&str>) -> Result<(), BoxError> {
    let report = encoding::detect_from_file(path, charset)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
