//! `bdaymagic` -- turn a photo into a birthday-themed picture from the
//! terminal.
//!
//! Settings come from the environment (and `.env`); see
//! [`EffectsConfig::from_env`] for the full table. `RUST_LOG` controls log
//! output and defaults to `bdaymagic=info`.

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bdaymagic_core::config::EffectsConfig;
use bdaymagic_core::media::MediaFile;
use bdaymagic_effects::{EffectsApi, ImageStore, ResultRetriever, StorageUploader};
use bdaymagic_session::{run_observer, Session, SessionError};

use render::TerminalRenderer;

#[derive(Debug, Parser)]
#[command(name = "bdaymagic", version, about = "Birthday background effect for your photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a photo, render the effect and download the result.
    Generate(GenerateArgs),
    /// Upload a photo and print its public URL.
    Upload(UploadArgs),
    /// Check a job once and print its status.
    Status(StatusArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// JPG or PNG photo to transform.
    image: PathBuf,
    /// Directory for the downloaded result (overrides `DOWNLOAD_DIR`).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print the result URL without downloading it.
    #[arg(long)]
    no_download: bool,
    /// Do not open the result link in a browser if the download fails.
    #[arg(long)]
    no_open: bool,
}

#[derive(Debug, Parser)]
struct UploadArgs {
    image: PathBuf,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    job_id: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bdaymagic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bdaymagic error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = EffectsConfig::from_env().context("invalid configuration")?;
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("could not build HTTP client")?;

    match cli.command {
        Command::Generate(args) => generate(config, client, args).await,
        Command::Upload(args) => upload(config, client, args).await,
        Command::Status(args) => status(config, client, args).await,
    }
}

/// Full pipeline. Failures inside the session are already rendered as
/// notices, so they only change the exit code.
async fn generate(
    config: EffectsConfig,
    client: reqwest::Client,
    args: GenerateArgs,
) -> anyhow::Result<ExitCode> {
    let file = read_image(&args.image).await?;
    let download_dir = args.out.unwrap_or_else(|| config.download_dir.clone());

    let session = Arc::new(Session::new(
        Arc::new(StorageUploader::new(client.clone(), &config)),
        Arc::new(EffectsApi::new(client.clone(), &config)),
        Arc::new(
            ResultRetriever::new(client, download_dir, !args.no_open)
                .with_request_timeout(config.request_timeout()),
        ),
    ));

    let observer = {
        let states = session.subscribe_state();
        let notices = session.subscribe_notices();
        tokio::spawn(async move {
            let mut renderer = TerminalRenderer::new(std::io::stdout());
            run_observer(states, notices, &mut renderer, CancellationToken::new()).await;
        })
    };

    let interrupt = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, resetting session");
                session.reset();
            }
        })
    };

    let outcome = run_pipeline(&session, file, !args.no_download).await;

    // Dropping the last session handle closes the channels, which lets the
    // observer drain what is left and exit.
    interrupt.abort();
    let _ = interrupt.await;
    drop(session);
    if let Err(e) = observer.await {
        tracing::warn!(error = %e, "Renderer task failed");
    }

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(SessionError::Abandoned) => {
            eprintln!("Cancelled.");
            Ok(ExitCode::from(130))
        }
        Err(e) => {
            tracing::debug!(error = %e, "Generation did not complete");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_pipeline(
    session: &Session,
    file: MediaFile,
    download: bool,
) -> Result<(), SessionError> {
    session.select_file(file).await?;
    session.generate().await?;
    if download {
        session.download().await?;
    }
    Ok(())
}

async fn upload(
    config: EffectsConfig,
    client: reqwest::Client,
    args: UploadArgs,
) -> anyhow::Result<ExitCode> {
    let file = read_image(&args.image).await?;
    file.validate_image()?;

    let uploader = StorageUploader::new(client, &config);
    let image = uploader
        .upload(&file, &CancellationToken::new())
        .await
        .context("upload failed")?;

    println!("{}", image.source_url);
    Ok(ExitCode::SUCCESS)
}

async fn status(
    config: EffectsConfig,
    client: reqwest::Client,
    args: StatusArgs,
) -> anyhow::Result<ExitCode> {
    let api = EffectsApi::new(client, &config);
    let response = api.check_status(&args.job_id).await?;

    println!("status: {}", response.status);
    if let Some(url) = response.result_url() {
        println!("result: {url}");
    }
    if let Some(error) = &response.error {
        println!("error: {error}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_image(path: &Path) -> anyhow::Result<MediaFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(MediaFile::from_path_and_bytes(path, bytes))
}
