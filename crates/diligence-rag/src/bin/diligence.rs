//! `diligence-rag` command-line interface
//!
//! ```bash
//! diligence-rag register acme deal-1 ./data/annual-report.pdf
//! diligence-rag ingest acme deal-1 ./data/annual-report.pdf
//! diligence-rag ask acme deal-1 "What was revenue growth in 2023?"
//! diligence-rag evaluate 5f0c...
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use diligence_rag::{JobStatus, RagConfig, RagService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Grounded, citation-backed answers from uploaded documents
#[derive(Parser)]
#[command(name = "diligence-rag", version, about)]
struct Cli {
    /// Path to a TOML configuration file; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Milliseconds between job status polls
    #[arg(long, global = true, default_value_t = 250)]
    poll_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create document records for files, as an upload would
    Register {
        tenant: String,
        project: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse, embed and index documents
    Ingest {
        tenant: String,
        project: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Register files that have no document record yet
        #[arg(long)]
        register: bool,
    },

    /// Answer one question from the project's documents
    Ask {
        tenant: String,
        project: String,
        question: String,
    },

    /// Compare a stored answer with its reference answer
    Evaluate { answer_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diligence_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let mut config = RagConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    let service = RagService::open(config).context("starting pipeline")?;
    let poll = Duration::from_millis(cli.poll_ms.max(10));

    match cli.command {
        Commands::Register { tenant, project, files } => {
            let mut documents = Vec::with_capacity(files.len());
            for file in &files {
                let path = absolute(file)?;
                documents.push(service.register_document(&tenant, &project, &path).await?);
            }
            print_json(&documents)?;
        }
        Commands::Ingest {
            tenant,
            project,
            files,
            register,
        } => {
            let mut paths = Vec::with_capacity(files.len());
            for file in &files {
                let path = absolute(file)?;
                let key = path.to_string_lossy().into_owned();
                if register
                    && service
                        .pipeline()
                        .store
                        .find_document_by_path(&tenant, &project, &key)?
                        .is_none()
                {
                    service.register_document(&tenant, &project, &path).await?;
                }
                paths.push(key);
            }

            let job_id = service.submit_ingestion_job(&tenant, &project, paths).await?;
            wait_for_job(&service, job_id, poll).await?;
        }
        Commands::Ask {
            tenant,
            project,
            question,
        } => {
            let job_id = service.submit_answering_job(&tenant, &project, &question).await?;
            wait_for_job(&service, job_id, poll).await?;
        }
        Commands::Evaluate { answer_id } => {
            let outcome = service.evaluate(answer_id).await?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("cannot resolve {}", path.display()))
}

/// Poll until the job is terminal, then print its status record
async fn wait_for_job(service: &RagService, job_id: Uuid, poll: Duration) -> anyhow::Result<()> {
    let mut last_stage = None;
    loop {
        let status = service.get_job_status(job_id)?;

        if status.stage != last_stage {
            if let Some(stage) = &status.stage {
                tracing::info!("job {}: {} ({:.0}%)", job_id, stage, status.fraction * 100.0);
            }
            last_stage = status.stage.clone();
        }

        if status.status.is_terminal() {
            print_json(&status)?;
            if status.status == JobStatus::Failed {
                bail!(
                    "job {} failed: {}",
                    job_id,
                    status.message.unwrap_or_default()
                );
            }
            return Ok(());
        }

        tokio::time::sleep(poll).await;
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
