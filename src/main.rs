//! cardsync CLI entry point.
//!
//! Provides `interpret`, `project`, `verify-key` and `upload` subcommands.
//! Command output goes to stdout as JSON; logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use cardsync::batch::{
    authorize, extract_batch, BatchError, BatchUploader, ModelResponse, UploadCandidate,
};
use cardsync::config::Config;
use cardsync::credentials::{
    default_credentials_path, load_optional_credentials, Credentials, NOTION_TOKEN, OPENAI_API_KEY,
};
use cardsync::destinations::notion::NotionClient;
use cardsync::extraction::interpreter::{interpret, Interpretation};
use cardsync::extraction::review::{review_records, summarize_coverage};
use cardsync::extraction::validator::validate_records;
use cardsync::logging::{self, LoggingGuard};
use cardsync::projection::mapper::map_record;
use cardsync::projection::{MappingContext, SchemaDefinition};
use cardsync::verification::openai::OpenAiKeyProbe;
use cardsync::verification::{
    CredentialCheck, CredentialValidator, ValidateOptions, ValidationCache,
};

/// cardsync: business-card contacts from vision-model output.
#[derive(Parser)]
#[command(name = "cardsync", version, about)]
struct Cli {
    /// Config file (defaults to `$CARDSYNC_CONFIG` or `~/.cardsync/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credentials file (defaults to `~/.cardsync/.env`).
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Print validated records for one raw model response.
    Interpret {
        /// File holding the raw response text.
        file: PathBuf,
    },
    /// Print destination payloads for one raw model response.
    Project {
        /// File holding the raw response text.
        file: PathBuf,
        /// JSON object mapping property name to type name.
        #[arg(long)]
        schema: PathBuf,
        /// Processing timestamp (RFC 3339); defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Validate the model API key.
    VerifyKey {
        /// Accept a well-formed key without contacting the API.
        #[arg(long)]
        skip: bool,
        /// Use the fallback check as the first method.
        #[arg(long)]
        fallback: bool,
    },
    /// Extract and upload records from raw responses to the configured database.
    Upload {
        /// Files holding raw response text, one per image.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Accept a well-formed key without contacting the API.
        #[arg(long)]
        skip_verification: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env = |key: &str| std::env::var(key).ok();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_overrides(env);
            config
        }
        None => Config::load().context("failed to load configuration")?,
    };
    let _logging_guard = init_logging(&config)?;

    match cli.command {
        Command::Interpret { file } => handle_interpret(&file, &config),
        Command::Project { file, schema, at } => handle_project(&file, &schema, at),
        Command::VerifyKey { skip, fallback } => {
            let credentials = load_credentials(cli.env_file.as_deref())?;
            handle_verify_key(&config, &credentials, skip, fallback).await
        }
        Command::Upload {
            files,
            skip_verification,
        } => {
            let credentials = load_credentials(cli.env_file.as_deref())?;
            handle_upload(&config, &credentials, &files, skip_verification).await
        }
    }
}

fn init_logging(config: &Config) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => Ok(Some(logging::init_file(dir, &config.logging.level)?)),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn load_credentials(explicit: Option<&Path>) -> anyhow::Result<Credentials> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_credentials_path()?,
    };
    load_optional_credentials(&path)
        .with_context(|| format!("failed to load credentials from {}", path.display()))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

/// Interpret, validate and review one response.
fn handle_interpret(file: &Path, config: &Config) -> anyhow::Result<()> {
    let interpretation = interpret(&read_text(file)?);
    if let Interpretation::Failed { .. } = interpretation {
        return print_json(&interpretation);
    }

    let records = validate_records(interpretation.cards());
    let review = review_records(&records, config.review.low_confidence_threshold);
    if !review.is_clean() {
        warn!(warnings = review.warning_count(), "records need review");
    }
    print_json(&serde_json::json!({
        "records": records,
        "review": review,
        "coverage": summarize_coverage(&records),
    }))
}

/// Interpret one response and project it onto a schema file.
fn handle_project(file: &Path, schema: &Path, at: Option<DateTime<Utc>>) -> anyhow::Result<()> {
    let pairs: std::collections::BTreeMap<String, String> =
        serde_json::from_str(&read_text(schema)?).with_context(|| {
            format!(
                "schema {} must be a JSON object of name to type",
                schema.display()
            )
        })?;
    let schema = SchemaDefinition::from_type_names(pairs);
    let ctx = at.map_or_else(MappingContext::now, MappingContext::at);

    let interpretation = interpret(&read_text(file)?);
    if let Some(error) = interpretation.error() {
        return Err(anyhow::anyhow!("no records recovered: {error}"));
    }

    let payloads: Vec<_> = validate_records(interpretation.cards())
        .iter()
        .map(|record| map_record(record, &schema, &ctx))
        .collect();
    print_json(&payloads)
}

async fn check_key(
    config: &Config,
    credentials: &Credentials,
    options: ValidateOptions,
) -> anyhow::Result<CredentialCheck> {
    let key = credentials.require(OPENAI_API_KEY, |key| std::env::var(key).ok())?;
    let probe = OpenAiKeyProbe::new(
        &config.openai.base_url,
        config.openai.probe_model.clone(),
        config.openai.timeout(),
    )?;
    let validator = CredentialValidator::with_policy(probe, config.verification.retry_policy());
    let mut cache = ValidationCache::new();
    Ok(validator.validate(&mut cache, &key, options).await)
}

/// Run the credential validator and report the result.
async fn handle_verify_key(
    config: &Config,
    credentials: &Credentials,
    skip: bool,
    fallback: bool,
) -> anyhow::Result<()> {
    let check = check_key(
        config,
        credentials,
        ValidateOptions {
            skip_verification: skip,
            use_fallback: fallback,
        },
    )
    .await?;
    print_json(&check)?;
    authorize(&check)?;
    Ok(())
}

/// Full pipeline: verify, extract, project, upload.
async fn handle_upload(
    config: &Config,
    credentials: &Credentials,
    files: &[PathBuf],
    skip_verification: bool,
) -> anyhow::Result<()> {
    let database_id = config.notion.database_id.trim();
    if database_id.is_empty() {
        anyhow::bail!(
            "no destination configured: set notion.database_id or CARDSYNC_NOTION_DATABASE_ID"
        );
    }

    let check = check_key(
        config,
        credentials,
        ValidateOptions {
            skip_verification,
            use_fallback: false,
        },
    )
    .await?;
    authorize(&check)?;

    let responses = files
        .iter()
        .map(|path| {
            Ok(ModelResponse {
                source: path.file_name().map_or_else(
                    || path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                ),
                text: read_text(path)?,
                usage: Default::default(),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let extracted = extract_batch(&responses);
    for failure in &extracted.failures {
        warn!(source = %failure.source, error = %failure.error, "skipping unreadable response");
    }

    let token = credentials.require(NOTION_TOKEN, |key| std::env::var(key).ok())?;
    let client = NotionClient::new(&config.notion.base_url, token, config.notion.timeout())?
        .with_version(config.notion.api_version.clone());
    let uploader = BatchUploader::new(&client, &client, database_id);

    let candidates: Vec<UploadCandidate> = extracted
        .records
        .into_iter()
        .map(|extracted| UploadCandidate::new(extracted.record))
        .collect();
    let summary = match uploader
        .upload(&check, &candidates, &MappingContext::now())
        .await
    {
        Ok(summary) => summary,
        Err(BatchError::DestinationAuthentication { source, partial }) => {
            print_json(&partial)?;
            return Err(BatchError::DestinationAuthentication { source, partial }.into());
        }
        Err(e) => return Err(e.into()),
    };

    info!(created = summary.created, failed = summary.failed, "upload finished");
    print_json(&summary)
}
