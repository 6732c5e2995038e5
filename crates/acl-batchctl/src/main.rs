//! acl-batchctl: validate, apply and verify ACL entry batches.
//!
//! ```text
//! acl-batchctl validate --service-id SVC --acl-id ACL --file ops.json
//! acl-batchctl apply    --service-id SVC --acl-id ACL --file ops.json [--dry-run]
//! acl-batchctl list     --service-id SVC --acl-id ACL [--json]
//! acl-batchctl verify   --service-id SVC --acl-id ACL --expected expected.json
//! ```
//!
//! Logs go to stderr; results go to stdout.

mod config;
mod http;
mod input;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use acl_batch::{
    diff, fetch_normalized, validate, AclEntry, CancellationToken, SubmissionError,
    TransportLister,
};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use crate::config::{CtlConfig, DEFAULT_CONFIG_PATH};
use crate::http::HttpTransport;

/// Batch mutation client for ACL entries
#[derive(Parser, Debug)]
#[command(name = "acl-batchctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// The ACL a command operates on.
#[derive(Args, Debug)]
struct Target {
    /// Owning service
    #[arg(long, env = "ACL_BATCH_SERVICE_ID")]
    service_id: String,

    /// ACL within the service
    #[arg(long, env = "ACL_BATCH_ACL_ID")]
    acl_id: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check an operations file without contacting the remote store
    Validate {
        #[command(flatten)]
        target: Target,

        /// JSON operations file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Submit an operations file as one atomic batch
    Apply {
        #[command(flatten)]
        target: Target,

        /// JSON operations file
        #[arg(short, long)]
        file: PathBuf,

        /// Print the request body instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the ACL's entries in normalized order
    List {
        #[command(flatten)]
        target: Target,

        /// Print JSON instead of one line per entry
        #[arg(long)]
        json: bool,
    },

    /// Compare the ACL's entries with an expectation file
    Verify {
        #[command(flatten)]
        target: Target,

        /// JSON array of expected entries
        #[arg(short, long)]
        expected: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "acl-batchctl: Command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CtlConfig::load_or_default(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Validate { target, file } => validate_file(&config, &target, &file),
        Command::Apply {
            target,
            file,
            dry_run,
        } => apply(&config, &target, &file, dry_run).await,
        Command::List { target, json } => list(&config, &target, json).await,
        Command::Verify { target, expected } => verify(&config, &target, &expected).await,
    }
}

/// Reports every invalid operation, not only the first, then checks the
/// batch as a whole.
fn validate_file(config: &CtlConfig, target: &Target, file: &Path) -> anyhow::Result<()> {
    let operations = input::read_operations(file)?;

    let mut invalid = 0usize;
    for (index, op) in operations.iter().enumerate() {
        if let Err(e) = validate(op) {
            invalid += 1;
            println!("operation {}: {}", index, e);
        }
    }
    if invalid > 0 {
        bail!("{} of {} operations are invalid", invalid, operations.len());
    }

    let request = config
        .engine
        .builder()
        .build(&target.service_id, &target.acl_id, operations)?;
    println!(
        "{} operations valid ({} creates)",
        request.len(),
        request.create_count()
    );
    Ok(())
}

fn connect(config: &CtlConfig) -> anyhow::Result<HttpTransport> {
    let token = config.api.token();
    if token.is_none() {
        bail!(
            "API token not set; export {} or set [api] token_env",
            config.api.token_env
        );
    }
    HttpTransport::new(&config.api, token.as_deref(), config.engine.timeout())
}

/// Cancels `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("acl-batchctl: Interrupted, cancelling");
            token.cancel();
        }
    });
}

async fn apply(config: &CtlConfig, target: &Target, file: &Path, dry_run: bool) -> anyhow::Result<()> {
    let operations = input::read_operations(file)?;
    let request = config
        .engine
        .builder()
        .build(&target.service_id, &target.acl_id, operations)?;

    if dry_run {
        let body: serde_json::Value = serde_json::from_slice(&request.to_body()?)?;
        println!("PATCH {}", request.path());
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let transport = connect(config)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let operations = request.len();
    let has_creates = !request.is_idempotent();
    match config.engine.submitter().submit(request, &transport, &cancel).await {
        Ok(()) => {
            info!(operations, "acl-batchctl: Batch applied");
            println!("applied {} operations", operations);
            Ok(())
        }
        Err(SubmissionError::TransportFailure(e)) if has_creates => {
            Err(SubmissionError::TransportFailure(e)).context(
                "outcome unknown; run 'acl-batchctl list' before resubmitting a batch with creates",
            )
        }
        Err(e) => Err(e.into()),
    }
}

async fn fetch(config: &CtlConfig, target: &Target) -> anyhow::Result<Vec<AclEntry>> {
    let transport = connect(config)?;
    let lister = TransportLister::new(transport).with_per_page(config.api.per_page);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);
    tokio::select! {
        _ = cancel.cancelled() => bail!("listing cancelled"),
        entries = fetch_normalized(&lister, &target.service_id, &target.acl_id) => {
            Ok(entries?)
        }
    }
}

async fn list(config: &CtlConfig, target: &Target, json: bool) -> anyhow::Result<()> {
    let entries = fetch(config, target).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            match &entry.comment {
                Some(comment) => println!("{}\t{}", entry, comment),
                None => println!("{}", entry),
            }
        }
    }
    Ok(())
}

async fn verify(config: &CtlConfig, target: &Target, expected: &Path) -> anyhow::Result<()> {
    let expected = input::read_expected(expected)?;
    let entries = fetch(config, target).await?;

    let discrepancies = diff(entries, expected);
    if discrepancies.is_empty() {
        println!("ACL matches expectation");
        return Ok(());
    }
    for discrepancy in &discrepancies {
        println!("{}", discrepancy);
    }
    bail!("{} discrepancies found", discrepancies.len())
}
