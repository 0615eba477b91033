use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use records::{DEFAULT_RATING, FeedbackRecord, MAX_RATING, MIN_RATING};
use serde_json::Value;
use store::{FeedbackStore, FileStorage, HttpSink, OfflineFirstSync, RetryPolicy, SyncOutcome};
use time::UtcOffset;
use time::macros::format_description;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("sync setup failed: {0}")]
    Sync(#[from] store::SyncError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status} for {path}")]
    ServerStatus { status: u16, path: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "feedback-cli", about = "Collect feedback locally and sync it to the feedback service")]
struct Cli {
    /// Directory holding the local feedback list.
    #[arg(long, env = "FEEDBACK_STORE_DIR", default_value = ".feedback")]
    store_dir: PathBuf,

    #[arg(long, env = "FEEDBACK_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    #[command(flatten)]
    sync: SyncArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct SyncArgs {
    /// Keep new feedback local; do not contact the service.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Extra delivery attempts after the first one fails.
    #[arg(long, env = "FEEDBACK_SYNC_RETRIES", default_value_t = 0)]
    retries: u32,

    #[arg(long, default_value_t = 250)]
    retry_base_ms: u64,

    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the service answers its health probe.
    Ping,
    /// Record new feedback.
    Submit {
        #[arg(long, default_value_t = DEFAULT_RATING, value_parser = clap::value_parser!(i32).range(i64::from(MIN_RATING)..=i64::from(MAX_RATING)))]
        rating: i32,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Show local feedback, newest first.
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Remove feedback from the local list. The service is not contacted.
    Delete { id: Uuid },
    /// Inspect what the service has stored.
    Remote(RemoteCommand),
}

#[derive(Args, Debug)]
struct RemoteCommand {
    #[command(subcommand)]
    command: RemoteSubcommand,
}

#[derive(Subcommand, Debug)]
enum RemoteSubcommand {
    List,
    Read { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Submit { rating, ref comment } => run_submit(&cli, rating, comment).await,
        Command::List { json } => run_list(&cli.store_dir, json),
        Command::Delete { id } => {
            run_delete(&cli.store_dir, id);
            Ok(())
        }
        Command::Remote(ref remote) => run_remote(&cli.base_url, &remote.command).await,
    }
}

fn open_store(store_dir: &Path) -> FeedbackStore<FileStorage> {
    FeedbackStore::load(FileStorage::new(store_dir))
}

fn build_sync(base_url: &str, args: &SyncArgs) -> Result<Option<OfflineFirstSync>, CliError> {
    if args.offline {
        return Ok(None);
    }
    let sink = HttpSink::new(base_url, args.timeout_secs.map(Duration::from_secs))?;
    let policy = if args.retries == 0 {
        RetryPolicy::none()
    } else {
        RetryPolicy::exponential(args.retries.saturating_add(1), Duration::from_millis(args.retry_base_ms)).with_jitter(true)
    };
    Ok(Some(OfflineFirstSync::new(Arc::new(sink)).with_policy(policy)))
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let path = "/healthz";
    let response = reqwest::get(format!("{}{path}", base_url.trim_end_matches('/'))).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerStatus { status: status.as_u16(), path: path.to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_submit(cli: &Cli, rating: i32, comment: &str) -> Result<(), CliError> {
    let mut store = open_store(&cli.store_dir);
    if let Some(sync) = build_sync(&cli.base_url, &cli.sync)? {
        store = store.with_sync(sync);
    }

    let record = store.create(rating, comment);
    println!("{}", render_record(&record));

    if store.is_sending() {
        eprintln!("Sending…");
    }
    // The process is about to exit; let background delivery finish first.
    for outcome in store.settle().await {
        eprintln!("{}", render_outcome(&outcome));
    }
    Ok(())
}

fn run_list(store_dir: &Path, json: bool) -> Result<(), CliError> {
    let store = open_store(store_dir);
    if json {
        println!("{}", serde_json::to_string_pretty(store.records())?);
    } else {
        println!("{}", render_list(store.records()));
    }
    Ok(())
}

fn run_delete(store_dir: &Path, id: Uuid) {
    let mut store = open_store(store_dir);
    if store.remove(id) {
        println!("deleted {id}");
    } else {
        println!("no feedback with id {id}; nothing removed");
    }
}

async fn run_remote(base_url: &str, command: &RemoteSubcommand) -> Result<(), CliError> {
    let path = match command {
        RemoteSubcommand::List => "/api/feedback".to_owned(),
        RemoteSubcommand::Read { id } => format!("/api/feedback/{id}"),
    };
    let response = reqwest::get(format!("{}{path}", base_url.trim_end_matches('/'))).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerStatus { status: status.as_u16(), path });
    }
    let json: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

// =============================================================================
// RENDERING
// =============================================================================

fn render_timestamp(record: &FeedbackRecord) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    record
        .created_at_time()
        .and_then(|ts| ts.to_offset(UtcOffset::UTC).format(format).ok())
        .unwrap_or_else(|| record.created_at.clone())
}

fn render_record(record: &FeedbackRecord) -> String {
    let comment = if record.comment.is_empty() { "(no comment)" } else { record.comment.as_str() };
    format!(
        "{} / {MAX_RATING}  {}\n  {comment}\n  {}",
        record.rating,
        record.id,
        render_timestamp(record)
    )
}

fn render_list(records: &[FeedbackRecord]) -> String {
    if records.is_empty() {
        return "No feedback yet.".to_owned();
    }
    records.iter().map(render_record).collect::<Vec<_>>().join("\n\n")
}

fn render_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Delivered { attempts: 1, .. } => "synced".to_owned(),
        SyncOutcome::Delivered { attempts, .. } => format!("synced after {attempts} attempts"),
        SyncOutcome::Abandoned { error, .. } => format!("service unreachable ({error}); kept locally"),
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
