//! `snapshelf`: inspect the snapshots recorded in the local backup catalog.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::ResultExt;
use snapshelf_browse::{Browser, CancellationToken, ListFolderRequest, Selector, TimeSelector};
use snapshelf_config::Config;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcDateTime};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "snapshelf", about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity; repeat for more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the root view or the merged contents of folders in one snapshot.
    List(ListArgs),
    /// List every recorded snapshot, most recent first.
    Versions,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Snapshot taken at this time (RFC 3339).
    #[arg(long, value_parser = parse_time, conflicts_with_all = ["from", "until"])]
    time: Option<UtcDateTime>,
    /// Start of a time range (RFC 3339, inclusive).
    #[arg(long, value_parser = parse_time, requires = "until")]
    from: Option<UtcDateTime>,
    /// End of a time range (RFC 3339, inclusive).
    #[arg(long, value_parser = parse_time, requires = "from")]
    until: Option<UtcDateTime>,
    /// Snapshot version; 0 is the most recent.
    #[arg(long)]
    version: Option<u32>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    offset: i64,
    /// Page size; defaults to `listing.default_limit`.
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,
    /// Folders to list; none for the root view.
    folders: Vec<String>,
}
impl ListArgs {
    fn selector(&self) -> Selector {
        let time = match (self.time, self.from, self.until) {
            (Some(at), _, _) => Some(TimeSelector::At(at)),
            (None, Some(from), Some(until)) => Some(TimeSelector::Between(from, until)),
            _ => None,
        };
        Selector { time, version: self.version }
    }
}

fn parse_time(value: &str) -> std::result::Result<UtcDateTime, String> {
    OffsetDateTime::parse(value, &Rfc3339).map(OffsetDateTime::to_utc).map_err(|e| e.to_string())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)
}

async fn run(cli: Cli, token: &CancellationToken) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let browser = Browser::open(&config).await.or_raise(|| ErrorKind::Browse)?;
    match cli.command {
        Command::List(args) => {
            let limit = args.limit.unwrap_or_else(|| i64::from(config.listing.default_limit));
            let request = ListFolderRequest::folders(args.selector(), args.folders, args.offset, limit);
            let page = browser.list_folder(&request, token).await.or_raise(|| ErrorKind::Browse)?;
            print_json(&page)
        },
        Command::Versions => {
            let filesets = browser.filesets(token).await.or_raise(|| ErrorKind::Browse)?;
            print_json(&filesets)
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let token = CancellationToken::new();
    let interrupt = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; cancelling");
                token.cancel();
            }
        }
    });
    let result = run(cli, &token).await;
    interrupt.abort();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}
