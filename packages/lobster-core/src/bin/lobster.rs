//! Heap dump analysis tool
//!
//! Parses an HPROF dump, optionally diffs it against a baseline dump, and
//! serves the query pages over HTTP. `--json` prints the heap histogram to
//! stdout instead of starting a server.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use lobster_core::errors::Result;
use lobster_core::parser::parse_file;
use lobster_core::query::{histogram_entries, HistoSort};
use lobster_core::snapshot::{ReachableExcludes, Snapshot};

#[derive(Parser, Debug)]
#[command(name = "lobster", version, about = "Browse the object graph of a heap dump")]
struct Args {
    /// HPROF heap dump file
    dump: PathBuf,

    /// Port to serve queries on
    #[arg(short, long, default_value_t = 7000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Baseline dump; objects absent from it are marked new
    #[arg(short, long)]
    baseline: Option<PathBuf>,

    /// File of fields (Class.field per line) to skip in reachability walks
    #[arg(short, long)]
    exclude: Option<PathBuf>,

    /// Skip reference graph computation (faster load, fewer queries)
    #[arg(long)]
    no_refs: bool,

    /// Parse and resolve, report totals, then exit
    #[arg(long)]
    parse_only: bool,

    /// Print the heap histogram as JSON and exit
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "lobster_core=info,lobster=info",
        1 => "lobster_core=debug,lobster=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_snapshot(args: &Args) -> Result<Snapshot> {
    let mut snapshot = parse_file(&args.dump)?;
    snapshot.resolve(!args.no_refs)?;

    if let Some(exclude) = &args.exclude {
        let excludes = ReachableExcludes::from_path(exclude)?;
        info!(fields = excludes.len(), "loaded exclude list");
        snapshot.set_excludes(excludes);
    }

    if let Some(baseline_path) = &args.baseline {
        info!(path = %baseline_path.display(), "loading baseline dump");
        let mut baseline = parse_file(baseline_path)?;
        // the baseline only needs types and ids, never its references
        baseline.resolve(false)?;
        snapshot.mark_new_relative_to(&baseline);
    }

    Ok(snapshot)
}

async fn run(args: Args) -> Result<()> {
    let snapshot = load_snapshot(&args)?;

    if args.json {
        let entries = histogram_entries(&snapshot, HistoSort::Size);
        let json = serde_json::to_string_pretty(&entries)?;
        println!("{}", json);
        return Ok(());
    }
    if args.parse_only {
        println!("{:>10} {:>12}  class", "count", "bytes");
        for entry in histogram_entries(&snapshot, HistoSort::Size) {
            println!("{:>10} {:>12}  {}", entry.count, entry.total_size, entry.class);
        }
        info!(
            classes = snapshot.class_count(),
            things = snapshot.object_count(),
            roots = snapshot.roots().len(),
            "parse complete"
        );
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse().map_err(|e| {
        lobster_core::errors::LobsterError::config(format!(
            "bad listen address {}:{}: {}",
            args.host, args.port, e
        ))
    })?;
    lobster_core::server::serve(Arc::new(snapshot), addr).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
