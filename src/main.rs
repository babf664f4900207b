//! duscope - disk usage scanner.
//!
//! Usage:
//!   duscope scan [PATH]      Scan and show a sorted size tree
//!   duscope export [PATH]    Scan and export the final job snapshot as JSON
//!   duscope --help           Show help

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use duscope_core::{DEFAULT_MAX_DEPTH, Node, ScanConfig, TreeStats};
use duscope_jobs::{JobManager, JobSnapshot, JobState};

/// How often the terminal progress line is refreshed.
const PROGRESS_REFRESH: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(
    name = "duscope",
    version,
    about = "Find out where your disk space goes",
    long_about = "duscope walks a directory tree in a background job and reports \
                  the size of every file and directory, largest first."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a path and show a size tree
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Maximum depth to display
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Number of top entries to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Scan a path and export the job snapshot as JSON
    Export {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Path to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Directories deeper than this are not descended into
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Include hidden files and directories
    #[arg(short = 'a', long)]
    include_hidden: bool,

    /// Cancel the scan after this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,
}

impl ScanArgs {
    fn to_config(&self) -> Result<ScanConfig> {
        ScanConfig::builder()
            .root(self.path.clone())
            .max_depth(self.max_depth)
            .follow_symlinks(self.follow_symlinks)
            .exclude_hidden(!self.include_hidden)
            .build()
            .context("Invalid scan options")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let manager = JobManager::new();

    match cli.command {
        Command::Scan { scan, depth, top } => {
            let snapshot = run_job(&manager, &scan, true).await?;
            print_report(&snapshot, depth, top)?;
        }
        Command::Export { scan, output } => {
            let snapshot = run_job(&manager, &scan, false).await?;
            let json = serde_json::to_string_pretty(&snapshot)?;

            match output {
                Some(output_path) => {
                    std::fs::write(&output_path, json)?;
                    eprintln!("Exported to {}", output_path.display());
                }
                None => {
                    println!("{}", json);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Start a job, poll it to completion and return the final snapshot.
async fn run_job(manager: &JobManager, args: &ScanArgs, show_progress: bool) -> Result<JobSnapshot> {
    let config = args.to_config()?;
    let id = manager.start_checked(config).context("Invalid path")?;
    let deadline = args
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut canceled = false;

    eprintln!("Scanning {}...", args.path.display());

    let snapshot = loop {
        let snapshot = manager
            .status(&id)
            .ok_or_else(|| eyre!("Job {id} disappeared"))?;
        if snapshot.state.is_terminal() {
            break snapshot;
        }

        if show_progress {
            eprint!(
                "\r\x1b[K {} files, {}  {}",
                snapshot.files,
                format_size(snapshot.bytes),
                truncate(&snapshot.current, 60)
            );
            let _ = std::io::stderr().flush();
        }

        if !canceled && deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(job_id = %id, "Timeout reached, canceling scan");
            manager.cancel(&id);
            canceled = true;
        }

        tokio::time::sleep(PROGRESS_REFRESH).await;
    };

    if show_progress {
        eprint!("\r\x1b[K");
    }

    match snapshot.state {
        JobState::Error => Err(eyre!(
            "Scan failed: {}",
            snapshot.error.as_deref().unwrap_or("unknown error")
        )),
        _ => Ok(snapshot),
    }
}

/// Print the summary and size tree of a finished job.
fn print_report(snapshot: &JobSnapshot, max_depth: u32, top_n: usize) -> Result<()> {
    let elapsed = snapshot
        .finished_at
        .map(|f| (f - snapshot.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();

    let Some(root) = &snapshot.result else {
        println!(
            "Scan {} after {} files ({}) in {:.2}s",
            snapshot.state,
            snapshot.files,
            format_size(snapshot.bytes),
            elapsed
        );
        return Ok(());
    };

    let stats = TreeStats::from_node(root);

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", root.path, format_size(stats.total_size));
    println!(
        " {} files, {} directories",
        stats.total_files, stats.total_dirs
    );
    println!(" Scanned in {:.2}s", elapsed);
    println!("{}", "─".repeat(60));
    println!();

    print_node(root, 0, max_depth, top_n, root.size);

    if stats.has_notes() {
        println!();
        for (note, count) in &stats.notes {
            println!("{count} node(s) marked {note}");
        }
    }

    Ok(())
}

/// Print a node and its children.
fn print_node(node: &Node, depth: u32, max_depth: u32, top_n: usize, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size as f64 / root_size as f64 * 100.0
    } else {
        0.0
    };

    let bar = make_bar(ratio / 100.0, 10);

    let name = if depth == 0 {
        node.path.clone()
    } else {
        node.name.to_string()
    };

    let dir_marker = if node.is_dir() { "/" } else { "" };
    let note = node
        .note
        .map(|n| format!(" ({n})"))
        .unwrap_or_default();

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}{}",
        indent,
        if node.is_dir() { "▼ " } else { "  " },
        truncate(&format!("{}{}", name, dir_marker), 40),
        format_size(node.size),
        ratio,
        bar,
        note
    );

    if node.is_dir() && depth < max_depth {
        let children_to_show = node.children().iter().take(top_n);
        let remaining = node.child_count().saturating_sub(top_n);

        for child in children_to_show {
            print_node(child, depth + 1, max_depth, top_n, root_size);
        }

        if remaining > 0 {
            let indent = "  ".repeat((depth + 1) as usize);
            println!("{}  ... and {} more", indent, remaining);
        }
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
