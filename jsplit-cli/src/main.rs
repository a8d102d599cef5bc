//! jsplit CLI - Plan parallel partitions over large JSON documents
//!
//! This binary provides command-line interfaces for:
//! - plan: partition input files and print the partition descriptors
//! - stats: collect key statistics used by the speculative strategy

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use jsplit_core::options::keys;
use jsplit_io::{PartitionDescriptor, PartitionOptions, PartitionPlanner, SplitError};
use jsplit_scan::{DocumentStats, ProjectionDfa, SpeculationTable};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jsplit")]
#[command(about = "Parallel JSON partition planner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition input files and print partition descriptors
    ///
    /// Examples:
    ///   jsplit plan data.json --path '$[*]'
    ///   jsplit plan 'logs/*.json' --path '$.entries[*]' --format json
    ///   jsplit plan data.json --strategy speculative --stats stats.json
    Plan {
        /// Input file, directory, or pattern containing '*'
        input: String,
        /// Projection expression driving level skipping
        #[arg(long, default_value = "$[*]")]
        path: String,
        /// Partitioning strategy
        #[arg(long, value_enum, default_value_t = Strategy::Full)]
        strategy: Strategy,
        /// Statistics file (from `jsplit stats`) for the speculative strategy
        #[arg(long)]
        stats: Option<PathBuf>,
        /// Fall back to the exact strategy when speculation is impossible
        #[arg(long)]
        fallback_full_pass: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Table)]
        format: PlanFormat,
        /// Recurse into directories
        #[arg(long)]
        recursive: bool,
        /// Wildcard filter applied to candidate file names
        #[arg(long)]
        glob_filter: Option<String>,
        /// Worker count used to size buckets
        #[arg(long, default_value = "8")]
        parallelism: usize,
        /// Lower bound on bucket size in bytes
        #[arg(long, default_value = "33554432")]
        min_partition_bytes: u64,
        /// Upper bound on bucket size in bytes
        #[arg(long, default_value = "1073741824")]
        max_partition_bytes: u64,
        /// Show a progress spinner while planning
        #[arg(long)]
        progress: bool,
    },
    /// Collect key statistics for the speculative strategy
    ///
    /// Examples:
    ///   jsplit stats data.json --path '$[*].user' --output stats.json
    Stats {
        /// Input file, directory, or pattern containing '*'
        input: String,
        /// Projection expression whose states are recorded per key
        #[arg(long, default_value = "$[*]")]
        path: String,
        /// Output file for the JSON statistics (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Recurse into directories
        #[arg(long)]
        recursive: bool,
        /// Show a progress spinner while scanning
        #[arg(long)]
        progress: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Exact two-phase scan
    Full,
    /// Anchor-key resynchronization
    Speculative,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlanFormat {
    Table,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Plan {
            input,
            path,
            strategy,
            stats,
            fallback_full_pass,
            format,
            recursive,
            glob_filter,
            parallelism,
            min_partition_bytes,
            max_partition_bytes,
            progress,
        } => {
            let options = build_options(
                &input,
                recursive,
                glob_filter.as_deref(),
                parallelism,
                min_partition_bytes,
                max_partition_bytes,
            )?;
            let planner = PartitionPlanner::local(options)?;
            let dfa = ProjectionDfa::compile(&path)?;
            let spinner = progress.then(|| start_spinner("planning partitions"));

            let parts = match strategy {
                Strategy::Full => planner.plan_full_pass(&dfa)?,
                Strategy::Speculative => {
                    match plan_speculative(&planner, &dfa, stats.as_deref()) {
                        Ok(parts) => parts,
                        Err(SplitError::SpeculationImpossible) if fallback_full_pass => {
                            eprintln!("speculation impossible, falling back to full pass");
                            planner.plan_full_pass(&dfa)?
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            };

            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            print_plan(&parts, format)?;
        }
        Commands::Stats {
            input,
            path,
            output,
            recursive,
            progress,
        } => {
            let options = build_options(&input, recursive, None, 8, 1, u64::MAX)?;
            let planner = PartitionPlanner::local(options)?;
            let dfa = ProjectionDfa::compile(&path)?;
            let spinner = progress.then(|| start_spinner("collecting statistics"));

            let stats = planner.collect_stats(&dfa)?;

            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            write_stats(&stats, output.as_deref())?;
            eprintln!(
                "collected statistics for {} distinct keys",
                stats.distinct_keys()
            );
        }
    }
    Ok(())
}

/// Route every setting through the string configuration keys so the CLI and
/// programmatic configuration stay in lockstep.
fn build_options(
    input: &str,
    recursive: bool,
    glob_filter: Option<&str>,
    parallelism: usize,
    min_partition_bytes: u64,
    max_partition_bytes: u64,
) -> Result<PartitionOptions, SplitError> {
    let mut map = HashMap::new();
    map.insert(keys::FILEPATH.to_string(), input.to_string());
    map.insert(keys::RECURSIVE.to_string(), recursive.to_string());
    if let Some(filter) = glob_filter {
        map.insert(keys::PATH_GLOB_FILTER.to_string(), filter.to_string());
    }
    map.insert(keys::PARALLELISM.to_string(), parallelism.to_string());
    map.insert(
        keys::MIN_PARTITION_BYTES.to_string(),
        min_partition_bytes.to_string(),
    );
    map.insert(
        keys::MAX_PARTITION_BYTES.to_string(),
        max_partition_bytes.to_string(),
    );
    PartitionOptions::from_map(&map)
}

fn plan_speculative(
    planner: &PartitionPlanner,
    dfa: &ProjectionDfa,
    stats_path: Option<&std::path::Path>,
) -> Result<Vec<PartitionDescriptor>, SplitError> {
    let stats = match stats_path {
        Some(path) => {
            let file = File::open(path)?;
            serde_json::from_reader(file)
                .map_err(|err| SplitError::InvalidOptions(format!("bad stats file: {err}")))?
        }
        None => {
            // No precomputed statistics: collect them in-process.
            planner.collect_stats(dfa)?
        }
    };
    let table = SpeculationTable::from_stats(&stats)?;
    planner.plan_speculative(&table)
}

fn print_plan(
    parts: &[PartitionDescriptor],
    format: PlanFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match format {
        PlanFormat::Table => {
            writeln!(
                out,
                "{:>4}  {:>12}  {:>12}  {:>12}  {:>5}  {:>5}  {:<8}  path",
                "id", "start", "end", "bytes", "level", "state", "initial"
            )?;
            for part in parts {
                writeln!(
                    out,
                    "{:>4}  {:>12}  {:>12}  {:>12}  {:>5}  {:>5}  {:<8}  {}",
                    part.id,
                    part.start,
                    part.end,
                    part.len(),
                    part.start_level,
                    part.dfa_state,
                    String::from_utf8_lossy(&part.initial_state),
                    part.path,
                )?;
            }
            writeln!(out, "{} partition(s)", parts.len())?;
        }
        PlanFormat::Json => {
            for part in parts {
                let line = serde_json::json!({
                    "id": part.id,
                    "path": part.path.as_ref(),
                    "start": part.start,
                    "end": part.end,
                    "startLevel": part.start_level,
                    "dfaState": part.dfa_state,
                    "initialState": String::from_utf8_lossy(&part.initial_state),
                });
                writeln!(out, "{line}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn write_stats(
    stats: &DocumentStats,
    output: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), stats)?;
        }
        None => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), stats)?;
            println!();
        }
    }
    Ok(())
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
