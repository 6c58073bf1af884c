use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Instant;

use typedeps::core::package::DEFAULT_SENTINEL;
use typedeps::core::{AnalyzerOptions, DependencyAnalyzer, PackageOutcome};
use typedeps::formatters::EdgeListFormatter;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "typedeps",
    version,
    about = "Extract cross-package type dependencies from a declaration repository"
)]
struct Cli {
    /// Repository root containing the package folder
    #[arg(short, long, value_name = "PATH")]
    root: PathBuf,

    /// Name of the folder whose children are packages
    #[arg(long, value_name = "NAME", default_value = DEFAULT_SENTINEL)]
    sentinel: String,

    /// Only analyze these packages (repeatable or comma-separated)
    #[arg(short, long, value_name = "NAME", value_delimiter = ',')]
    package: Vec<String>,

    /// Number of packages analyzed concurrently
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    jobs: usize,

    /// Emit each distinct edge once per package
    #[arg(long)]
    dedupe: bool,

    /// Write edges to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        root,
        sentinel,
        package,
        jobs,
        dedupe,
        output,
        ..
    } = cli;

    let start_time = Instant::now();

    let packages: Vec<String> = package
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let options = AnalyzerOptions::default()
        .with_sentinel(sentinel)
        .with_jobs(jobs)
        .with_dedupe(dedupe)
        .with_packages(packages);
    let analyzer = DependencyAnalyzer::new(options);
    let cancel = analyzer.cancellation_flag();

    let out: Box<dyn Write + Send> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    let mut out = BufWriter::new(out);
    let formatter = EdgeListFormatter::new();
    let mut write_error: Option<anyhow::Error> = None;

    let stats = analyzer.analyze_streaming(&root, |outcome| {
        if write_error.is_some() {
            return;
        }
        let written = match &outcome {
            PackageOutcome::Analyzed { edges, .. } => formatter
                .write_edges(&mut out, edges)
                .and_then(|()| out.flush().map_err(Into::into)),
            PackageOutcome::Failed { package, .. } => {
                formatter.write_failure(&mut io::stderr().lock(), package)
            }
        };
        if let Err(err) = written {
            write_error = Some(err);
            cancel.store(true, Ordering::Relaxed);
        }
    })?;

    if let Some(err) = write_error {
        return Err(err.context("failed to write edges"));
    }
    out.flush()?;

    log::info!(
        "{} packages analyzed, {} failed, {} edges in {:.2}s",
        stats.analyzed,
        stats.failed,
        stats.edges,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
