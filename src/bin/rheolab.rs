use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rheolab::prompt::Prompter;
use rheolab::{
    analysis::TimeSweepResult, analyze_sample, append_results, append_sample, capture_sample,
    capture_tests, capture_time_window, create_database, create_sample_report, run_cohort_analysis,
    sample_columns, stat_columns, ExistingFile, ExperimentExport, LabConfig, TimeWindow,
};

#[derive(Parser, Debug)]
#[command(name = "rheolab", version, about = "Synovial fluid rheology workflow")]
struct Cli {
    /// TOML configuration (defaults are used when the file does not exist)
    #[arg(short, long, global = true, default_value = "rheolab.toml")]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty sample or statistical database
    InitDb {
        #[arg(value_enum)]
        kind: DatabaseKind,
        /// What to do when the file already exists
        #[arg(long, value_enum, default_value_t = Policy::Abort)]
        if_exists: Policy,
    },
    /// Describe a new sample and its tests at the console
    AddSample,
    /// Analyse the export of one sample and print the results
    Analyze {
        /// Sample number (S<number>)
        number: u32,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Analyse samples from S<from> onward into the statistical database
    AppendResults {
        #[arg(long)]
        from: u32,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Write the report of one sample
    Report {
        number: u32,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Cohort statistics over the statistical database
    Cohort,
    /// Print the effective configuration
    PrintConfig,
}

#[derive(clap::Args, Debug)]
struct WindowArgs {
    /// Time sweep window start (min); prompted when neither bound is given
    #[arg(long)]
    start: Option<f64>,
    /// Time sweep window end (min)
    #[arg(long)]
    finish: Option<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DatabaseKind {
    Sample,
    Stat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Policy {
    Replace,
    Unique,
    Abort,
}

impl From<Policy> for ExistingFile {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Replace => ExistingFile::Replace,
            Policy::Unique => ExistingFile::AddUnique,
            Policy::Abort => ExistingFile::Abort,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "rheolab=debug" } else { "rheolab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<LabConfig> {
    if path.exists() {
        LabConfig::from_file(path).with_context(|| format!("reading {}", path.display()))
    } else {
        warn!(path = %path.display(), "configuration not found, using defaults");
        Ok(LabConfig::default())
    }
}

/// Window from the command line, or asked at the console
fn resolve_window<R: BufRead, W: Write>(
    args: &WindowArgs,
    default: TimeWindow,
    last_time: Option<f64>,
    prompter: &mut Prompter<R, W>,
) -> Result<TimeWindow> {
    match (args.start, args.finish) {
        (None, None) => Ok(capture_time_window(prompter, default, last_time)?),
        (start, finish) => Ok(TimeWindow::new(
            start.unwrap_or(default.start_min()),
            finish.or(last_time).unwrap_or(default.finish_min()),
        )?),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli.config)?;
    let paths = &config.paths;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    match cli.command {
        Command::InitDb { kind, if_exists } => {
            let written = match kind {
                DatabaseKind::Sample => create_database(&paths.sample_database, &sample_columns(), if_exists.into()),
                DatabaseKind::Stat => create_database(&paths.stat_database, &stat_columns(), if_exists.into()),
            }
            .context("creating database")?;
            println!("Database created: {}", written.display());
        }

        Command::AddSample => {
            let sample = capture_sample(&mut prompter)?;
            let tests = capture_tests(&mut prompter, &sample)?;
            append_sample(&paths.sample_database, &sample, &tests)
                .with_context(|| format!("writing {}", paths.sample_database.display()))?;
            info!(sample = %sample.id(), tests = tests.len(), "sample stored");
        }

        Command::Analyze { number, window } => {
            let sid = rheolab::records::sample_id(number);
            let export = ExperimentExport::load(&paths.experiment_dir, &sid)
                .with_context(|| format!("loading the export of {}", sid))?;
            let last_time = if export.has_time_sweep() {
                TimeSweepResult::last_time(&export.time_sweep()?)
            } else {
                None
            };
            let window = resolve_window(&window, config.analysis.window()?, last_time, &mut prompter)?;
            let analysis = analyze_sample(&export, window, &config.analysis.targets())?;
            analysis.print_summary();
        }

        Command::AppendResults { from, window } => {
            let window = resolve_window(&window, config.analysis.window()?, None, &mut prompter)?;
            let records = append_results(
                &paths.sample_database,
                &paths.experiment_dir,
                &paths.stat_database,
                from,
                window,
                &config.analysis.targets(),
            )
            .context("appending results")?;
            println!("{} rows appended to {}", records.len(), paths.stat_database.display());
        }

        Command::Report { number, window } => {
            let window = resolve_window(&window, config.analysis.window()?, None, &mut prompter)?;
            let date = Local::now().date_naive();
            let output = create_sample_report(&config, number, window, date).context("creating report")?;
            println!("Report: {}", output.html.display());
            if let Some(pdf) = output.pdf {
                println!("PDF:    {}", pdf.display());
            }
        }

        Command::Cohort => {
            if !paths.stat_database.exists() {
                bail!("statistical database not found: {}", paths.stat_database.display());
            }
            let summary = run_cohort_analysis(&config).context("cohort analysis")?;
            println!(
                "\n{} comparisons, {} biomarkers written to {}",
                summary.comparisons.len(),
                summary.biomarkers.len(),
                paths.cohort_dir.display()
            );
        }

        Command::PrintConfig => config.print_summary(),
    }

    Ok(())
}
