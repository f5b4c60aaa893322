//! # Command Line Interface
//!
//! `trigger-emu run` drives a batch of events through the trigger chain;
//! `layout` and `memories` inspect the static tracker tables.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use tracker_trigger::{layout_report, TrackerMemories};

use crate::config::{load_config, EmulatorConfig};
use crate::io::{read_events, report_path, write_dump, write_results, RunReport};
use crate::pipeline::{run_parallel, Emulator};

/// Trigger emulator for recorded detector signals
#[derive(Parser)]
#[command(name = "trigger-emu")]
#[command(about = "Calorimeter and tracker trigger emulation", version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Digitize and trigger every event of an input file
    Run {
        /// JSON array of event signal records
        #[arg(short, long)]
        input: PathBuf,

        /// Decision timelines; a run report is written next to it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads, overrides `run.threads`
        #[arg(short, long)]
        threads: Option<usize>,

        /// Bincode dump of the locked collections of each processed event
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Print the zone and sliding zone row layout
    Layout,
    /// Store the lookup memories selected by the configuration
    Memories {
        /// Directory receiving one `.mem` file per memory
        #[arg(long)]
        out_dir: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Configuration file named on the command line, if any
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Commands::Run { config, .. } | Commands::Memories { config, .. } => config.as_deref(),
            Commands::Layout => None,
        }
    }
}

/// Summary printed at the end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub aborted: u64,
    pub triggered: u64,
}

/// CLI handler
pub struct CliHandler {
    config: EmulatorConfig,
}

impl CliHandler {
    pub fn new(config: EmulatorConfig) -> Self {
        Self { config }
    }

    /// Load the configuration named by the command, or the defaults
    pub fn from_command(command: &Commands) -> Result<Self> {
        Ok(Self::new(load_config(command.config_path())?))
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Handle CLI commands
    pub fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Run { input, output, threads, dump, .. } => {
                let summary = self.run(&input, output.as_deref(), threads, dump.as_deref())?;
                println!(
                    "{} events processed, {} aborted, {} triggered",
                    summary.processed, summary.aborted, summary.triggered
                );
            }
            Commands::Layout => print!("{}", layout_report()),
            Commands::Memories { out_dir, .. } => {
                for path in self.store_memories(&out_dir)? {
                    println!("{}", path.display());
                }
            }
        }
        Ok(())
    }

    pub fn run(
        &self,
        input: &Path,
        output: Option<&Path>,
        threads: Option<usize>,
        dump: Option<&Path>,
    ) -> Result<RunSummary> {
        let started_at = Utc::now();
        let events = read_events(input)?;
        info!("Loaded {} events from {:?}", events.len(), input);

        let emulator = Emulator::new(&self.config).context("Failed to initialize the emulator")?;
        let threads = threads.unwrap_or_else(|| self.config.run.worker_threads()).max(1);
        let results = run_parallel(&emulator, &events, threads, dump.is_some(), self.config.run.progress_every)?;

        if let Some(path) = dump {
            let dumped = write_dump(path, &results)?;
            info!("Dumped the collections of {} events to {:?}", dumped, path);
        }

        let metrics = emulator.metrics().snapshot();
        info!(
            "Run finished in {} ms: {} processed, {} aborted, {} positive decisions",
            metrics.wall_time_ms, metrics.events_processed, metrics.events_aborted, metrics.positive_decisions
        );
        let summary = RunSummary {
            processed: results.len(),
            aborted: metrics.events_aborted,
            triggered: metrics.events_triggered,
        };

        if let Some(path) = output {
            write_results(path, &results)?;
            let report = RunReport {
                started_at,
                finished_at: Utc::now(),
                input: input.to_path_buf(),
                threads,
                metrics,
                outcomes: emulator.outcomes(),
            };
            report.write(&report_path(path))?;
            info!("Decisions written to {:?}", path);
        }
        Ok(summary)
    }

    pub fn store_memories(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let memories = TrackerMemories::from_config(&self.config.tracker)?;
        let written = memories.store_all(out_dir).with_context(|| format!("Failed to store memories in {:?}", out_dir))?;
        info!("Stored {} lookup memories in {:?}", written.len(), out_dir);
        Ok(written)
    }
}
