//! Input events, decision timelines, collection dumps and the run report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use digitizer::{DigitizedEvent, EventSignals};
use trigger_model::CollectionSnapshot;

use crate::metrics::RunMetrics;
use crate::pipeline::{EventOutcome, EventResult};

/// Read a JSON array of `{event_id, calo_signals, tracker_signals}` records.
pub fn read_events(path: &Path) -> Result<Vec<EventSignals>> {
    let file = File::open(path).with_context(|| format!("Failed to open input {:?}", path))?;
    let events: Vec<EventSignals> =
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Invalid event file {:?}", path))?;
    Ok(events)
}

/// Write the per-event decision timelines as pretty JSON.
pub fn write_results(path: &Path, results: &[EventResult]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results).context("Failed to serialize decisions")?;
    writer.flush()?;
    Ok(())
}

/// Inspection form of one event's locked collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    pub event_id: u64,
    pub calo_tps: CollectionSnapshot,
    pub calo_ctws: CollectionSnapshot,
    pub geiger_tps: CollectionSnapshot,
    pub geiger_ctws: CollectionSnapshot,
}

impl From<&DigitizedEvent> for CollectionDump {
    fn from(event: &DigitizedEvent) -> Self {
        Self {
            event_id: event.event_id,
            calo_tps: event.calo_tps.snapshot(),
            calo_ctws: event.calo_ctws.snapshot(),
            geiger_tps: event.geiger_tps.snapshot(),
            geiger_ctws: event.geiger_ctws.snapshot(),
        }
    }
}

/// Write the collections of every processed event with bincode.
pub fn write_dump(path: &Path, results: &[EventResult]) -> Result<usize> {
    let dumps: Vec<CollectionDump> =
        results.iter().filter_map(|r| r.collections.as_ref()).map(CollectionDump::from).collect();
    let file = File::create(path).with_context(|| format!("Failed to create dump {:?}", path))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &dumps).context("Failed to serialize collections")?;
    writer.flush()?;
    Ok(dumps.len())
}

pub fn read_dump(path: &Path) -> Result<Vec<CollectionDump>> {
    let file = File::open(path).with_context(|| format!("Failed to open dump {:?}", path))?;
    bincode::deserialize_from(BufReader::new(file)).context("Invalid collection dump")
}

/// Summary of one `run` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input: PathBuf,
    pub threads: usize,
    pub metrics: RunMetrics,
    pub outcomes: Vec<(u64, EventOutcome)>,
}

impl RunReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write run report {:?}", path))?;
        Ok(())
    }
}

/// Report path next to the output: `out.json` -> `out.report.json`
pub fn report_path(output: &Path) -> PathBuf {
    output.with_extension("report.json")
}
