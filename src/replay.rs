//! Offline replay of recorded begin/end event logs
//!
//! An event log is JSON Lines, one event per line:
//!
//! ```text
//! {"at": 0,  "op": "begin", "call_id": "App&onCreate", "subject": "application_lifecycle"}
//! {"at": 42, "op": "end",   "call_id": "App&onCreate", "threshold": 16, "subject": "application_lifecycle"}
//! ```
//!
//! Events are fed in file order through a recorder whose clock is set to each
//! event's `at` timestamp, so elapsed times are exactly the log's deltas.
//! Stacks are not captured: the replaying thread's stack says nothing about
//! the recorded program.

use crate::call_id::SubjectKind;
use crate::clock::ManualClock;
use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};
use crate::recorder::CallTimingRecorder;
use crate::report::{ReportSink, SlowCallReport};
use crate::stack_unwind::NoopInspector;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

/// Recorder operation in an event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayOp {
    Begin,
    End,
}

/// One recorded recorder call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Clock reading in milliseconds
    pub at: u64,
    pub op: ReplayOp,
    pub call_id: String,
    /// Falls back to the configured default threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    #[serde(default)]
    pub subject: SubjectKind,
}

/// Result of replaying an event log
#[derive(Debug, Clone, Default)]
pub struct ReplayOutcome {
    /// Reports produced, in event order
    pub reports: Vec<SlowCallReport>,
    /// Number of events replayed
    pub events: usize,
    /// Identifiers still pending after the last event
    pub unmatched: usize,
}

/// Parse a JSON Lines event log, skipping blank lines
pub fn parse_events(reader: impl BufRead) -> Result<Vec<ReplayEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| RecorderError::ReplayParse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Feed events through a fresh recorder
pub fn replay(
    events: impl IntoIterator<Item = ReplayEvent>,
    config: &RecorderConfig,
    sink: Arc<dyn ReportSink>,
) -> ReplayOutcome {
    let clock = Arc::new(ManualClock::new(0));
    let recorder = CallTimingRecorder::builder()
        .clock(clock.clone())
        .sink(sink)
        .inspector(Arc::new(NoopInspector))
        .enabled(config.enabled)
        .capture_stack(false)
        .build();

    let mut outcome = ReplayOutcome::default();
    for event in events {
        outcome.events += 1;
        clock.set(event.at);
        match event.op {
            ReplayOp::Begin => recorder.begin(&event.call_id, event.subject),
            ReplayOp::End => {
                let threshold = event.threshold.unwrap_or(config.default_threshold);
                if let Some(report) = recorder.end(&event.call_id, threshold, event.subject) {
                    outcome.reports.push(report);
                }
            }
        }
    }
    outcome.unmatched = recorder.pending_count();
    tracing::debug!(
        events = outcome.events,
        reports = outcome.reports.len(),
        unmatched = outcome.unmatched,
        "replay finished"
    );
    outcome
}

/// Parse and replay an event log file
pub fn replay_file(
    path: impl AsRef<Path>,
    config: &RecorderConfig,
    sink: Arc<dyn ReportSink>,
) -> Result<ReplayOutcome> {
    let file = std::fs::File::open(path.as_ref())?;
    let events = parse_events(std::io::BufReader::new(file))?;
    Ok(replay(events, config, sink))
}
