//! Slow-call reports and the sinks that receive them
//!
//! The recorder assembles a [`SlowCallReport`] when a call meets its threshold
//! and hands it to a [`ReportSink`]. Presentation belongs to the sink.

use crate::call_id::CallId;
use crate::stack_unwind::StackFrame;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// Log target used by [`TracingSink`]
pub const SLOW_CALL_TARGET: &str = "callcost::slow_call";

const BANNER: &str = "================callcost================";

/// Data emitted when a call's elapsed time meets or exceeds its threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowCallReport {
    pub call_id: CallId,
    /// Name of the thread that ran `end`
    pub thread_name: String,
    /// Threshold as supplied by the caller
    pub threshold: u64,
    /// Elapsed time in the clock's milliseconds
    pub elapsed: u64,
    /// Application frames of the reporting thread, innermost first
    pub stack: Vec<StackFrame>,
}

impl fmt::Display for SlowCallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{BANNER}")?;
        write!(
            f,
            "\t methodName===>{}  threadName==>{}  thresholdTime===>{}   costTime===>{}",
            self.call_id, self.thread_name, self.threshold, self.elapsed
        )?;
        for frame in &self.stack {
            write!(f, "\n\tat {frame}")?;
        }
        Ok(())
    }
}

/// Output format for rendered reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// One JSON object per report
    Json,
}

/// Render a report in the original log layout
pub fn render_text(report: &SlowCallReport) -> String {
    report.to_string()
}

/// Render a report as a single-line JSON object
pub fn render_json(report: &SlowCallReport) -> serde_json::Result<String> {
    serde_json::to_string(report)
}

/// Render a report in the requested format
pub fn render(report: &SlowCallReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
    }
}

/// Receiver of slow-call reports
pub trait ReportSink: Send + Sync {
    fn report(&self, report: &SlowCallReport);
}

/// Sink that logs every report through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, report: &SlowCallReport) {
        tracing::info!(target: SLOW_CALL_TARGET, "{BANNER}");
        tracing::info!(
            target: SLOW_CALL_TARGET,
            call_id = %report.call_id,
            thread = %report.thread_name,
            threshold = report.threshold,
            elapsed = report.elapsed,
            "slow call"
        );
        for frame in &report.stack {
            tracing::info!(target: SLOW_CALL_TARGET, "\tat {frame}");
        }
    }
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<SlowCallReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected reports, in arrival order
    pub fn reports(&self) -> Vec<SlowCallReport> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SlowCallReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportSink for MemorySink {
    fn report(&self, report: &SlowCallReport) {
        self.lock().push(report.clone());
    }
}

/// Aggregated slow-call statistics for one call identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlowCallStats {
    /// Number of slow calls reported
    pub count: u64,
    /// Sum of elapsed times
    pub total_elapsed: u64,
    /// Largest single elapsed time
    pub max_elapsed: u64,
}

/// Sink that aggregates reports per call identifier
#[derive(Debug, Default)]
pub struct SummarySink {
    stats: Mutex<HashMap<CallId, SlowCallStats>>,
}

impl SummarySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for one call identifier
    pub fn stats(&self, call_id: &str) -> Option<SlowCallStats> {
        self.lock().get(call_id).copied()
    }

    /// All entries sorted by total elapsed time (descending)
    pub fn sorted(&self) -> Vec<(CallId, SlowCallStats)> {
        let mut sorted: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, stats)| (id.clone(), *stats))
            .collect();
        sorted.sort_by(|a, b| {
            b.1.total_elapsed
                .cmp(&a.1.total_elapsed)
                .then_with(|| a.0.cmp(&b.0))
        });
        sorted
    }

    /// Render the summary table
    pub fn render_summary(&self) -> String {
        let sorted = self.sorted();
        if sorted.is_empty() {
            return "No slow calls recorded.".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "Slow Call Summary (sorted by total elapsed)");
        let _ = writeln!(
            out,
            "{:<50} {:>8} {:>12} {:>10} {:>10}",
            "Call", "Count", "Total", "Avg", "Max"
        );
        let _ = writeln!(out, "{}", "─".repeat(94));
        for (call_id, stats) in sorted {
            let avg = if stats.count > 0 {
                stats.total_elapsed / stats.count
            } else {
                0
            };
            let _ = writeln!(
                out,
                "{:<50} {:>8} {:>12} {:>10} {:>10}",
                call_id.as_str(),
                stats.count,
                stats.total_elapsed,
                avg,
                stats.max_elapsed
            );
        }
        let _ = write!(out, "{}", "─".repeat(94));
        out
    }

    /// Print the summary table to stderr
    pub fn print_summary(&self) {
        eprintln!("\n{}", self.render_summary());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CallId, SlowCallStats>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportSink for SummarySink {
    fn report(&self, report: &SlowCallReport) {
        let mut stats = self.lock();
        let entry = stats.entry(report.call_id.clone()).or_default();
        entry.count = entry.count.saturating_add(1);
        entry.total_elapsed = entry.total_elapsed.saturating_add(report.elapsed);
        entry.max_elapsed = entry.max_elapsed.max(report.elapsed);
    }
}
