//! Call-timing recorder
//!
//! [`CallTimingRecorder`] is driven by an external instrumentation layer that
//! calls [`begin`](CallTimingRecorder::begin) and [`end`](CallTimingRecorder::end)
//! around every instrumented call site:
//!
//! ```text
//! recorder.begin("com.example.Feed&load", SubjectKind::None);
//! /* original method body */
//! recorder.end("com.example.Feed&load", 16, SubjectKind::None);
//! ```
//!
//! The recorder keeps one start timestamp per call identifier. `end` removes
//! it, and when the elapsed time meets the threshold, captures the current
//! thread's stack and hands a [`SlowCallReport`] to the configured sink.
//!
//! # Reentrancy
//!
//! Identifiers are not a stack. A second `begin` for an identifier that is
//! still pending overwrites the first timestamp, so recursive or concurrently
//! reentrant calls sharing an identifier pair with whichever `begin` ran last.
//! The overwrite is logged at `debug` level.
//!
//! # Fault isolation
//!
//! Neither operation panics or returns an error to the instrumented program.
//! Poisoned locks and panicking clocks, inspectors or sinks are logged at
//! `warn` and the operation degrades to "no report". Phase signals are
//! fire-and-forget: a panicking lifecycle collector is logged and the call is
//! still timed and reported.

use crate::call_id::{CallId, SubjectKind};
use crate::clock::{Clock, MonotonicClock};
use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};
use crate::lifecycle::{self, LifecycleCollector, LifecyclePhase, NoopLifecycle};
use crate::report::{ReportSink, SlowCallReport, TracingSink};
use crate::stack_unwind::{filter_frames, BacktraceInspector, StackInspector};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Thread name used in reports when the reporting thread has none
pub const UNNAMED_THREAD: &str = "<unnamed>";

/// Run a collaborator call, turning a panic into an error
fn guarded<R>(what: &'static str, f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|_| RecorderError::CollaboratorPanicked { what })
}

/// Deliver a phase signal; a collector failure is logged and the operation goes on
fn signal_phase(call_id: &str, f: impl FnOnce()) {
    if let Err(err) = guarded("lifecycle collector", f) {
        tracing::warn!(call_id, error = %err, "phase signal failed; continuing");
    }
}

/// Concurrent-safe registry of in-flight call start timestamps
pub struct CallTimingRecorder<C: Clock = MonotonicClock> {
    clock: C,
    /// Single lock shared by `begin` and `end`
    timestamps: Mutex<HashMap<CallId, u64>>,
    lifecycle: Arc<dyn LifecycleCollector>,
    sink: Arc<dyn ReportSink>,
    inspector: Arc<dyn StackInspector>,
    enabled: bool,
    capture_stack: bool,
}

impl CallTimingRecorder<MonotonicClock> {
    /// Recorder with a monotonic clock, tracing sink and backtrace inspector
    pub fn new() -> Self {
        RecorderBuilder::new().build()
    }

    pub fn builder() -> RecorderBuilder<MonotonicClock> {
        RecorderBuilder::new()
    }

    /// Recorder with defaults adjusted by `config`
    pub fn from_config(config: &RecorderConfig) -> Self {
        RecorderBuilder::new().config(config).build()
    }
}

impl Default for CallTimingRecorder<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> CallTimingRecorder<C> {
    /// Record the start of an instrumented call
    ///
    /// Overwrites any pending timestamp for the same identifier. For
    /// application subjects, `onCreate` and `attachBaseContext` also signal the
    /// start of the matching launch phase.
    pub fn begin(&self, call_id: &str, kind: SubjectKind) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.try_begin(call_id, kind) {
            tracing::warn!(call_id, error = %err, "begin failed; instrumentation fault suppressed");
        }
    }

    /// Record the end of an instrumented call
    ///
    /// Returns the report when the elapsed time (clock milliseconds) is
    /// greater than or equal to `threshold`. The threshold is compared as
    /// supplied, without unit conversion. An `end` with no pending `begin` is a
    /// no-op.
    pub fn end(&self, call_id: &str, threshold: u64, kind: SubjectKind) -> Option<SlowCallReport> {
        if !self.enabled {
            return None;
        }
        match self.try_end(call_id, threshold, kind) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(call_id, error = %err, "end failed; instrumentation fault suppressed");
                None
            }
        }
    }

    /// `begin` for a static function
    pub fn begin_static(&self, call_id: &str) {
        self.begin(call_id, SubjectKind::None);
    }

    /// `end` for a static function
    pub fn end_static(&self, call_id: &str, threshold: u64) -> Option<SlowCallReport> {
        self.end(call_id, threshold, SubjectKind::None)
    }

    /// Run `f` between `begin` and `end`
    pub fn time<R>(
        &self,
        call_id: &str,
        threshold: u64,
        kind: SubjectKind,
        f: impl FnOnce() -> R,
    ) -> (R, Option<SlowCallReport>) {
        self.begin(call_id, kind);
        let result = f();
        let report = self.end(call_id, threshold, kind);
        (result, report)
    }

    /// Whether `call_id` has a pending start timestamp
    pub fn is_pending(&self, call_id: &str) -> bool {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(call_id)
    }

    /// Number of pending call identifiers
    pub fn pending_count(&self) -> usize {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn try_begin(&self, call_id: &str, kind: SubjectKind) -> Result<()> {
        let now = guarded("clock", || self.clock.now_millis())?;
        let id = CallId::from(call_id);
        let phase = LifecyclePhase::from_call(&id, kind);

        {
            let mut timestamps = self
                .timestamps
                .lock()
                .map_err(|_| RecorderError::LockPoisoned)?;
            if let Some(previous) = timestamps.insert(id, now) {
                tracing::debug!(
                    call_id,
                    previous,
                    now,
                    "call already pending; start timestamp overwritten"
                );
            }
        }

        if let Some(phase) = phase {
            signal_phase(call_id, || {
                lifecycle::notify_start(self.lifecycle.as_ref(), phase)
            });
        }
        Ok(())
    }

    fn try_end(&self, call_id: &str, threshold: u64, kind: SubjectKind) -> Result<Option<SlowCallReport>> {
        // Check, remove and compare under one critical section so a pending
        // entry is consumed by exactly one `end`.
        let (elapsed, slow) = {
            let mut timestamps = self
                .timestamps
                .lock()
                .map_err(|_| RecorderError::LockPoisoned)?;
            let Some(&start) = timestamps.get(call_id) else {
                return Ok(None);
            };
            let now = guarded("clock", || self.clock.now_millis())?;
            timestamps.remove(call_id);
            let elapsed = now.saturating_sub(start);
            (elapsed, elapsed >= threshold)
        };

        if let Some(phase) = LifecyclePhase::from_call(&CallId::from(call_id), kind) {
            signal_phase(call_id, || {
                lifecycle::notify_end(self.lifecycle.as_ref(), phase)
            });
        }

        if !slow {
            return Ok(None);
        }

        let stack = if self.capture_stack {
            filter_frames(guarded("stack inspector", || self.inspector.capture())?)
        } else {
            Vec::new()
        };
        let current = thread::current();
        let report = SlowCallReport {
            call_id: CallId::from(call_id),
            thread_name: current.name().unwrap_or(UNNAMED_THREAD).to_string(),
            threshold,
            elapsed,
            stack,
        };
        guarded("report sink", || self.sink.report(&report))?;
        Ok(Some(report))
    }
}

impl<C: Clock> fmt::Debug for CallTimingRecorder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTimingRecorder")
            .field("pending", &self.pending_count())
            .field("enabled", &self.enabled)
            .field("capture_stack", &self.capture_stack)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CallTimingRecorder`]
pub struct RecorderBuilder<C: Clock = MonotonicClock> {
    clock: C,
    lifecycle: Arc<dyn LifecycleCollector>,
    sink: Arc<dyn ReportSink>,
    inspector: Arc<dyn StackInspector>,
    enabled: bool,
    capture_stack: bool,
}

impl RecorderBuilder<MonotonicClock> {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock::new(),
            lifecycle: Arc::new(NoopLifecycle),
            sink: Arc::new(TracingSink),
            inspector: Arc::new(BacktraceInspector::default()),
            enabled: true,
            capture_stack: true,
        }
    }
}

impl Default for RecorderBuilder<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RecorderBuilder<C> {
    /// Replace the clock
    pub fn clock<D: Clock>(self, clock: D) -> RecorderBuilder<D> {
        RecorderBuilder {
            clock,
            lifecycle: self.lifecycle,
            sink: self.sink,
            inspector: self.inspector,
            enabled: self.enabled,
            capture_stack: self.capture_stack,
        }
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn LifecycleCollector>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn StackInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn capture_stack(mut self, capture_stack: bool) -> Self {
        self.capture_stack = capture_stack;
        self
    }

    /// Apply `enabled`, `capture_stack` and `max_stack_depth` from a config
    pub fn config(self, config: &RecorderConfig) -> Self {
        self.enabled(config.enabled)
            .capture_stack(config.capture_stack)
            .inspector(Arc::new(BacktraceInspector::new(config.max_stack_depth)))
    }

    pub fn build(self) -> CallTimingRecorder<C> {
        CallTimingRecorder {
            clock: self.clock,
            timestamps: Mutex::new(HashMap::new()),
            lifecycle: self.lifecycle,
            sink: self.sink,
            inspector: self.inspector,
            enabled: self.enabled,
            capture_stack: self.capture_stack,
        }
    }
}
