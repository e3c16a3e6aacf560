//! Current-thread stack capture for slow-call reports
//!
//! Frames are tagged with an explicit [`FrameOrigin`] at capture time.
//! Report filtering works on that tag, so the recorder's own frames and the
//! unwinder's frames can be dropped without matching on rendered frame text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum stack depth to capture (prevent runaway unwinding)
pub const MAX_STACK_DEPTH: usize = 64;

/// Crate path prefix of this crate's own symbols
const RECORDER_CRATE: &str = env!("CARGO_CRATE_NAME");

/// Symbol prefixes belonging to the stack capture machinery
const CAPTURE_PREFIXES: &[&str] = &[
    "backtrace::",
    "std::backtrace",
    "std::sys::backtrace",
    "_Unwind_",
];

/// Which component a stack frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrigin {
    /// The recorder's own frames
    Recorder,
    /// Frames of the unwinder that performed the capture
    CaptureMachinery,
    /// Everything else: the instrumented program
    Application,
}

impl FrameOrigin {
    /// Tag a demangled symbol by its leading crate path
    ///
    /// Trait-impl symbols such as `<a::B as c::D>::f` are tagged by the
    /// implementing type's crate.
    pub fn classify(symbol: &str) -> Self {
        let path = symbol.trim_start_matches('<');
        if CAPTURE_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return Self::CaptureMachinery;
        }
        let crate_name = path.split("::").next().unwrap_or_default();
        if crate_name == RECORDER_CRATE {
            Self::Recorder
        } else {
            Self::Application
        }
    }
}

/// A single resolved stack frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Demangled symbol name, or the instruction pointer when unresolved
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub origin: FrameOrigin,
}

impl StackFrame {
    /// Build a frame, deriving its origin from the symbol
    pub fn new(symbol: impl Into<String>, file: Option<String>, line: Option<u32>) -> Self {
        let symbol = symbol.into();
        let origin = FrameOrigin::classify(&symbol);
        Self {
            symbol,
            file,
            line,
            origin,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}({}:{})", self.symbol, file, line),
            (Some(file), None) => write!(f, "{}({})", self.symbol, file),
            _ => write!(f, "{}(Unknown Source)", self.symbol),
        }
    }
}

/// Returns the current thread's call stack, innermost frame first
pub trait StackInspector: Send + Sync {
    fn capture(&self) -> Vec<StackFrame>;
}

/// Inspector backed by the `backtrace` crate
#[derive(Debug, Clone, Copy)]
pub struct BacktraceInspector {
    max_depth: usize,
}

impl BacktraceInspector {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for BacktraceInspector {
    fn default() -> Self {
        Self::new(MAX_STACK_DEPTH)
    }
}

impl StackInspector for BacktraceInspector {
    fn capture(&self) -> Vec<StackFrame> {
        capture_current(self.max_depth)
    }
}

/// Inspector that never captures anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInspector;

impl StackInspector for NoopInspector {
    fn capture(&self) -> Vec<StackFrame> {
        Vec::new()
    }
}

/// Walk and resolve the current thread's stack
///
/// Inlined functions resolve to several symbols for one physical frame; each
/// becomes its own entry. The result is truncated to `max_depth` entries.
pub fn capture_current(max_depth: usize) -> Vec<StackFrame> {
    let mut frames = Vec::with_capacity(16);
    if max_depth == 0 {
        return frames;
    }

    backtrace::trace(|frame| {
        let before = frames.len();
        backtrace::resolve_frame(frame, |symbol| {
            let name = symbol
                .name()
                .map(|name| format!("{name:#}"))
                .unwrap_or_else(|| format!("{:?}", frame.ip()));
            let file = symbol.filename().map(|path| path.display().to_string());
            frames.push(StackFrame::new(name, file, symbol.lineno()));
        });
        if frames.len() == before {
            frames.push(StackFrame::new(format!("{:?}", frame.ip()), None, None));
        }
        frames.len() < max_depth
    });

    frames.truncate(max_depth);
    frames
}

/// Drop the recorder's side of the stack, preserving order
///
/// The capture runs underneath the recorder, so every frame up to and
/// including the outermost `Recorder` or `CaptureMachinery` frame belongs to
/// it, whatever crate the symbol names. That prefix also carries runtime glue
/// such as `catch_unwind` and unresolved unwinder frames, which would
/// otherwise be tagged `Application`. The caller's frames start after it.
pub fn filter_frames(frames: Vec<StackFrame>) -> Vec<StackFrame> {
    let boundary = frames
        .iter()
        .rposition(|frame| frame.origin != FrameOrigin::Application)
        .map_or(0, |index| index + 1);
    frames.into_iter().skip(boundary).collect()
}
