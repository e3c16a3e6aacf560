//! callcost - concurrent call-timing recorder with slow-call reporting
//!
//! An instrumentation layer wraps call sites in matched
//! [`begin`](recorder::CallTimingRecorder::begin) /
//! [`end`](recorder::CallTimingRecorder::end) pairs. The recorder times each
//! call, reports calls that meet their threshold together with the reporting
//! thread's stack, and forwards application launch phases to a lifecycle
//! collector.
//!
//! ```
//! use callcost::call_id::SubjectKind;
//! use callcost::recorder::CallTimingRecorder;
//!
//! let recorder = CallTimingRecorder::new();
//! recorder.begin("Feed&load", SubjectKind::None);
//! let report = recorder.end("Feed&load", u64::MAX, SubjectKind::None);
//! assert!(report.is_none());
//! ```

pub mod call_id;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod recorder;
pub mod replay;
pub mod report;
pub mod stack_unwind;

pub use call_id::{CallId, SubjectKind};
pub use recorder::{CallTimingRecorder, RecorderBuilder};
pub use report::{ReportSink, SlowCallReport};
