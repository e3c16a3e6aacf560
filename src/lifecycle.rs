//! Application lifecycle phase notifications
//!
//! When an instrumented call belongs to an application entry point, the
//! recorder forwards start/end signals for two launch phases to a
//! [`LifecycleCollector`]:
//!
//! - `AppCreate`: the application's `onCreate`
//! - `AppAttach`: the application's `attachBaseContext`
//!
//! Signals are fire-and-forget. The recorder catches a panicking collector
//! and logs it.

use crate::call_id::{CallId, SubjectKind};
use crate::clock::{Clock, MonotonicClock};
use std::sync::{Mutex, PoisonError};

/// Method suffix that marks the creation phase
pub const CREATE_METHOD: &str = "onCreate";
/// Method suffix that marks the context-attachment phase
pub const ATTACH_METHOD: &str = "attachBaseContext";

/// Recognized application launch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    AppCreate,
    AppAttach,
}

impl LifecyclePhase {
    /// Derive the phase for a call site, if any
    ///
    /// Only `ApplicationLifecycle` subjects whose identifier has exactly one
    /// separator and a recognized method suffix yield a phase.
    pub fn from_call(call_id: &CallId, kind: SubjectKind) -> Option<Self> {
        if kind != SubjectKind::ApplicationLifecycle {
            return None;
        }
        match call_id.method()? {
            CREATE_METHOD => Some(Self::AppCreate),
            ATTACH_METHOD => Some(Self::AppAttach),
            _ => None,
        }
    }
}

/// Receiver of the four application phase signals
pub trait LifecycleCollector: Send + Sync {
    fn app_create_start(&self) {}
    fn app_create_end(&self) {}
    fn app_attach_start(&self) {}
    fn app_attach_end(&self) {}
}

/// Collector that ignores every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycle;

impl LifecycleCollector for NoopLifecycle {}

/// Dispatch a phase start to the matching collector method
pub(crate) fn notify_start(collector: &dyn LifecycleCollector, phase: LifecyclePhase) {
    match phase {
        LifecyclePhase::AppCreate => collector.app_create_start(),
        LifecyclePhase::AppAttach => collector.app_attach_start(),
    }
}

/// Dispatch a phase end to the matching collector method
pub(crate) fn notify_end(collector: &dyn LifecycleCollector, phase: LifecyclePhase) {
    match phase {
        LifecyclePhase::AppCreate => collector.app_create_end(),
        LifecyclePhase::AppAttach => collector.app_attach_end(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PhaseStamps {
    start: Option<u64>,
    cost: Option<u64>,
}

impl PhaseStamps {
    fn start(&mut self, now: u64) {
        self.start = Some(now);
    }

    /// Close the phase; an end without a start is ignored
    fn end(&mut self, now: u64) -> Option<u64> {
        let start = self.start.take()?;
        let cost = now.saturating_sub(start);
        self.cost = Some(cost);
        Some(cost)
    }
}

#[derive(Debug, Default)]
struct AppPhases {
    create: PhaseStamps,
    attach: PhaseStamps,
}

/// Application launch-time counter
///
/// Times the create and attach phases from its own clock and exposes the
/// costs in milliseconds.
#[derive(Debug)]
pub struct AppPhaseCounter<C: Clock = MonotonicClock> {
    clock: C,
    phases: Mutex<AppPhases>,
}

impl AppPhaseCounter<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for AppPhaseCounter<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> AppPhaseCounter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            phases: Mutex::new(AppPhases::default()),
        }
    }

    /// Cost of the last completed `onCreate` phase
    pub fn create_cost(&self) -> Option<u64> {
        self.with_phases(|p| p.create.cost)
    }

    /// Cost of the last completed `attachBaseContext` phase
    pub fn attach_cost(&self) -> Option<u64> {
        self.with_phases(|p| p.attach.cost)
    }

    /// Sum of the completed phases, `None` until at least one completes
    pub fn total_cost(&self) -> Option<u64> {
        self.with_phases(|p| match (p.create.cost, p.attach.cost) {
            (None, None) => None,
            (create, attach) => Some(create.unwrap_or(0) + attach.unwrap_or(0)),
        })
    }

    fn with_phases<R>(&self, f: impl FnOnce(&mut AppPhases) -> R) -> R {
        let mut phases = self.phases.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut phases)
    }

    fn start(&self, phase: LifecyclePhase) {
        let now = self.clock.now_millis();
        self.with_phases(|p| match phase {
            LifecyclePhase::AppCreate => p.create.start(now),
            LifecyclePhase::AppAttach => p.attach.start(now),
        });
    }

    fn end(&self, phase: LifecyclePhase) {
        let now = self.clock.now_millis();
        let cost = self.with_phases(|p| match phase {
            LifecyclePhase::AppCreate => p.create.end(now),
            LifecyclePhase::AppAttach => p.attach.end(now),
        });
        match cost {
            Some(cost_ms) => tracing::info!(?phase, cost_ms, "application phase completed"),
            None => tracing::debug!(?phase, "phase end without a start, ignored"),
        }
    }
}

impl<C: Clock> LifecycleCollector for AppPhaseCounter<C> {
    fn app_create_start(&self) {
        self.start(LifecyclePhase::AppCreate);
    }

    fn app_create_end(&self) {
        self.end(LifecyclePhase::AppCreate);
    }

    fn app_attach_start(&self) {
        self.start(LifecyclePhase::AppAttach);
    }

    fn app_attach_end(&self) {
        self.end(LifecyclePhase::AppAttach);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_phase_requires_application_subject() {
        let id = CallId::from("App&onCreate");
        assert_eq!(
            LifecyclePhase::from_call(&id, SubjectKind::ApplicationLifecycle),
            Some(LifecyclePhase::AppCreate)
        );
        assert_eq!(LifecyclePhase::from_call(&id, SubjectKind::None), None);
        assert_eq!(
            LifecyclePhase::from_call(&id, SubjectKind::ActivityLifecycle),
            None
        );
    }

    #[test]
    fn test_phase_from_method_suffix() {
        let kind = SubjectKind::ApplicationLifecycle;
        assert_eq!(
            LifecyclePhase::from_call(&CallId::from("App&attachBaseContext"), kind),
            Some(LifecyclePhase::AppAttach)
        );
        assert_eq!(LifecyclePhase::from_call(&CallId::from("App&foo"), kind), None);
        assert_eq!(
            LifecyclePhase::from_call(&CallId::from("App&x&onCreate"), kind),
            None
        );
    }

    #[test]
    fn test_counter_times_both_phases() {
        let clock = Arc::new(ManualClock::new(1_000));
        let counter = AppPhaseCounter::with_clock(clock.clone());

        counter.app_attach_start();
        clock.advance(40);
        counter.app_attach_end();
        counter.app_create_start();
        clock.advance(260);
        counter.app_create_end();

        assert_eq!(counter.attach_cost(), Some(40));
        assert_eq!(counter.create_cost(), Some(260));
        assert_eq!(counter.total_cost(), Some(300));
    }

    #[test]
    fn test_counter_ignores_end_without_start() {
        let counter = AppPhaseCounter::with_clock(ManualClock::new(0));
        counter.app_create_end();
        assert_eq!(counter.create_cost(), None);
        assert_eq!(counter.total_cost(), None);
    }

    #[test]
    fn test_counter_total_with_single_phase() {
        let clock = Arc::new(ManualClock::new(0));
        let counter = AppPhaseCounter::with_clock(clock.clone());
        counter.app_create_start();
        clock.advance(12);
        counter.app_create_end();
        assert_eq!(counter.total_cost(), Some(12));
        assert_eq!(counter.attach_cost(), None);
    }

    #[test]
    fn test_noop_lifecycle_accepts_all_signals() {
        let noop = NoopLifecycle;
        notify_start(&noop, LifecyclePhase::AppCreate);
        notify_end(&noop, LifecyclePhase::AppAttach);
    }
}
