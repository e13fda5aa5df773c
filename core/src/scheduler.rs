use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::diff::{diff, ChangeSet};
use crate::model::{PrinterSnapshot, PrinterState};
use crate::{targets, Error};

pub const FAST_INTERVAL_SECS: u64 = 5;
pub const SLOW_INTERVAL_SECS: u64 = 60;
pub const ADAPT_INTERVAL_SECS: u64 = 30;

pub fn choose_interval(state: &str) -> u64 {
    Intervals::default().choose(state).as_secs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub fast: Duration,
    pub slow: Duration,
    pub adapt: Duration,
}

impl Intervals {
    pub fn choose(&self, state: &str) -> Duration {
        if state == PrinterState::PRINTING {
            self.fast
        } else {
            self.slow
        }
    }
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(FAST_INTERVAL_SECS),
            slow: Duration::from_secs(SLOW_INTERVAL_SECS),
            adapt: Duration::from_secs(ADAPT_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Active,
    Paused,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Active => f.write_str("active"),
            RunState::Paused => f.write_str("paused"),
        }
    }
}

// Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotStarted,
    Paused,
    InFlight(RequestId),
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Fetch(RequestId),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reschedule {
    pub from: Duration,
    pub to: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptDecision {
    Unchanged,
    Deferred,
    Rescheduled(Reschedule),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied {
        request_id: RequestId,
        changes: ChangeSet,
        first: bool,
    },
    // A newer request already completed, successfully or not.
    Stale {
        request_id: RequestId,
        latest: RequestId,
    },
    Failed {
        request_id: RequestId,
        error: Error,
    },
}

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    intervals: Intervals,
    run_state: RunState,
    interval: Duration,
    snapshot: Option<PrinterSnapshot>,
    next_request: u64,
    in_flight: BTreeSet<RequestId>,
    latest_completed: Option<RequestId>,
    halted: Option<Error>,
}

impl RefreshScheduler {
    pub fn new(intervals: Intervals) -> Self {
        Self {
            intervals,
            run_state: RunState::Idle,
            interval: intervals.fast,
            snapshot: None,
            next_request: 0,
            in_flight: BTreeSet::new(),
            latest_completed: None,
            halted: None,
        }
    }

    pub fn intervals(&self) -> Intervals {
        self.intervals
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval.as_secs()
    }

    pub fn snapshot(&self) -> Option<&PrinterSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn halted(&self) -> Option<&Error> {
        self.halted.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    // None suspends the timer; a new one starts from a full interval.
    pub fn fetch_timer(&self) -> Option<Duration> {
        (self.run_state == RunState::Active && self.halted.is_none()).then_some(self.interval)
    }

    pub fn start(&mut self) -> RequestId {
        self.run_state = RunState::Active;
        self.interval = self.intervals.fast;
        info!(
            target: targets::POLLING,
            interval_secs = self.interval.as_secs(),
            "Refresh scheduler started"
        );
        self.issue()
    }

    pub fn on_tick(&mut self) -> TickDecision {
        let reason = match self.run_state {
            RunState::Idle => Some(SkipReason::NotStarted),
            RunState::Paused => Some(SkipReason::Paused),
            RunState::Active if self.halted.is_some() => Some(SkipReason::Halted),
            RunState::Active => self
                .in_flight
                .iter()
                .next_back()
                .copied()
                .map(SkipReason::InFlight),
        };

        if let Some(reason) = reason {
            debug!(target: targets::POLLING, reason = ?reason, "Tick skipped");
            return TickDecision::Skip(reason);
        }

        TickDecision::Fetch(self.issue())
    }

    // Ignores the in-flight guard and the halt.
    pub fn refresh_now(&mut self) -> RequestId {
        debug!(target: targets::POLLING, "Manual refresh requested");
        self.issue()
    }

    pub fn pause(&mut self) -> bool {
        if self.run_state != RunState::Active {
            return false;
        }
        self.run_state = RunState::Paused;
        info!(target: targets::POLLING, "Refresh paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.run_state != RunState::Paused {
            return false;
        }
        self.run_state = RunState::Active;
        info!(
            target: targets::POLLING,
            interval_secs = self.interval.as_secs(),
            "Refresh resumed"
        );
        true
    }

    pub fn toggle_pause(&mut self) -> RunState {
        if !self.pause() {
            self.resume();
        }
        self.run_state
    }

    pub fn reschedule(&mut self, interval: Duration) -> Reschedule {
        let change = Reschedule {
            from: self.interval,
            to: interval,
        };
        self.interval = interval;
        info!(
            target: targets::POLLING,
            from_secs = change.from.as_secs(),
            to_secs = change.to.as_secs(),
            paused = self.is_paused(),
            "Fetch timer rescheduled"
        );
        change
    }

    pub fn on_adapt_check(&mut self) -> AdaptDecision {
        if self.run_state != RunState::Active {
            return AdaptDecision::Deferred;
        }

        let Some(snapshot) = &self.snapshot else {
            return AdaptDecision::Unchanged;
        };

        let target = self.intervals.choose(snapshot.printer_state.as_str());
        if target == self.interval {
            return AdaptDecision::Unchanged;
        }

        AdaptDecision::Rescheduled(self.reschedule(target))
    }

    pub fn complete(
        &mut self,
        request_id: RequestId,
        result: Result<PrinterSnapshot, Error>,
    ) -> FetchOutcome {
        self.in_flight.remove(&request_id);

        if let Some(latest) = self.latest_completed.filter(|latest| request_id < *latest) {
            debug!(
                target: targets::POLLING,
                request = %request_id,
                latest = %latest,
                "Discarding stale response"
            );
            return FetchOutcome::Stale { request_id, latest };
        }
        self.latest_completed = Some(request_id);

        match result {
            Ok(snapshot) => {
                let first = self.snapshot.is_none();
                let changes = self
                    .snapshot
                    .as_ref()
                    .map(|previous| diff(previous, &snapshot))
                    .unwrap_or_default();
                debug!(
                    target: targets::POLLING,
                    request = %request_id,
                    printer = %snapshot.uuid,
                    state = %snapshot.printer_state,
                    changes = changes.len(),
                    "Snapshot applied"
                );
                self.snapshot = Some(snapshot);
                self.halted = None;
                FetchOutcome::Applied {
                    request_id,
                    changes,
                    first,
                }
            }
            Err(error) => {
                warn!(
                    target: targets::POLLING,
                    request = %request_id,
                    error = %error.technical_detail(),
                    fatal = error.is_fatal(),
                    "Fetch failed"
                );
                if error.is_fatal() {
                    self.halted = Some(error.clone());
                }
                FetchOutcome::Failed { request_id, error }
            }
        }
    }

    fn issue(&mut self) -> RequestId {
        self.next_request += 1;
        let request_id = RequestId(self.next_request);
        self.in_flight.insert(request_id);
        debug!(target: targets::POLLING, request = %request_id, "Fetch issued");
        request_id
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(Intervals::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: &str) -> PrinterSnapshot {
        let mut value = json!({"uuid": "abc-123", "printer_state": state});
        if state == PrinterState::PRINTING {
            value["job_info"] = json!({
                "display_name": "part.gcode",
                "progress": 12.5,
                "time_printing": 600,
                "time_remaining": 4200
            });
        }
        PrinterSnapshot::from_value("printers/abc-123", value).expect("snapshot")
    }

    fn not_found() -> Error {
        Error::NotFound {
            resource: "printers/abc-***".to_string(),
        }
    }

    fn started(state: &str) -> RefreshScheduler {
        let mut scheduler = RefreshScheduler::default();
        let request = scheduler.start();
        scheduler.complete(request, Ok(snapshot(state)));
        scheduler
    }

    #[test]
    fn interval_depends_only_on_state() {
        assert_eq!(choose_interval("PRINTING"), 5);
        assert_eq!(choose_interval("IDLE"), 60);
        assert_eq!(choose_interval("PAUSED"), 60);
        assert_eq!(choose_interval("printing"), 60);
        assert_eq!(choose_interval(""), 60);
    }

    #[test]
    fn start_issues_fetch_and_uses_fast_interval() {
        let mut scheduler = RefreshScheduler::default();
        assert_eq!(scheduler.on_tick(), TickDecision::Skip(SkipReason::NotStarted));
        assert_eq!(scheduler.fetch_timer(), None);

        scheduler.start();
        assert_eq!(scheduler.run_state(), RunState::Active);
        assert_eq!(scheduler.interval_seconds(), 5);
        assert_eq!(scheduler.in_flight(), 1);
        assert_eq!(scheduler.fetch_timer(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn tick_is_skipped_while_fetch_in_flight() {
        let mut scheduler = RefreshScheduler::default();
        let first = scheduler.start();
        assert_eq!(
            scheduler.on_tick(),
            TickDecision::Skip(SkipReason::InFlight(first))
        );

        scheduler.complete(first, Ok(snapshot("IDLE")));
        assert!(matches!(scheduler.on_tick(), TickDecision::Fetch(_)));
    }

    #[test]
    fn pause_and_resume_without_tick_keep_state() {
        let mut scheduler = started("IDLE");
        let interval = scheduler.interval();
        let held = scheduler.snapshot().cloned();

        assert_eq!(scheduler.toggle_pause(), RunState::Paused);
        assert_eq!(scheduler.fetch_timer(), None);
        assert_eq!(scheduler.toggle_pause(), RunState::Active);

        assert_eq!(scheduler.interval(), interval);
        assert_eq!(scheduler.snapshot().cloned(), held);
    }

    #[test]
    fn paused_scheduler_does_not_fetch() {
        let mut scheduler = started("IDLE");
        scheduler.pause();
        assert_eq!(scheduler.on_tick(), TickDecision::Skip(SkipReason::Paused));
    }

    #[test]
    fn reschedule_while_paused_stays_paused() {
        let mut scheduler = started("IDLE");
        scheduler.pause();

        let change = scheduler.reschedule(Duration::from_secs(60));
        assert_eq!(change.to, Duration::from_secs(60));
        assert!(scheduler.is_paused());
        assert_eq!(scheduler.fetch_timer(), None);
        assert_eq!(scheduler.on_tick(), TickDecision::Skip(SkipReason::Paused));
    }

    #[test]
    fn adapt_check_defers_while_paused() {
        let mut scheduler = started("IDLE");
        scheduler.pause();
        assert_eq!(scheduler.on_adapt_check(), AdaptDecision::Deferred);
        assert_eq!(scheduler.interval_seconds(), 5);
        assert!(scheduler.is_paused());
    }

    #[test]
    fn out_of_order_completion_keeps_newest_issued() {
        let mut scheduler = RefreshScheduler::default();
        let older = scheduler.start();
        let newer = scheduler.refresh_now();

        let applied = scheduler.complete(newer, Ok(snapshot("PRINTING")));
        assert!(matches!(applied, FetchOutcome::Applied { .. }));

        let stale = scheduler.complete(older, Ok(snapshot("IDLE")));
        assert_eq!(
            stale,
            FetchOutcome::Stale {
                request_id: older,
                latest: newer
            }
        );
        assert_eq!(
            scheduler.snapshot().map(|held| held.printer_state.clone()),
            Some(PrinterState::new("PRINTING"))
        );
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn older_success_cannot_lift_newer_fatal_halt() {
        let mut scheduler = RefreshScheduler::default();
        let older = scheduler.start();
        let newer = scheduler.refresh_now();

        let unauthorized = Error::Unauthorized {
            resource: "printers/abc-***".to_string(),
            status: 401,
        };
        scheduler.complete(newer, Err(unauthorized.clone()));
        let outcome = scheduler.complete(older, Ok(snapshot("IDLE")));

        assert_eq!(
            outcome,
            FetchOutcome::Stale {
                request_id: older,
                latest: newer
            }
        );
        assert_eq!(scheduler.halted(), Some(&unauthorized));
        assert_eq!(scheduler.fetch_timer(), None);
        assert!(scheduler.snapshot().is_none());
    }

    #[test]
    fn older_snapshot_after_newer_failure_is_discarded() {
        let mut scheduler = started("PRINTING");
        let older = scheduler.refresh_now();
        let newer = scheduler.refresh_now();
        let bad_gateway = Error::Fetch {
            resource: "printers/abc-***".to_string(),
            status: Some(502),
            details: "bad gateway".to_string(),
        };

        scheduler.complete(newer, Err(bad_gateway));
        let outcome = scheduler.complete(older, Ok(snapshot("IDLE")));
        assert!(matches!(outcome, FetchOutcome::Stale { .. }));
        assert_eq!(
            scheduler.snapshot().map(|held| held.printer_state.as_str()),
            Some("PRINTING")
        );
    }

    #[test]
    fn idle_then_printing_scenario() {
        let mut scheduler = RefreshScheduler::default();
        let request = scheduler.start();
        let outcome = scheduler.complete(request, Ok(snapshot("IDLE")));
        assert!(matches!(outcome, FetchOutcome::Applied { first: true, .. }));
        assert!(scheduler.snapshot().expect("held").job_info.is_none());

        assert_eq!(
            scheduler.on_adapt_check(),
            AdaptDecision::Rescheduled(Reschedule {
                from: Duration::from_secs(5),
                to: Duration::from_secs(60),
            })
        );
        assert_eq!(scheduler.interval_seconds(), 60);

        let TickDecision::Fetch(request) = scheduler.on_tick() else {
            panic!("expected fetch");
        };
        let FetchOutcome::Applied { changes, .. } =
            scheduler.complete(request, Ok(snapshot("PRINTING")))
        else {
            panic!("expected applied");
        };
        let (from, to) = changes.state_change().expect("state change");
        assert_eq!(from, &"IDLE");
        assert_eq!(to, &"PRINTING");
        assert_eq!(scheduler.interval_seconds(), 60);

        assert!(matches!(
            scheduler.on_adapt_check(),
            AdaptDecision::Rescheduled(_)
        ));
        assert_eq!(scheduler.interval_seconds(), 5);
        assert_eq!(scheduler.on_adapt_check(), AdaptDecision::Unchanged);
    }

    #[test]
    fn transient_error_keeps_ticking_at_same_interval() {
        let mut scheduler = started("IDLE");
        let TickDecision::Fetch(request) = scheduler.on_tick() else {
            panic!("expected fetch");
        };
        let error = Error::Fetch {
            resource: "printers/abc-***".to_string(),
            status: Some(502),
            details: "bad gateway".to_string(),
        };
        let outcome = scheduler.complete(request, Err(error));
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
        assert_eq!(scheduler.interval_seconds(), 5);
        assert!(scheduler.halted().is_none());
        assert!(matches!(scheduler.on_tick(), TickDecision::Fetch(_)));
    }

    #[test]
    fn not_found_halts_and_keeps_last_snapshot() {
        let mut scheduler = started("IDLE");
        let TickDecision::Fetch(request) = scheduler.on_tick() else {
            panic!("expected fetch");
        };
        scheduler.complete(request, Err(not_found()));

        assert_eq!(scheduler.halted(), Some(&not_found()));
        assert_eq!(scheduler.on_tick(), TickDecision::Skip(SkipReason::Halted));
        assert_eq!(scheduler.fetch_timer(), None);
        assert_eq!(
            scheduler.snapshot().map(|held| held.printer_state.as_str()),
            Some("IDLE")
        );

        let retry = scheduler.refresh_now();
        scheduler.complete(retry, Ok(snapshot("IDLE")));
        assert!(scheduler.halted().is_none());
        assert!(scheduler.fetch_timer().is_some());
    }

    #[test]
    fn refresh_now_while_paused_stays_paused() {
        let mut scheduler = started("IDLE");
        scheduler.pause();
        let request = scheduler.refresh_now();
        scheduler.complete(request, Ok(snapshot("PRINTING")));
        assert!(scheduler.is_paused());
        assert_eq!(scheduler.on_adapt_check(), AdaptDecision::Deferred);
    }
}
