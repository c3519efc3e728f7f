//! Debounce, dedup and cancellation bookkeeping for visualization requests.
//!
//! The coordinator never sleeps or fetches. The driver starts a timer for each
//! `DebounceTimer` it is handed, reports the timer back when it fires, issues
//! the fetch for a `Dispatch`, and feeds the result to `response_arrived`.
//! Generations only grow, so a ticket from an older request can never be
//! mistaken for the current one.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionPair {
    pub start_revid: u64,
    pub end_revid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    pair: RevisionPair,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pair(&self) -> RevisionPair {
        self.pair
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    pub id: u64,
    pub delay_ms: u32,
}

/// Fetch to issue. `supersedes` must be aborted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub ticket: RequestTicket,
    pub supersedes: Option<RequestTicket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome<T> {
    Discard,
    Render(T),
    RenderError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStatus {
    Idle,
    /// Debounce timer running; a request may still be outstanding.
    Pending,
    InFlight,
}

#[derive(Debug, Clone)]
pub struct RequestCoordinator {
    debounce_ms: u32,
    next_timer_id: u64,
    active_timer: Option<u64>,
    generation: u64,
    in_flight: Option<RequestTicket>,
    last_dispatched: Option<RevisionPair>,
}

impl RequestCoordinator {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            next_timer_id: 0,
            active_timer: None,
            generation: 0,
            in_flight: None,
            last_dispatched: None,
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        if self.active_timer.is_some() {
            CoordinatorStatus::Pending
        } else if self.in_flight.is_some() {
            CoordinatorStatus::InFlight
        } else {
            CoordinatorStatus::Idle
        }
    }

    pub fn in_flight(&self) -> Option<RequestTicket> {
        self.in_flight
    }

    /// Restart the debounce window. Any previously issued timer goes stale.
    pub fn settled(&mut self) -> DebounceTimer {
        self.next_timer_id += 1;
        self.active_timer = Some(self.next_timer_id);
        DebounceTimer {
            id: self.next_timer_id,
            delay_ms: self.debounce_ms,
        }
    }

    /// `pair` is the range as it stands when the timer fires.
    pub fn timer_fired(&mut self, timer: DebounceTimer, pair: RevisionPair) -> Option<Dispatch> {
        if self.active_timer != Some(timer.id) {
            return None;
        }
        self.active_timer = None;

        if self.last_dispatched == Some(pair) {
            return None;
        }

        self.generation += 1;
        let ticket = RequestTicket {
            generation: self.generation,
            pair,
        };
        let supersedes = self.in_flight.replace(ticket);
        self.last_dispatched = Some(pair);
        Some(Dispatch { ticket, supersedes })
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.in_flight.as_ref() == Some(ticket)
    }

    pub fn response_arrived<T>(
        &mut self,
        ticket: RequestTicket,
        result: Result<T, FetchFailure>,
    ) -> ResponseOutcome<T> {
        if !self.is_current(&ticket) {
            return ResponseOutcome::Discard;
        }
        self.in_flight = None;

        match result {
            Ok(payload) => ResponseOutcome::Render(payload),
            // Superseded requests never reach here, so a cancellation of the
            // current ticket was aborted by the browser itself.
            Err(FetchFailure::Cancelled) => {
                self.last_dispatched = None;
                ResponseOutcome::Discard
            }
            Err(FetchFailure::Failed(message)) => {
                self.last_dispatched = None;
                ResponseOutcome::RenderError(message)
            }
        }
    }

    /// Forget everything. Returns the outstanding ticket, which the caller
    /// should abort.
    pub fn reset(&mut self) -> Option<RequestTicket> {
        self.active_timer = None;
        self.last_dispatched = None;
        self.in_flight.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: RevisionPair = RevisionPair {
        start_revid: 1,
        end_revid: 3,
    };
    const SECOND: RevisionPair = RevisionPair {
        start_revid: 2,
        end_revid: 3,
    };

    #[test]
    fn starts_idle() {
        let coordinator = RequestCoordinator::new(100);
        assert_eq!(coordinator.status(), CoordinatorStatus::Idle);
        assert_eq!(coordinator.in_flight(), None);
    }

    #[test]
    fn settles_within_window_resolve_once_with_latest_values() {
        let mut coordinator = RequestCoordinator::new(100);
        let at_zero = coordinator.settled();
        let at_thirty = coordinator.settled();
        assert_eq!(at_thirty.delay_ms, 100);
        assert_eq!(coordinator.status(), CoordinatorStatus::Pending);

        assert_eq!(coordinator.timer_fired(at_zero, FIRST), None);
        let dispatch = coordinator.timer_fired(at_thirty, SECOND).unwrap();
        assert_eq!(dispatch.ticket.pair(), SECOND);
        assert_eq!(dispatch.supersedes, None);
        assert_eq!(coordinator.status(), CoordinatorStatus::InFlight);
    }

    #[test]
    fn same_pair_is_not_fetched_twice() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let dispatch = coordinator.timer_fired(timer, FIRST).unwrap();
        let outcome = coordinator.response_arrived(dispatch.ticket, Ok("<svg/>"));
        assert_eq!(outcome, ResponseOutcome::Render("<svg/>"));

        let timer = coordinator.settled();
        assert_eq!(coordinator.timer_fired(timer, FIRST), None);
        assert_eq!(coordinator.status(), CoordinatorStatus::Idle);
    }

    #[test]
    fn same_pair_while_outstanding_keeps_request_alive() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let dispatch = coordinator.timer_fired(timer, FIRST).unwrap();

        let timer = coordinator.settled();
        assert_eq!(coordinator.status(), CoordinatorStatus::Pending);
        assert_eq!(coordinator.timer_fired(timer, FIRST), None);
        assert_eq!(coordinator.status(), CoordinatorStatus::InFlight);
        assert!(coordinator.is_current(&dispatch.ticket));
    }

    #[test]
    fn newer_request_supersedes_outstanding_one() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let first = coordinator.timer_fired(timer, FIRST).unwrap();

        let timer = coordinator.settled();
        let second = coordinator.timer_fired(timer, SECOND).unwrap();
        assert_eq!(second.supersedes, Some(first.ticket));
        assert!(second.ticket.generation() > first.ticket.generation());
        assert!(!coordinator.is_current(&first.ticket));
        assert!(coordinator.is_current(&second.ticket));

        assert_eq!(
            coordinator.response_arrived(first.ticket, Ok("stale")),
            ResponseOutcome::Discard
        );
        assert_eq!(
            coordinator.response_arrived(second.ticket, Ok("fresh")),
            ResponseOutcome::Render("fresh")
        );
    }

    #[test]
    fn cancelled_response_is_silent() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let first = coordinator.timer_fired(timer, FIRST).unwrap();
        let timer = coordinator.settled();
        coordinator.timer_fired(timer, SECOND).unwrap();

        let outcome: ResponseOutcome<&str> =
            coordinator.response_arrived(first.ticket, Err(FetchFailure::Cancelled));
        assert_eq!(outcome, ResponseOutcome::Discard);
        assert_eq!(coordinator.status(), CoordinatorStatus::InFlight);
    }

    #[test]
    fn browser_abort_of_current_request_goes_idle_and_allows_retry() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let dispatch = coordinator.timer_fired(timer, FIRST).unwrap();

        let outcome: ResponseOutcome<&str> =
            coordinator.response_arrived(dispatch.ticket, Err(FetchFailure::Cancelled));
        assert_eq!(outcome, ResponseOutcome::Discard);
        assert_eq!(coordinator.status(), CoordinatorStatus::Idle);

        let timer = coordinator.settled();
        assert!(coordinator.timer_fired(timer, FIRST).is_some());
    }

    #[test]
    fn failure_renders_error_and_allows_manual_retry() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let dispatch = coordinator.timer_fired(timer, FIRST).unwrap();
        let outcome: ResponseOutcome<&str> = coordinator.response_arrived(
            dispatch.ticket,
            Err(FetchFailure::Failed("HTTP 500".to_string())),
        );
        assert_eq!(outcome, ResponseOutcome::RenderError("HTTP 500".to_string()));
        assert_eq!(coordinator.status(), CoordinatorStatus::Idle);

        let timer = coordinator.settled();
        assert!(coordinator.timer_fired(timer, FIRST).is_some());
    }

    #[test]
    fn reset_returns_outstanding_ticket_and_stales_timers() {
        let mut coordinator = RequestCoordinator::new(100);
        let timer = coordinator.settled();
        let dispatch = coordinator.timer_fired(timer, FIRST).unwrap();
        let pending = coordinator.settled();

        assert_eq!(coordinator.reset(), Some(dispatch.ticket));
        assert_eq!(coordinator.status(), CoordinatorStatus::Idle);
        assert_eq!(coordinator.timer_fired(pending, SECOND), None);
        assert_eq!(
            coordinator.response_arrived(dispatch.ticket, Ok("late")),
            ResponseOutcome::Discard
        );
    }
}
