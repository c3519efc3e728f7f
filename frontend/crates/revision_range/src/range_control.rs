//! Two ordered handles over the revision timeline.
//!
//! `RangeControl` is the single owner of the handle positions. Every write
//! goes through the snapping policy with the opposite handle as bound, so
//! `start < end` holds after each call.

use crate::error::HistoryError;
use crate::request_coordinator::RevisionPair;
use crate::snapping::SnappingPolicy;
use crate::timestamp_index::{SnapDirection, TimestampIndex};
use shared::{RevisionEntry, TimeMs};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Start,
    End,
}

impl Handle {
    pub fn position(self) -> usize {
        match self {
            Handle::Start => 0,
            Handle::End => 1,
        }
    }

    pub fn opposite(self) -> Handle {
        match self {
            Handle::Start => Handle::End,
            Handle::End => Handle::Start,
        }
    }

    pub fn snap_direction(self) -> SnapDirection {
        match self {
            Handle::Start => SnapDirection::TowardPast,
            Handle::End => SnapDirection::TowardFuture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeState {
    start: RevisionEntry,
    end: RevisionEntry,
}

impl RangeState {
    pub fn start_value(&self) -> TimeMs {
        self.start.timestamp
    }

    pub fn end_value(&self) -> TimeMs {
        self.end.timestamp
    }

    pub fn start_revision(&self) -> RevisionEntry {
        self.start
    }

    pub fn end_revision(&self) -> RevisionEntry {
        self.end
    }

    pub fn value(&self, handle: Handle) -> TimeMs {
        self.revision(handle).timestamp
    }

    pub fn revision(&self, handle: Handle) -> RevisionEntry {
        match handle {
            Handle::Start => self.start,
            Handle::End => self.end,
        }
    }

    pub fn pair(&self) -> RevisionPair {
        RevisionPair {
            start_revid: self.start.revid,
            end_revid: self.end.revid,
        }
    }

    fn store(&mut self, handle: Handle, entry: RevisionEntry) {
        match handle {
            Handle::Start => self.start = entry,
            Handle::End => self.end = entry,
        }
    }
}

/// Intermediate movement, used for live tooltip text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeUpdate {
    pub handle: Handle,
    pub raw: TimeMs,
    pub candidate: RevisionEntry,
}

/// A settled handle write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeChange {
    pub handle: Handle,
    pub raw: TimeMs,
    pub previous: RevisionEntry,
    pub snapped: RevisionEntry,
}

impl RangeChange {
    pub fn moved(&self) -> bool {
        self.previous != self.snapped
    }

    /// Visual glide from where the user let go to the snapped revision.
    pub fn transition(&self, steps: u32) -> SnapTransition {
        SnapTransition::new(self.raw, self.snapped.timestamp, steps)
    }
}

#[derive(Debug, Clone)]
pub struct RangeControl {
    policy: SnappingPolicy,
    state: RangeState,
}

impl RangeControl {
    /// Start at the `initial_window`-th most recent revision (earliest when
    /// the history is shorter) and end at the latest one.
    pub fn initialize(index: Arc<TimestampIndex>, initial_window: usize) -> Result<Self, HistoryError> {
        let distinct_timestamps = index.distinct_timestamps();
        if distinct_timestamps < 2 {
            return Err(HistoryError::Insufficient { distinct_timestamps });
        }

        let policy = SnappingPolicy::new(index.clone());
        let end = *index.latest();
        let mut start = *index.nth_most_recent(initial_window);
        if start.timestamp >= end.timestamp {
            start = policy.resolve(Handle::Start, start.timestamp, end.timestamp);
        }

        Ok(Self {
            policy,
            state: RangeState { start, end },
        })
    }

    pub fn index(&self) -> &Arc<TimestampIndex> {
        self.policy.index()
    }

    pub fn state(&self) -> RangeState {
        self.state
    }

    pub fn full_range(&self) -> (TimeMs, TimeMs) {
        self.index().full_range()
    }

    pub fn preview(&self, handle: Handle, raw: TimeMs) -> RangeUpdate {
        let bound = self.state.value(handle.opposite());
        RangeUpdate {
            handle,
            raw,
            candidate: self.policy.resolve(handle, raw, bound),
        }
    }

    pub fn set_handle(&mut self, handle: Handle, raw: TimeMs) -> RangeChange {
        let bound = self.state.value(handle.opposite());
        let snapped = self.policy.resolve(handle, raw, bound);
        self.commit(handle, raw, snapped)
    }

    /// Store an exact revision (calendar picks). Entries that are not in the
    /// index or sit on the wrong side of the other handle are snapped instead.
    pub fn apply_entry(&mut self, handle: Handle, entry: RevisionEntry) -> RangeChange {
        let bound = self.state.value(handle.opposite());
        if self.policy.admits(handle, &entry, bound) {
            self.commit(handle, entry.timestamp, entry)
        } else {
            self.set_handle(handle, entry.timestamp)
        }
    }

    fn commit(&mut self, handle: Handle, raw: TimeMs, snapped: RevisionEntry) -> RangeChange {
        let previous = self.state.revision(handle);
        self.state.store(handle, snapped);
        debug_assert!(self.state.start_value() < self.state.end_value());
        RangeChange {
            handle,
            raw,
            previous,
            snapped,
        }
    }
}

/// Display positions for a handle gliding onto its snapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapTransition {
    from: TimeMs,
    to: TimeMs,
    steps: u32,
}

impl SnapTransition {
    pub fn new(from: TimeMs, to: TimeMs, steps: u32) -> Self {
        Self {
            from,
            to,
            steps: steps.max(1),
        }
    }

    /// `steps` positions, the last one exactly on the target.
    pub fn frames(&self) -> impl Iterator<Item = TimeMs> + '_ {
        let from = self.from.millis() as i128;
        let distance = self.to.millis() as i128 - from;
        let steps = self.steps as i128;
        (1..=steps).map(move |step| TimeMs((from + distance * step / steps) as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> TimeMs {
        TimeMs::parse_iso(text).unwrap()
    }

    fn control_for(entries: Vec<RevisionEntry>) -> RangeControl {
        let index = TimestampIndex::build(entries).unwrap();
        RangeControl::initialize(Arc::new(index), 10).unwrap()
    }

    fn scenario_control() -> RangeControl {
        control_for(vec![
            RevisionEntry::new(1, at("2020-01-01T00:00:00Z")),
            RevisionEntry::new(2, at("2020-06-01T00:00:00Z")),
            RevisionEntry::new(3, at("2021-01-01T00:00:00Z")),
        ])
    }

    #[test]
    fn short_history_starts_at_earliest_revision() {
        let control = scenario_control();
        let state = control.state();
        assert_eq!(state.start_value(), at("2020-01-01T00:00:00Z"));
        assert_eq!(state.end_value(), at("2021-01-01T00:00:00Z"));
    }

    #[test]
    fn long_history_starts_at_tenth_most_recent() {
        let entries = (0..25)
            .map(|day| RevisionEntry::new(100 + day, TimeMs(day as i64 * 86_400_000)))
            .collect();
        let control = control_for(entries);
        assert_eq!(control.state().start_revision().revid, 115);
        assert_eq!(control.state().end_revision().revid, 124);
    }

    #[test]
    fn single_revision_is_insufficient() {
        let index = TimestampIndex::build([RevisionEntry::new(1, TimeMs(5))]).unwrap();
        let result = RangeControl::initialize(Arc::new(index), 10);
        assert_eq!(
            result.unwrap_err(),
            HistoryError::Insufficient {
                distinct_timestamps: 1
            }
        );
    }

    #[test]
    fn revisions_sharing_one_instant_are_insufficient() {
        let index = TimestampIndex::build([
            RevisionEntry::new(1, TimeMs(5)),
            RevisionEntry::new(2, TimeMs(5)),
        ])
        .unwrap();
        assert!(RangeControl::initialize(Arc::new(index), 10).is_err());
    }

    #[test]
    fn window_start_sharing_latest_instant_is_pulled_back() {
        let control = control_for(vec![
            RevisionEntry::new(1, TimeMs(100)),
            RevisionEntry::new(2, TimeMs(900)),
            RevisionEntry::new(3, TimeMs(900)),
        ]);
        let index = control.index().clone();
        let control = RangeControl::initialize(index, 2).unwrap();
        assert_eq!(control.state().start_revision().revid, 1);
        assert_eq!(control.state().end_value(), TimeMs(900));
    }

    #[test]
    fn dragging_start_near_end_snaps_to_previous_revision() {
        let mut control = scenario_control();
        let change = control.set_handle(Handle::Start, at("2020-12-31T00:00:00Z"));
        assert_eq!(change.snapped.timestamp, at("2020-06-01T00:00:00Z"));
        assert_eq!(control.state().start_revision().revid, 2);
        assert!(change.moved());
    }

    #[test]
    fn settling_twice_on_the_same_value_is_idempotent() {
        let mut control = scenario_control();
        let first = control.set_handle(Handle::End, at("2020-07-01T00:00:00Z"));
        let second = control.set_handle(Handle::End, at("2020-07-01T00:00:00Z"));
        assert_eq!(first.snapped, second.snapped);
        assert!(!second.moved());
    }

    #[test]
    fn preview_leaves_state_untouched() {
        let control = scenario_control();
        let before = control.state();
        let update = control.preview(Handle::End, at("2020-05-30T00:00:00Z"));
        assert_eq!(update.candidate.revid, 2);
        assert_eq!(control.state(), before);
    }

    #[test]
    fn handles_never_cross_under_arbitrary_drags() {
        let entries = (0..40)
            .map(|n| RevisionEntry::new(n, TimeMs((n as i64 * 7919) % 1_000 * 1_000)))
            .collect();
        let mut control = control_for(entries);
        let (low, high) = control.full_range();

        let mut seed: u64 = 42;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let handle = if seed >> 63 == 0 { Handle::Start } else { Handle::End };
            let span = (high.millis() - low.millis() + 4_000) as u64;
            let raw = TimeMs(low.millis() - 2_000 + ((seed >> 16) % span) as i64);
            control.set_handle(handle, raw);
            let state = control.state();
            assert!(state.start_value() < state.end_value());
            assert!(control.index().contains(&state.start_revision()));
            assert!(control.index().contains(&state.end_revision()));
        }
    }

    #[test]
    fn apply_entry_keeps_exact_revision_on_shared_instant() {
        let mut control = control_for(vec![
            RevisionEntry::new(1, TimeMs(100)),
            RevisionEntry::new(2, TimeMs(500)),
            RevisionEntry::new(3, TimeMs(500)),
            RevisionEntry::new(4, TimeMs(900)),
        ]);
        let change = control.apply_entry(Handle::Start, RevisionEntry::new(3, TimeMs(500)));
        assert_eq!(change.snapped.revid, 3);
        assert_eq!(control.state().pair().start_revid, 3);
    }

    #[test]
    fn apply_entry_on_wrong_side_is_snapped() {
        let mut control = scenario_control();
        let end = control.state().end_revision();
        let change = control.apply_entry(Handle::Start, end);
        assert!(change.snapped.timestamp < end.timestamp);
        assert_eq!(change.snapped.revid, 2);
    }

    #[test]
    fn transition_ends_exactly_on_target() {
        let transition = SnapTransition::new(TimeMs(0), TimeMs(1_000), 4);
        let frames: Vec<TimeMs> = transition.frames().collect();
        assert_eq!(frames, vec![TimeMs(250), TimeMs(500), TimeMs(750), TimeMs(1_000)]);
    }

    #[test]
    fn transition_moves_backwards_too() {
        let change = RangeChange {
            handle: Handle::End,
            raw: TimeMs(1_000),
            previous: RevisionEntry::new(1, TimeMs(0)),
            snapped: RevisionEntry::new(2, TimeMs(400)),
        };
        let frames: Vec<TimeMs> = change.transition(3).frames().collect();
        assert_eq!(frames, vec![TimeMs(800), TimeMs(600), TimeMs(400)]);
    }
}
