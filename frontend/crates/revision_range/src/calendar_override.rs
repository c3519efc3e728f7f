//! Exact revision picking through a date (and, when needed, time) selector.
//!
//! At most one calendar is open at a time across both handles. Opening a
//! calendar for one handle closes the other one in the same call.

use crate::range_control::Handle;
use crate::snapping::SnappingPolicy;
use crate::timestamp_index::TimestampIndex;
use chrono::{Datelike, NaiveDate};
use shared::{RevisionEntry, TimeMs};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarStage {
    PickingDate,
    PickingTime {
        date: NaiveDate,
        candidates: Vec<RevisionEntry>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarOutcome {
    Ignored,
    /// Store this exact revision on the open handle. The calendar is closed.
    Apply(RevisionEntry),
    /// Several revisions qualify on the picked date.
    ChooseTime(Vec<RevisionEntry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
struct OpenCalendar {
    handle: Handle,
    qualifying: BTreeMap<NaiveDate, Vec<RevisionEntry>>,
    stage: CalendarStage,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarOverride {
    open: Option<OpenCalendar>,
}

impl CalendarOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// `other_value` is the opposite handle's timestamp. Dates without a
    /// revision on the permitted side of it stay disabled.
    pub fn open(&mut self, handle: Handle, index: Arc<TimestampIndex>, other_value: TimeMs) {
        self.force_close();

        let policy = SnappingPolicy::new(index);
        let mut qualifying: BTreeMap<NaiveDate, Vec<RevisionEntry>> = BTreeMap::new();
        for date in policy.index().dates() {
            let entries: Vec<RevisionEntry> = policy
                .index()
                .entries_on(date)
                .iter()
                .filter(|entry| policy.admits(handle, entry, other_value))
                .copied()
                .collect();
            if !entries.is_empty() {
                qualifying.insert(date, entries);
            }
        }

        self.open = Some(OpenCalendar {
            handle,
            qualifying,
            stage: CalendarStage::PickingDate,
        });
    }

    pub fn open_handle(&self) -> Option<Handle> {
        self.open.as_ref().map(|calendar| calendar.handle)
    }

    pub fn stage(&self) -> Option<&CalendarStage> {
        self.open.as_ref().map(|calendar| &calendar.stage)
    }

    pub fn is_enabled(&self, date: NaiveDate) -> bool {
        self.open
            .as_ref()
            .is_some_and(|calendar| calendar.qualifying.contains_key(&date))
    }

    pub fn enabled_dates(&self) -> Vec<NaiveDate> {
        self.open
            .as_ref()
            .map(|calendar| calendar.qualifying.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn pick_date(&mut self, date: NaiveDate) -> CalendarOutcome {
        let Some(calendar) = self.open.as_mut() else {
            return CalendarOutcome::Ignored;
        };
        let Some(candidates) = calendar.qualifying.get(&date) else {
            return CalendarOutcome::Ignored;
        };

        match candidates.as_slice() {
            [only] => {
                let entry = *only;
                self.force_close();
                CalendarOutcome::Apply(entry)
            }
            _ => {
                let candidates = candidates.clone();
                calendar.stage = CalendarStage::PickingTime {
                    date,
                    candidates: candidates.clone(),
                };
                CalendarOutcome::ChooseTime(candidates)
            }
        }
    }

    pub fn pick_time(&mut self, revid: u64) -> CalendarOutcome {
        let chosen = match self.stage() {
            Some(CalendarStage::PickingTime { candidates, .. }) => candidates
                .iter()
                .find(|entry| entry.revid == revid)
                .copied(),
            _ => None,
        };
        match chosen {
            Some(entry) => {
                self.force_close();
                CalendarOutcome::Apply(entry)
            }
            None => CalendarOutcome::Ignored,
        }
    }

    /// Outside click or slider movement.
    pub fn force_close(&mut self) {
        self.open = None;
    }

    /// Every day of `month` with its enabled flag. Empty for invalid months.
    pub fn month_grid(&self, year: i32, month: u32) -> Vec<CalendarDay> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| CalendarDay {
                date,
                enabled: self.is_enabled(date),
            })
            .collect()
    }
}

/// `(year, month)` moved by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + delta;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> TimeMs {
        TimeMs::parse_iso(text).unwrap()
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn index() -> Arc<TimestampIndex> {
        Arc::new(
            TimestampIndex::build([
                RevisionEntry::new(1, at("2020-02-10T12:00:00Z")),
                RevisionEntry::new(2, at("2020-03-01T09:00:00Z")),
                RevisionEntry::new(3, at("2020-03-01T17:00:00Z")),
                RevisionEntry::new(4, at("2020-03-05T08:00:00Z")),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn two_revisions_on_one_date_ask_for_time() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::End, index(), at("2020-02-10T12:00:00Z"));

        let outcome = calendar.pick_date(day(2020, 3, 1));
        let CalendarOutcome::ChooseTime(candidates) = outcome else {
            panic!("expected a time selection step, got {outcome:?}");
        };
        let revids: Vec<u64> = candidates.iter().map(|entry| entry.revid).collect();
        assert_eq!(revids, vec![2, 3]);
        assert!(matches!(
            calendar.stage(),
            Some(CalendarStage::PickingTime { .. })
        ));

        assert_eq!(
            calendar.pick_time(3),
            CalendarOutcome::Apply(RevisionEntry::new(3, at("2020-03-01T17:00:00Z")))
        );
        assert_eq!(calendar.open_handle(), None);
    }

    #[test]
    fn single_qualifying_revision_applies_directly() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::Start, index(), at("2020-03-05T08:00:00Z"));
        assert_eq!(
            calendar.pick_date(day(2020, 2, 10)),
            CalendarOutcome::Apply(RevisionEntry::new(1, at("2020-02-10T12:00:00Z")))
        );
        assert_eq!(calendar.stage(), None);
    }

    #[test]
    fn other_handle_narrows_candidates_on_shared_date() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::Start, index(), at("2020-03-01T17:00:00Z"));
        assert_eq!(
            calendar.pick_date(day(2020, 3, 1)),
            CalendarOutcome::Apply(RevisionEntry::new(2, at("2020-03-01T09:00:00Z")))
        );
    }

    #[test]
    fn dates_on_wrong_side_are_disabled() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::End, index(), at("2020-03-01T17:00:00Z"));
        assert_eq!(calendar.enabled_dates(), vec![day(2020, 3, 5)]);
        assert!(!calendar.is_enabled(day(2020, 2, 10)));
        assert_eq!(calendar.pick_date(day(2020, 2, 10)), CalendarOutcome::Ignored);
        assert_eq!(calendar.pick_date(day(2021, 1, 1)), CalendarOutcome::Ignored);
        assert_eq!(calendar.open_handle(), Some(Handle::End));
    }

    #[test]
    fn opening_one_handle_closes_the_other() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::End, index(), at("2020-02-10T12:00:00Z"));
        calendar.pick_date(day(2020, 3, 1));
        calendar.open(Handle::Start, index(), at("2020-03-05T08:00:00Z"));
        assert_eq!(calendar.open_handle(), Some(Handle::Start));
        assert_eq!(calendar.stage(), Some(&CalendarStage::PickingDate));
        assert_eq!(calendar.pick_time(3), CalendarOutcome::Ignored);
    }

    #[test]
    fn force_close_discards_pending_selection() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::End, index(), at("2020-02-10T12:00:00Z"));
        calendar.pick_date(day(2020, 3, 1));
        calendar.force_close();
        assert_eq!(calendar.pick_time(2), CalendarOutcome::Ignored);
        assert!(calendar.enabled_dates().is_empty());
    }

    #[test]
    fn month_grid_marks_enabled_days() {
        let mut calendar = CalendarOverride::new();
        calendar.open(Handle::End, index(), at("2020-02-10T12:00:00Z"));
        let grid = calendar.month_grid(2020, 3);
        assert_eq!(grid.len(), 31);
        let enabled: Vec<u32> = grid
            .iter()
            .filter(|cell| cell.enabled)
            .map(|cell| cell.date.day())
            .collect();
        assert_eq!(enabled, vec![1, 5]);
        assert_eq!(calendar.month_grid(2020, 2).len(), 29);
        assert!(calendar.month_grid(2020, 13).is_empty());
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2020, 12, 1), (2021, 1));
        assert_eq!(shift_month(2020, 1, -1), (2019, 12));
        assert_eq!(shift_month(2020, 5, 0), (2020, 5));
        assert_eq!(shift_month(2020, 5, -17), (2018, 12));
    }
}
