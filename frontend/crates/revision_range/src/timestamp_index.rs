//! Sorted, date-bucketed view over one article's revisions.
//!
//! Built once per article load and shared read-only afterwards. All lookups
//! are binary searches over the timestamp-sorted entries.

use crate::error::HistoryError;
use chrono::NaiveDate;
use shared::{RevisionEntry, TimeMs};
use std::collections::BTreeMap;

/// Which side of a bound a snapped entry must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapDirection {
    /// Strictly before the bound.
    TowardPast,
    /// Strictly after the bound.
    TowardFuture,
}

#[derive(Debug, Clone)]
pub struct TimestampIndex {
    sorted_entries: Vec<RevisionEntry>,
    entries_by_date: BTreeMap<NaiveDate, Vec<RevisionEntry>>,
}

impl TimestampIndex {
    pub fn build(entries: impl IntoIterator<Item = RevisionEntry>) -> Result<Self, HistoryError> {
        let mut sorted_entries: Vec<RevisionEntry> = entries.into_iter().collect();
        if sorted_entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        sorted_entries.sort_by_key(|entry| (entry.timestamp, entry.revid));
        sorted_entries.dedup();

        let mut entries_by_date: BTreeMap<NaiveDate, Vec<RevisionEntry>> = BTreeMap::new();
        for entry in &sorted_entries {
            entries_by_date
                .entry(entry.timestamp.date())
                .or_default()
                .push(*entry);
        }

        Ok(Self {
            sorted_entries,
            entries_by_date,
        })
    }

    pub fn len(&self) -> usize {
        self.sorted_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_entries.is_empty()
    }

    pub fn entries(&self) -> &[RevisionEntry] {
        &self.sorted_entries
    }

    pub fn earliest(&self) -> &RevisionEntry {
        &self.sorted_entries[0]
    }

    pub fn latest(&self) -> &RevisionEntry {
        &self.sorted_entries[self.sorted_entries.len() - 1]
    }

    /// `[earliest, latest]` timestamps, the track of the range control.
    pub fn full_range(&self) -> (TimeMs, TimeMs) {
        (self.earliest().timestamp, self.latest().timestamp)
    }

    /// The `n`-th most recent entry, or the earliest when there are fewer
    /// than `n` entries. `n == 1` is the latest entry.
    pub fn nth_most_recent(&self, n: usize) -> &RevisionEntry {
        let position = self.sorted_entries.len().saturating_sub(n.max(1));
        &self.sorted_entries[position]
    }

    pub fn entries_on(&self, date: NaiveDate) -> &[RevisionEntry] {
        self.entries_by_date
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries_by_date.keys().copied()
    }

    pub fn distinct_timestamps(&self) -> usize {
        let mut count = 0;
        let mut previous = None;
        for entry in &self.sorted_entries {
            if previous != Some(entry.timestamp) {
                count += 1;
                previous = Some(entry.timestamp);
            }
        }
        count
    }

    pub fn contains(&self, entry: &RevisionEntry) -> bool {
        self.sorted_entries
            .binary_search_by_key(&(entry.timestamp, entry.revid), |candidate| {
                (candidate.timestamp, candidate.revid)
            })
            .is_ok()
    }

    /// Entry closest to `target`; ties go to the earlier timestamp.
    pub fn nearest_entry(&self, target: TimeMs) -> &RevisionEntry {
        Self::nearest_in(&self.sorted_entries, target)
    }

    /// Entry closest to `target` among those strictly before (`TowardPast`) or
    /// strictly after (`TowardFuture`) `bound`. When no entry lies on the
    /// permitted side the earliest (`TowardPast`) or latest (`TowardFuture`)
    /// entry is returned instead.
    pub fn directional_snap(
        &self,
        target: TimeMs,
        direction: SnapDirection,
        bound: TimeMs,
    ) -> &RevisionEntry {
        match direction {
            SnapDirection::TowardPast => {
                let end = self
                    .sorted_entries
                    .partition_point(|entry| entry.timestamp < bound);
                if end == 0 {
                    self.earliest()
                } else {
                    Self::nearest_in(&self.sorted_entries[..end], target)
                }
            }
            SnapDirection::TowardFuture => {
                let start = self
                    .sorted_entries
                    .partition_point(|entry| entry.timestamp <= bound);
                if start == self.sorted_entries.len() {
                    self.latest()
                } else {
                    Self::nearest_in(&self.sorted_entries[start..], target)
                }
            }
        }
    }

    // `candidates` is sorted and non-empty.
    fn nearest_in(candidates: &[RevisionEntry], target: TimeMs) -> &RevisionEntry {
        let split = candidates.partition_point(|entry| entry.timestamp < target);
        let chosen = if split == 0 {
            candidates[0].timestamp
        } else if split == candidates.len() {
            candidates[split - 1].timestamp
        } else {
            let below = candidates[split - 1].timestamp;
            let above = candidates[split].timestamp;
            if target.abs_diff(below) <= above.abs_diff(target) {
                below
            } else {
                above
            }
        };
        let first = candidates.partition_point(|entry| entry.timestamp < chosen);
        &candidates[first]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> TimeMs {
        TimeMs::parse_iso(text).unwrap()
    }

    fn entry(revid: u64, text: &str) -> RevisionEntry {
        RevisionEntry::new(revid, at(text))
    }

    fn three_revisions() -> TimestampIndex {
        TimestampIndex::build([
            entry(3, "2021-01-01T00:00:00Z"),
            entry(1, "2020-01-01T00:00:00Z"),
            entry(2, "2020-06-01T00:00:00Z"),
        ])
        .unwrap()
    }

    #[test]
    fn empty_history_is_rejected() {
        let result = TimestampIndex::build(Vec::new());
        assert_eq!(result.unwrap_err(), HistoryError::Empty);
    }

    #[test]
    fn entries_are_sorted_ascending() {
        let index = three_revisions();
        let revids: Vec<u64> = index.entries().iter().map(|entry| entry.revid).collect();
        assert_eq!(revids, vec![1, 2, 3]);
        assert_eq!(
            index.full_range(),
            (at("2020-01-01T00:00:00Z"), at("2021-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn buckets_entries_by_calendar_date() {
        let index = TimestampIndex::build([
            entry(2, "2020-03-01T17:00:00Z"),
            entry(1, "2020-03-01T09:00:00Z"),
            entry(3, "2020-03-02T00:00:00Z"),
        ])
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let revids: Vec<u64> = index.entries_on(day).iter().map(|entry| entry.revid).collect();
        assert_eq!(revids, vec![1, 2]);
        assert_eq!(index.dates().count(), 2);
        assert!(index.entries_on(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()).is_empty());
    }

    #[test]
    fn nearest_entry_breaks_ties_toward_earlier() {
        let index = TimestampIndex::build([
            RevisionEntry::new(1, TimeMs(100)),
            RevisionEntry::new(2, TimeMs(200)),
        ])
        .unwrap();
        assert_eq!(index.nearest_entry(TimeMs(150)).revid, 1);
        assert_eq!(index.nearest_entry(TimeMs(151)).revid, 2);
        assert_eq!(index.nearest_entry(TimeMs(-5)).revid, 1);
        assert_eq!(index.nearest_entry(TimeMs(10_000)).revid, 2);
    }

    #[test]
    fn start_handle_snaps_strictly_before_end_bound() {
        let index = three_revisions();
        let snapped = index.directional_snap(
            at("2020-12-31T00:00:00Z"),
            SnapDirection::TowardPast,
            at("2021-01-01T00:00:00Z"),
        );
        assert_eq!(snapped.timestamp, at("2020-06-01T00:00:00Z"));
    }

    #[test]
    fn end_handle_snaps_strictly_after_start_bound() {
        let index = three_revisions();
        let snapped = index.directional_snap(
            at("2019-01-01T00:00:00Z"),
            SnapDirection::TowardFuture,
            at("2020-01-01T00:00:00Z"),
        );
        assert_eq!(snapped.revid, 2);
    }

    #[test]
    fn directional_snap_falls_back_to_extremes() {
        let index = three_revisions();
        let past = index.directional_snap(
            at("2020-06-01T00:00:00Z"),
            SnapDirection::TowardPast,
            at("2019-01-01T00:00:00Z"),
        );
        assert_eq!(past.revid, 1);

        let future = index.directional_snap(
            at("2020-06-01T00:00:00Z"),
            SnapDirection::TowardFuture,
            at("2022-01-01T00:00:00Z"),
        );
        assert_eq!(future.revid, 3);
    }

    #[test]
    fn identical_timestamps_resolve_to_first_entry() {
        let index = TimestampIndex::build([
            RevisionEntry::new(7, TimeMs(500)),
            RevisionEntry::new(5, TimeMs(500)),
            RevisionEntry::new(9, TimeMs(900)),
        ])
        .unwrap();
        assert_eq!(index.nearest_entry(TimeMs(480)).revid, 5);
        assert_eq!(index.distinct_timestamps(), 2);
    }

    #[test]
    fn nth_most_recent_clamps_to_earliest() {
        let index = three_revisions();
        assert_eq!(index.nth_most_recent(10).revid, 1);
        assert_eq!(index.nth_most_recent(2).revid, 2);
        assert_eq!(index.nth_most_recent(1).revid, 3);
    }

    #[test]
    fn contains_checks_revid_and_timestamp() {
        let index = three_revisions();
        assert!(index.contains(&entry(2, "2020-06-01T00:00:00Z")));
        assert!(!index.contains(&entry(2, "2020-06-02T00:00:00Z")));
        assert!(!index.contains(&entry(8, "2020-06-01T00:00:00Z")));
    }

    // Linear reference used to cross-check the binary searches.
    fn reference_snap(
        entries: &[RevisionEntry],
        target: TimeMs,
        direction: SnapDirection,
        bound: TimeMs,
    ) -> Option<RevisionEntry> {
        entries
            .iter()
            .filter(|entry| match direction {
                SnapDirection::TowardPast => entry.timestamp < bound,
                SnapDirection::TowardFuture => entry.timestamp > bound,
            })
            .min_by_key(|entry| (entry.timestamp.abs_diff(target), entry.timestamp, entry.revid))
            .copied()
    }

    #[test]
    fn directional_snap_matches_linear_search() {
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for round in 0..200 {
            let count = 1 + (next() % 12) as usize;
            let entries: Vec<RevisionEntry> = (0..count)
                .map(|revid| RevisionEntry::new(revid as u64 + round, TimeMs((next() % 50) as i64 * 10)))
                .collect();
            let index = TimestampIndex::build(entries.clone()).unwrap();

            for _ in 0..20 {
                let target = TimeMs((next() % 600) as i64 - 50);
                let bound = TimeMs((next() % 600) as i64 - 50);
                for direction in [SnapDirection::TowardPast, SnapDirection::TowardFuture] {
                    let snapped = *index.directional_snap(target, direction, bound);
                    assert!(index.contains(&snapped));
                    match reference_snap(&entries, target, direction, bound) {
                        Some(expected) => assert_eq!(snapped, expected),
                        None => {
                            let extreme = match direction {
                                SnapDirection::TowardPast => *index.earliest(),
                                SnapDirection::TowardFuture => *index.latest(),
                            };
                            assert_eq!(snapped, extreme);
                        }
                    }
                }
            }
        }
    }
}
