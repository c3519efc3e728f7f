use crate::range_control::Handle;
use crate::timestamp_index::{SnapDirection, TimestampIndex};
use shared::{RevisionEntry, TimeMs};
use std::sync::Arc;

/// Resolves raw handle positions to revisions.
///
/// The start handle only accepts revisions strictly before the end handle and
/// the end handle only revisions strictly after the start handle, so a
/// resolved range never collapses or crosses.
#[derive(Debug, Clone)]
pub struct SnappingPolicy {
    index: Arc<TimestampIndex>,
}

impl SnappingPolicy {
    pub fn new(index: Arc<TimestampIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<TimestampIndex> {
        &self.index
    }

    /// `other_value` is the opposite handle's resolved timestamp.
    pub fn resolve(&self, handle: Handle, raw: TimeMs, other_value: TimeMs) -> RevisionEntry {
        *self
            .index
            .directional_snap(raw, handle.snap_direction(), other_value)
    }

    /// True when `entry` may be stored on `handle` given the other handle.
    pub fn admits(&self, handle: Handle, entry: &RevisionEntry, other_value: TimeMs) -> bool {
        let on_permitted_side = match handle.snap_direction() {
            SnapDirection::TowardPast => entry.timestamp < other_value,
            SnapDirection::TowardFuture => entry.timestamp > other_value,
        };
        on_permitted_side && self.index.contains(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SnappingPolicy {
        let index = TimestampIndex::build([
            RevisionEntry::new(10, TimeMs(1_000)),
            RevisionEntry::new(11, TimeMs(2_000)),
            RevisionEntry::new(12, TimeMs(3_000)),
            RevisionEntry::new(13, TimeMs(4_000)),
        ])
        .unwrap();
        SnappingPolicy::new(Arc::new(index))
    }

    #[test]
    fn start_never_reaches_end_bound() {
        let policy = policy();
        let resolved = policy.resolve(Handle::Start, TimeMs(3_900), TimeMs(3_000));
        assert_eq!(resolved.revid, 11);
    }

    #[test]
    fn end_never_reaches_start_bound() {
        let policy = policy();
        let resolved = policy.resolve(Handle::End, TimeMs(1_100), TimeMs(2_000));
        assert_eq!(resolved.revid, 12);
    }

    #[test]
    fn resolution_is_deterministic() {
        let policy = policy();
        let first = policy.resolve(Handle::Start, TimeMs(2_500), TimeMs(4_000));
        let second = policy.resolve(Handle::Start, TimeMs(2_500), TimeMs(4_000));
        assert_eq!(first, second);
        assert_eq!(first.revid, 11);
    }

    #[test]
    fn admits_only_indexed_entries_on_the_right_side() {
        let policy = policy();
        let entry = RevisionEntry::new(11, TimeMs(2_000));
        assert!(policy.admits(Handle::Start, &entry, TimeMs(3_000)));
        assert!(!policy.admits(Handle::Start, &entry, TimeMs(2_000)));
        assert!(policy.admits(Handle::End, &entry, TimeMs(1_000)));
        assert!(!policy.admits(Handle::End, &RevisionEntry::new(99, TimeMs(2_000)), TimeMs(1_000)));
    }
}
