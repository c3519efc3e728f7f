//! Revision range selection core.
//!
//! Everything the revision range selector decides without touching the DOM,
//! timers or the network lives here: the timestamp index, the snapping
//! policy, the two-handle range control, the calendar override and the
//! request coordinator state machine. The frontend drives these types and
//! performs the side effects they ask for.

pub mod calendar_override;
pub mod error;
pub mod range_control;
pub mod request_coordinator;
pub mod snapping;
pub mod timeline_axis;
pub mod timestamp_index;

pub use calendar_override::{CalendarDay, CalendarOutcome, CalendarOverride, CalendarStage, shift_month};
pub use error::HistoryError;
pub use range_control::{Handle, RangeChange, RangeControl, RangeState, RangeUpdate, SnapTransition};
pub use request_coordinator::{
    CoordinatorStatus, DebounceTimer, Dispatch, FetchFailure, RequestCoordinator, RequestTicket,
    ResponseOutcome, RevisionPair,
};
pub use snapping::SnappingPolicy;
pub use timeline_axis::{AxisLabel, AxisLabelKind, axis_labels};
pub use timestamp_index::{SnapDirection, TimestampIndex};

pub use shared::{RevisionEntry, TimeMs};
