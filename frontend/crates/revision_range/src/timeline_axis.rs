//! Month and year ticks under the slider track.

use chrono::{Datelike, NaiveDate};
use shared::TimeMs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLabelKind {
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub text: String,
    /// Position within the track, `0.0..=100.0`.
    pub offset_percent: f64,
    pub kind: AxisLabelKind,
}

/// Spans of up to two calendar years get a label per month plus a year label
/// on each January 1st. Longer spans get yearly labels, every fifth year
/// beyond ten years. Labels falling outside `[start, end]` are dropped.
pub fn axis_labels(start: TimeMs, end: TimeMs) -> Vec<AxisLabel> {
    if end <= start {
        return Vec::new();
    }
    let first_year = start.date().year();
    let last_year = end.date().year();
    let years_apart = last_year - first_year;

    let mut labels = Vec::new();
    let mut push = |date: NaiveDate, text: String, kind: AxisLabelKind| {
        let at = TimeMs::start_of_day(date);
        if at < start || at > end {
            return;
        }
        let offset_percent =
            (at.millis() - start.millis()) as f64 / (end.millis() - start.millis()) as f64 * 100.0;
        labels.push(AxisLabel {
            text,
            offset_percent,
            kind,
        });
    };

    if years_apart <= 2 {
        for year in first_year..=last_year {
            for month in 1..=12 {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                    push(date, date.format("%b").to_string(), AxisLabelKind::Month);
                }
            }
            if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
                push(new_year, year.to_string(), AxisLabelKind::Year);
            }
        }
    } else {
        let step = if years_apart <= 10 { 1 } else { 5 };
        for year in (first_year..=last_year).step_by(step) {
            if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
                push(new_year, year.to_string(), AxisLabelKind::Year);
            }
        }
    }
    labels
}
