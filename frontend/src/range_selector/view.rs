use super::driver::{CalendarView, OutputState, RangeSelector};
use crate::error_display::inline_error_view;
use chrono::{Datelike, NaiveDate};
use revision_range::{AxisLabelKind, CalendarDay, CalendarStage, CoordinatorStatus, Handle, RevisionEntry};
use shared::{TimeMs, VisualizationMetadata, VisualizationSource};
use std::rc::Rc;
use zoon::*;

const TRACK_COLOR: &str = "rgb(226, 232, 240)";
const RANGE_COLOR: &str = "rgb(96, 165, 250)";
const HANDLE_COLOR: &str = "rgb(37, 99, 235)";
const MUTED_TEXT: &str = "rgb(100, 116, 139)";
const WEEKDAYS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

pub fn range_selector_view(selector: Rc<RangeSelector>) -> impl Element {
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(12))
        .item(slider(&selector))
        .item(axis(&selector))
        .item(loading_marker(&selector))
        .item(output(&selector))
}

fn percent_of(range: (TimeMs, TimeMs), value: TimeMs) -> f64 {
    let (low, high) = range;
    if high <= low {
        return 0.0;
    }
    ((value.millis() - low.millis()) as f64 / (high.millis() - low.millis()) as f64 * 100.0)
        .clamp(0.0, 100.0)
}

fn position_signal(selector: &RangeSelector, handle: Handle) -> impl Signal<Item = String> + use<> {
    let range = selector.full_range();
    selector.handle_positions[handle.position()]
        .signal()
        .map(move |value| format!("{:.3}%", percent_of(range, value)))
}

fn slider(selector: &Rc<RangeSelector>) -> impl Element + use<> {
    let range = selector.full_range();
    let selected_left = position_signal(selector, Handle::Start);
    let selected_width = map_ref! {
        let start = selector.handle_positions[Handle::Start.position()].signal(),
        let end = selector.handle_positions[Handle::End.position()].signal() =>
        format!("{:.3}%", percent_of(range, *end) - percent_of(range, *start))
    };

    Stack::new()
        .s(Width::fill())
        .s(Height::exact(56))
        .s(Padding::new().x(8))
        .update_raw_el({
            let selector = selector.clone();
            move |raw_el| {
                selector.track_mounted(raw_el.dom_element().into());
                raw_el
                    .style("position", "relative")
                    .style("touch-action", "none")
                    .style("user-select", "none")
                    .style("cursor", "pointer")
            }
        })
        .layer(
            El::new()
                .s(Width::fill())
                .s(Height::exact(6))
                .s(RoundedCorners::all(3))
                .s(Background::new().color(TRACK_COLOR))
                .update_raw_el(|raw_el| raw_el.style("position", "absolute").style("top", "36px")),
        )
        .layer(
            El::new()
                .s(Height::exact(6))
                .s(Background::new().color(RANGE_COLOR))
                .update_raw_el(move |raw_el| {
                    raw_el
                        .style("position", "absolute")
                        .style("top", "36px")
                        .style_signal("left", selected_left)
                        .style_signal("width", selected_width)
                }),
        )
        .layer(knob(selector, Handle::Start))
        .layer(knob(selector, Handle::End))
        .layer(tooltip(selector, Handle::Start))
        .layer(tooltip(selector, Handle::End))
}

fn knob(selector: &Rc<RangeSelector>, handle: Handle) -> impl Element + use<> {
    let left = position_signal(selector, handle);
    El::new()
        .s(Width::exact(16))
        .s(Height::exact(16))
        .s(RoundedCorners::all_max())
        .s(Background::new().color(HANDLE_COLOR))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("position", "absolute")
                .style("top", "31px")
                .style("transform", "translateX(-50%)")
                .style("box-shadow", "0 1px 3px rgba(15, 23, 42, 0.35)")
                .style_signal("left", left)
        })
}

/// Date label above a handle. Clicking it opens the calendar for that handle.
fn tooltip(selector: &Rc<RangeSelector>, handle: Handle) -> impl Element + use<> {
    let left = position_signal(selector, handle);
    El::new()
        .s(Padding::new().x(6).y(2))
        .s(RoundedCorners::all(3))
        .s(Background::new().color("rgb(30, 41, 59)"))
        .s(Font::new().size(12).color("rgb(248, 250, 252)").no_wrap())
        .s(Cursor::new(CursorIcon::Pointer))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("position", "absolute")
                .style("top", "0")
                .style("transform", "translateX(-50%)")
                .style_signal("left", left)
                .attr("title", "Pick an exact revision date")
                .event_handler(|event: PointerDown| {
                    event.stop_propagation();
                })
        })
        .child(Text::with_signal(
            selector.tooltips[handle.position()].signal_cloned(),
        ))
        .on_click({
            let selector = selector.clone();
            move || selector.tooltip_clicked(handle)
        })
}

fn axis(selector: &Rc<RangeSelector>) -> impl Element + use<> {
    let labels = selector.axis().to_vec();
    Stack::new()
        .s(Width::fill())
        .s(Height::exact(18))
        .s(Padding::new().x(8))
        .update_raw_el(|raw_el| raw_el.style("position", "relative"))
        .layers(labels.into_iter().map(|label| {
            let weight = match label.kind {
                AxisLabelKind::Year => FontWeight::SemiBold,
                AxisLabelKind::Month => FontWeight::Regular,
            };
            El::new()
                .s(Font::new().size(11).weight(weight).color(MUTED_TEXT).no_wrap())
                .update_raw_el(move |raw_el| {
                    raw_el
                        .style("position", "absolute")
                        .style("left", &format!("{:.3}%", label.offset_percent))
                        .style("transform", "translateX(-50%)")
                })
                .child(Text::new(label.text))
        }))
        .layer(calendar_slot(selector))
}

fn calendar_slot(selector: &Rc<RangeSelector>) -> impl Element + use<> {
    let selector = selector.clone();
    El::new().child_signal(
        selector
            .calendar_view
            .signal_cloned()
            .map(move |view| view.map(|view| calendar_popup(&selector, view))),
    )
}

fn calendar_popup(selector: &Rc<RangeSelector>, view: CalendarView) -> impl Element + use<> {
    let overlay = El::new()
        .update_raw_el(|raw_el| {
            raw_el
                .style("position", "fixed")
                .style("inset", "0")
                .style("z-index", "999")
                .style("background-color", "rgba(0,0,0,0)")
        })
        .on_pointer_down({
            let selector = selector.clone();
            move || selector.calendar_dismissed()
        });

    let side = match view.handle {
        Handle::Start => "left",
        Handle::End => "right",
    };
    let title = match view.handle {
        Handle::Start => "Start revision",
        Handle::End => "End revision",
    };
    let month_label = NaiveDate::from_ymd_opt(view.year, view.month, 1)
        .map(|first| first.format("%B %Y").to_string())
        .unwrap_or_default();

    let panel = Column::new()
        .s(Gap::new().y(6))
        .s(Padding::all(10))
        .s(RoundedCorners::all(6))
        .s(Background::new().color("rgb(255, 255, 255)"))
        .s(Borders::all(Border::new().width(1).color(TRACK_COLOR)))
        .update_raw_el({
            let selector = selector.clone();
            move |raw_el| {
                raw_el
                    .style("position", "absolute")
                    .style("top", "4px")
                    .style(side, "0")
                    .style("z-index", "1000")
                    .style("box-shadow", "0 8px 24px rgba(15, 23, 42, 0.18)")
                    .global_event_handler(move |event: KeyDown| {
                        if event.key() == "Escape" {
                            selector.calendar_dismissed();
                        }
                    })
            }
        })
        .item(
            El::new()
                .s(Font::new().size(12).weight(FontWeight::SemiBold).color(MUTED_TEXT))
                .child(Text::new(title)),
        )
        .item(
            Row::new()
                .s(Gap::new().x(8))
                .s(Align::new().center_y())
                .item(month_button(selector, "‹", -1))
                .item(
                    El::new()
                        .s(Width::exact(140))
                        .s(Font::new().size(13).weight(FontWeight::SemiBold).center())
                        .child(Text::new(month_label)),
                )
                .item(month_button(selector, "›", 1)),
        )
        .item(Row::new().items(WEEKDAYS.iter().map(|weekday| {
            El::new()
                .s(Width::exact(32))
                .s(Font::new().size(11).color(MUTED_TEXT).center())
                .child(Text::new(*weekday))
        })))
        .items(month_rows(&view.days).into_iter().map(|week| {
            Row::new().items(week.into_iter().map(|day| day_cell(selector, day)))
        }))
        .item(match view.stage {
            CalendarStage::PickingTime { date, candidates } => {
                Some(time_choices(selector, date, candidates))
            }
            CalendarStage::PickingDate => None,
        });

    Stack::new()
        .update_raw_el(|raw_el| raw_el.style("position", "absolute").style("inset", "0"))
        .layer(overlay)
        .layer(panel)
}

fn month_button(selector: &Rc<RangeSelector>, label: &'static str, delta: i32) -> impl Element + use<> {
    El::new()
        .s(Padding::new().x(8).y(2))
        .s(RoundedCorners::all(4))
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Font::new().size(14))
        .child(Text::new(label))
        .on_click({
            let selector = selector.clone();
            move || selector.calendar_month_shifted(delta)
        })
}

/// Days split into Monday-first weeks, padded with `None`.
fn month_rows(days: &[CalendarDay]) -> Vec<Vec<Option<CalendarDay>>> {
    let leading = days
        .first()
        .map(|day| day.date.weekday().num_days_from_monday() as usize)
        .unwrap_or(0);
    let mut cells: Vec<Option<CalendarDay>> = vec![None; leading];
    cells.extend(days.iter().copied().map(Some));
    while cells.len() % 7 != 0 {
        cells.push(None);
    }
    cells.chunks(7).map(<[_]>::to_vec).collect()
}

fn day_cell(selector: &Rc<RangeSelector>, day: Option<CalendarDay>) -> impl Element + use<> {
    let enabled = day.is_some_and(|day| day.enabled);
    let label = day.map(|day| day.date.day().to_string()).unwrap_or_default();
    El::new()
        .s(Width::exact(32))
        .s(Height::exact(28))
        .s(RoundedCorners::all(4))
        .s(Background::new().color(if enabled { "rgb(219, 234, 254)" } else { "transparent" }))
        .s(Font::new()
            .size(12)
            .center()
            .color(if enabled { "rgb(15, 23, 42)" } else { "rgb(203, 213, 225)" }))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("cursor", if enabled { "pointer" } else { "default" })
                .style("line-height", "28px")
        })
        .child(Text::new(label))
        .on_click({
            let selector = selector.clone();
            move || {
                if let Some(day) = day.filter(|day| day.enabled) {
                    selector.calendar_date_picked(day.date);
                }
            }
        })
}

fn time_choices(selector: &Rc<RangeSelector>, date: NaiveDate, candidates: Vec<RevisionEntry>) -> impl Element + use<> {
    Column::new()
        .s(Gap::new().y(4))
        .s(Padding::new().top(6))
        .item(
            El::new()
                .s(Font::new().size(12).color(MUTED_TEXT))
                .child(Text::new(format!(
                    "{} revisions on {}:",
                    candidates.len(),
                    date.format("%Y-%m-%d")
                ))),
        )
        .item(Row::new().s(Gap::new().x(4)).multiline().items(candidates.into_iter().map(|entry| {
            El::new()
                .s(Padding::new().x(8).y(3))
                .s(RoundedCorners::all(4))
                .s(Background::new().color("rgb(219, 234, 254)"))
                .s(Font::new().size(12))
                .s(Cursor::new(CursorIcon::Pointer))
                .update_raw_el(move |raw_el| raw_el.attr("title", &format!("Revision {}", entry.revid)))
                .child(Text::new(entry.timestamp.time_of_day_label()))
                .on_click({
                    let selector = selector.clone();
                    move || selector.calendar_time_picked(entry.revid)
                })
        })))
}

fn loading_marker(selector: &Rc<RangeSelector>) -> impl Element + use<> {
    El::new()
        .s(Font::new().size(12).color(MUTED_TEXT))
        .child_signal(selector.status.signal().map(|status| {
            (status == CoordinatorStatus::InFlight).then(|| Text::new("Loading comparison…"))
        }))
}

fn output(selector: &Rc<RangeSelector>) -> impl Element + use<> {
    El::new()
        .s(Width::fill())
        .child_signal(selector.output.signal_cloned().map(|output| match output {
            OutputState::Empty => El::new()
                .s(Font::new().size(13).color(MUTED_TEXT))
                .child(Text::new("Pick a range to compare revisions."))
                .unify(),
            OutputState::Rendered { html, metadata } => Column::new()
                .s(Width::fill())
                .s(Gap::new().y(6))
                .item(metadata.map(metadata_line))
                .item(El::new().s(Width::fill()).update_raw_el(move |raw_el| {
                    raw_el.dom_element().set_inner_html(&html);
                    raw_el
                }))
                .unify(),
            OutputState::Failed(error) => inline_error_view(error).unify(),
        }))
}

fn metadata_line(metadata: VisualizationMetadata) -> impl Element {
    let source = match metadata.source {
        Some(VisualizationSource::Cache) => " · from cache",
        Some(VisualizationSource::Generated) => " · freshly generated",
        Some(VisualizationSource::Unknown) | None => "",
    };
    let timing = metadata
        .generation_time
        .map(|seconds| format!("Generated in {:.2} s", seconds))
        .unwrap_or_else(|| "Generated".to_string());
    El::new()
        .s(Font::new().size(11).color(MUTED_TEXT))
        .child(Text::new(format!("{}{}", timing, source)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_to_track() {
        let range = (TimeMs(1_000), TimeMs(3_000));
        assert_eq!(percent_of(range, TimeMs(2_000)), 50.0);
        assert_eq!(percent_of(range, TimeMs(0)), 0.0);
        assert_eq!(percent_of(range, TimeMs(9_000)), 100.0);
        assert_eq!(percent_of((TimeMs(5), TimeMs(5)), TimeMs(5)), 0.0);
    }

    #[test]
    fn month_rows_start_on_monday() {
        // March 2020 starts on a Sunday.
        let days: Vec<CalendarDay> = (1..=31)
            .map(|day| CalendarDay {
                date: NaiveDate::from_ymd_opt(2020, 3, day).unwrap(),
                enabled: day == 1,
            })
            .collect();
        let rows = month_rows(&days);
        assert!(rows.iter().all(|row| row.len() == 7));
        assert_eq!(rows[0].iter().filter(|cell| cell.is_none()).count(), 6);
        assert_eq!(rows[0][6].map(|day| day.date.day()), Some(1));
        assert_eq!(rows.iter().flatten().flatten().count(), 31);
    }
}
