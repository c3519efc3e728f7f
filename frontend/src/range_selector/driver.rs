//! One mounted range selector.
//!
//! The driver owns the pure range state for a single article and performs
//! the side effects it asks for: debounce timers, abortable fetches, pointer
//! listeners and the `visualization-loaded` DOM event. Every timer, task and
//! listener it starts holds only a `Weak` reference, so dropping the selector
//! (or calling `teardown`) stops all of them.

use super::animation::glide;
use crate::api::{ApiClient, ApiError};
use crate::error_display::InlineError;
use chrono::{Datelike, NaiveDate};
use gloo_timers::callback::Timeout;
use revision_range::{
    AxisLabel, CalendarDay, CalendarOutcome, CalendarOverride, CalendarStage, CoordinatorStatus,
    DebounceTimer, Dispatch, Handle, HistoryError, RangeChange, RangeControl, RequestCoordinator,
    RequestTicket, ResponseOutcome, RevisionEntry, RevisionPair, TimestampIndex, axis_labels,
    shift_month,
};
use serde::Serialize;
use shared::{ArticleId, RangeSelectorSection, TimeMs, VisualizationMetadata, VisualizationResponse};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::AbortController;
use zoon::*;

pub const VISUALIZATION_LOADED_EVENT: &str = "visualization-loaded";

#[derive(Debug, Clone, PartialEq)]
pub enum OutputState {
    Empty,
    Rendered {
        html: String,
        metadata: Option<VisualizationMetadata>,
    },
    Failed(InlineError),
}

/// What the calendar popup currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarView {
    pub handle: Handle,
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    pub stage: CalendarStage,
}

struct DomListener {
    target: web_sys::EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::PointerEvent)>,
}

pub struct RangeSelector {
    article_id: ArticleId,
    api: ApiClient,
    settings: RangeSelectorSection,
    full_range: (TimeMs, TimeMs),
    axis: Vec<AxisLabel>,

    control: RefCell<RangeControl>,
    coordinator: RefCell<RequestCoordinator>,
    calendar: RefCell<CalendarOverride>,

    debounce: RefCell<Option<Timeout>>,
    in_flight_abort: RefCell<Option<(RequestTicket, AbortController)>>,
    animations: [RefCell<Option<TaskHandle>>; 2],
    track: RefCell<Option<web_sys::Element>>,
    listeners: RefCell<Vec<DomListener>>,
    dragging: Cell<Option<Handle>>,
    torn_down: Cell<bool>,

    pub handle_positions: [Mutable<TimeMs>; 2],
    pub tooltips: [Mutable<String>; 2],
    pub calendar_view: Mutable<Option<CalendarView>>,
    pub output: Mutable<OutputState>,
    pub status: Mutable<CoordinatorStatus>,
}

impl RangeSelector {
    pub fn new(
        index: Arc<TimestampIndex>,
        article_id: ArticleId,
        api: ApiClient,
        settings: RangeSelectorSection,
    ) -> Result<Rc<Self>, HistoryError> {
        let control = RangeControl::initialize(index, settings.initial_window)?;
        let state = control.state();
        let full_range = control.full_range();
        let coordinator = RequestCoordinator::new(settings.debounce_ms);

        Ok(Rc::new(Self {
            article_id,
            api,
            settings,
            full_range,
            axis: axis_labels(full_range.0, full_range.1),
            control: RefCell::new(control),
            status: Mutable::new(coordinator.status()),
            coordinator: RefCell::new(coordinator),
            calendar: RefCell::new(CalendarOverride::new()),
            debounce: RefCell::new(None),
            in_flight_abort: RefCell::new(None),
            animations: [RefCell::new(None), RefCell::new(None)],
            track: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            dragging: Cell::new(None),
            torn_down: Cell::new(false),
            handle_positions: [
                Mutable::new(state.start_value()),
                Mutable::new(state.end_value()),
            ],
            tooltips: [
                Mutable::new(state.start_value().date_label()),
                Mutable::new(state.end_value().date_label()),
            ],
            calendar_view: Mutable::new(None),
            output: Mutable::new(OutputState::Empty),
        }))
    }

    /// Hook up window listeners and request the initial range.
    pub fn start(self: &Rc<Self>) {
        if let Some(window) = web_sys::window() {
            let moved = Rc::downgrade(self);
            self.listen(window.clone().into(), "pointermove", move |event| {
                if let Some(selector) = moved.upgrade() {
                    selector.pointer_moved(event.client_x() as f64);
                }
            });
            let released = Rc::downgrade(self);
            self.listen(window.into(), "pointerup", move |event| {
                if let Some(selector) = released.upgrade() {
                    selector.pointer_released(event.client_x() as f64);
                }
            });
        }
        self.schedule_resolution();
    }

    pub fn full_range(&self) -> (TimeMs, TimeMs) {
        self.full_range
    }

    pub fn axis(&self) -> &[AxisLabel] {
        &self.axis
    }

    // ===== POINTER INPUT =====

    pub fn track_mounted(self: &Rc<Self>, element: web_sys::Element) {
        let pressed = Rc::downgrade(self);
        self.listen(element.clone().into(), "pointerdown", move |event| {
            if event.button() != 0 {
                return;
            }
            event.prevent_default();
            if let Some(selector) = pressed.upgrade() {
                selector.pointer_pressed(event.client_x() as f64);
            }
        });
        *self.track.borrow_mut() = Some(element);
    }

    fn pointer_pressed(&self, client_x: f64) {
        let Some(raw) = self.time_at_client_x(client_x) else {
            return;
        };
        let handle = self.nearest_handle(raw);
        self.animations[handle.position()].borrow_mut().take();
        self.dragging.set(Some(handle));
        self.close_calendar();
        self.move_handle(handle, raw);
    }

    fn pointer_moved(&self, client_x: f64) {
        let Some(handle) = self.dragging.get() else {
            return;
        };
        if let Some(raw) = self.time_at_client_x(client_x) {
            self.move_handle(handle, raw);
        }
    }

    fn pointer_released(self: &Rc<Self>, client_x: f64) {
        let Some(handle) = self.dragging.take() else {
            return;
        };
        let raw = self
            .time_at_client_x(client_x)
            .map(|raw| self.clamp_against_other(handle, raw))
            .unwrap_or_else(|| self.handle_positions[handle.position()].get());
        self.settle_handle(handle, raw);
    }

    fn time_at_client_x(&self, client_x: f64) -> Option<TimeMs> {
        let track = self.track.borrow();
        let rect = track.as_ref()?.get_bounding_client_rect();
        if rect.width() <= 0.0 {
            return None;
        }
        let fraction = ((client_x - rect.left()) / rect.width()).clamp(0.0, 1.0);
        let (low, high) = self.full_range;
        let offset = ((high.millis() - low.millis()) as f64 * fraction).round() as i64;
        Some(TimeMs(low.millis() + offset))
    }

    fn nearest_handle(&self, raw: TimeMs) -> Handle {
        let start = self.handle_positions[Handle::Start.position()].get();
        let end = self.handle_positions[Handle::End.position()].get();
        let to_start = raw.abs_diff(start);
        let to_end = raw.abs_diff(end);
        if to_start < to_end || (to_start == to_end && raw <= start) {
            Handle::Start
        } else {
            Handle::End
        }
    }

    // Handles may touch while dragging but never pass each other.
    fn clamp_against_other(&self, handle: Handle, raw: TimeMs) -> TimeMs {
        let other = self.handle_positions[handle.opposite().position()].get();
        match handle {
            Handle::Start => raw.min(other),
            Handle::End => raw.max(other),
        }
    }

    fn move_handle(&self, handle: Handle, raw: TimeMs) {
        let raw = self.clamp_against_other(handle, raw);
        self.handle_positions[handle.position()].set_neq(raw);
        let update = self.control.borrow().preview(handle, raw);
        self.tooltips[handle.position()].set_neq(update.candidate.timestamp.date_label());
    }

    fn settle_handle(self: &Rc<Self>, handle: Handle, raw: TimeMs) {
        let change = self.control.borrow_mut().set_handle(handle, raw);
        self.show_change(change, true);
        self.schedule_resolution();
    }

    fn show_change(&self, change: RangeChange, animate: bool) {
        let position = change.handle.position();
        self.tooltips[position].set_neq(change.snapped.timestamp.date_label());

        let mut animation = self.animations[position].borrow_mut();
        if animate && change.raw != change.snapped.timestamp {
            *animation = Some(glide(
                self.handle_positions[position].clone(),
                change.transition(self.settings.transition_steps),
                self.settings.transition_frame_ms,
            ));
        } else {
            *animation = None;
            self.handle_positions[position].set_neq(change.snapped.timestamp);
        }
    }

    // ===== REQUESTS =====

    fn schedule_resolution(self: &Rc<Self>) {
        if let Some(timer) = self.debounce.borrow_mut().take() {
            timer.cancel();
        }

        let timer = self.coordinator.borrow_mut().settled();
        self.refresh_status();

        let selector = Rc::downgrade(self);
        let timeout = Timeout::new(timer.delay_ms, move || {
            if let Some(selector) = selector.upgrade() {
                selector.debounce_elapsed(timer);
            }
        });
        *self.debounce.borrow_mut() = Some(timeout);
    }

    fn debounce_elapsed(self: &Rc<Self>, timer: DebounceTimer) {
        *self.debounce.borrow_mut() = None;
        if self.torn_down.get() {
            return;
        }

        let pair = self.control.borrow().state().pair();
        let dispatch = self.coordinator.borrow_mut().timer_fired(timer, pair);
        self.refresh_status();

        match dispatch {
            Some(dispatch) => self.dispatch(dispatch),
            None => zoon::println!(
                "Revisions {}..{} already requested, skipping",
                pair.start_revid,
                pair.end_revid
            ),
        }
    }

    fn dispatch(self: &Rc<Self>, dispatch: Dispatch) {
        if let Some(superseded) = dispatch.supersedes {
            self.abort_request(superseded);
        }

        let ticket = dispatch.ticket;
        let controller = match AbortController::new() {
            Ok(controller) => Some(controller),
            Err(error) => {
                zoon::eprintln!("AbortController unavailable, request #{} cannot be aborted: {:?}", ticket.generation(), error);
                None
            }
        };
        let signal = controller.as_ref().map(AbortController::signal);
        if let Some(controller) = controller {
            *self.in_flight_abort.borrow_mut() = Some((ticket, controller));
        }

        let pair = ticket.pair();
        zoon::println!(
            "Requesting visualization #{} for revisions {}..{}",
            ticket.generation(),
            pair.start_revid,
            pair.end_revid
        );

        let selector = Rc::downgrade(self);
        let api = self.api.clone();
        let article_id = self.article_id.clone();
        Task::start(async move {
            let still_current = selector
                .upgrade()
                .is_some_and(|selector| selector.coordinator.borrow().is_current(&ticket));
            if !still_current {
                return;
            }

            let result = api
                .fetch_visualization(&article_id, pair, signal.as_ref())
                .await;

            if let Some(selector) = selector.upgrade() {
                selector.response_arrived(ticket, result);
            }
        });
    }

    fn abort_request(&self, ticket: RequestTicket) {
        let mut slot = self.in_flight_abort.borrow_mut();
        if slot.as_ref().is_some_and(|(active, _)| *active == ticket) {
            if let Some((_, controller)) = slot.take() {
                zoon::println!("Aborting visualization request #{}", ticket.generation());
                controller.abort();
            }
        }
    }

    fn response_arrived(&self, ticket: RequestTicket, result: Result<VisualizationResponse, ApiError>) {
        if self.torn_down.get() {
            return;
        }
        {
            let mut slot = self.in_flight_abort.borrow_mut();
            if slot.as_ref().is_some_and(|(active, _)| *active == ticket) {
                *slot = None;
            }
        }

        let outcome = self
            .coordinator
            .borrow_mut()
            .response_arrived(ticket, result.map_err(ApiError::into_fetch_failure));
        self.refresh_status();

        match outcome {
            ResponseOutcome::Discard => {
                zoon::println!("Discarding visualization response #{}", ticket.generation());
            }
            ResponseOutcome::Render(response) => {
                self.output.set(OutputState::Rendered {
                    html: response.html,
                    metadata: response.metadata,
                });
                dispatch_loaded_event(ticket.pair());
            }
            ResponseOutcome::RenderError(message) => {
                let error = InlineError::new_visualization_error(message);
                error.log();
                self.output.set(OutputState::Failed(error));
            }
        }
    }

    fn refresh_status(&self) {
        self.status.set_neq(self.coordinator.borrow().status());
    }

    // ===== CALENDAR =====

    pub fn tooltip_clicked(&self, handle: Handle) {
        if self.calendar.borrow().open_handle() == Some(handle) {
            self.close_calendar();
            return;
        }

        let (index, state) = {
            let control = self.control.borrow();
            (control.index().clone(), control.state())
        };
        self.calendar
            .borrow_mut()
            .open(handle, index, state.value(handle.opposite()));

        let shown = state.value(handle).date();
        self.show_calendar_month(shown.year(), shown.month());
    }

    pub fn calendar_month_shifted(&self, delta: i32) {
        let shown = self
            .calendar_view
            .lock_ref()
            .as_ref()
            .map(|view| (view.year, view.month));
        if let Some((year, month)) = shown {
            let (year, month) = shift_month(year, month, delta);
            self.show_calendar_month(year, month);
        }
    }

    pub fn calendar_date_picked(self: &Rc<Self>, date: NaiveDate) {
        let Some(handle) = self.calendar.borrow().open_handle() else {
            return;
        };
        let outcome = self.calendar.borrow_mut().pick_date(date);
        self.calendar_outcome(handle, outcome);
    }

    pub fn calendar_time_picked(self: &Rc<Self>, revid: u64) {
        let Some(handle) = self.calendar.borrow().open_handle() else {
            return;
        };
        let outcome = self.calendar.borrow_mut().pick_time(revid);
        self.calendar_outcome(handle, outcome);
    }

    pub fn calendar_dismissed(&self) {
        self.close_calendar();
    }

    fn calendar_outcome(self: &Rc<Self>, handle: Handle, outcome: CalendarOutcome) {
        match outcome {
            CalendarOutcome::Ignored => {}
            CalendarOutcome::ChooseTime(candidates) => {
                zoon::println!("{} revisions on the picked date, asking for a time", candidates.len());
                if let Some(view) = self.calendar_view.get_cloned() {
                    self.show_calendar_month(view.year, view.month);
                }
            }
            CalendarOutcome::Apply(entry) => self.apply_calendar_entry(handle, entry),
        }
    }

    fn apply_calendar_entry(self: &Rc<Self>, handle: Handle, entry: RevisionEntry) {
        self.close_calendar();
        self.animations[handle.position()].borrow_mut().take();
        let change = self.control.borrow_mut().apply_entry(handle, entry);
        self.show_change(change, false);
        self.schedule_resolution();
    }

    fn show_calendar_month(&self, year: i32, month: u32) {
        let calendar = self.calendar.borrow();
        let view = calendar
            .open_handle()
            .zip(calendar.stage())
            .map(|(handle, stage)| CalendarView {
                handle,
                year,
                month,
                days: calendar.month_grid(year, month),
                stage: stage.clone(),
            });
        self.calendar_view.set(view);
    }

    fn close_calendar(&self) {
        self.calendar.borrow_mut().force_close();
        self.calendar_view.set_neq(None);
    }

    // ===== LIFECYCLE =====

    fn listen(
        &self,
        target: web_sys::EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::PointerEvent) + 'static,
    ) {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::PointerEvent)>);
        if let Err(error) =
            target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            zoon::eprintln!("Failed to listen for {}: {:?}", event, error);
            return;
        }
        self.listeners.borrow_mut().push(DomListener {
            target,
            event,
            closure,
        });
    }

    /// Cancel the pending timer, abort the in-flight fetch and remove every
    /// listener. Safe to call more than once.
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }

        if let Some(timer) = self.debounce.borrow_mut().take() {
            timer.cancel();
        }
        if let Some(ticket) = self.coordinator.borrow_mut().reset() {
            zoon::println!("Selector torn down with request #{} in flight", ticket.generation());
        }
        if let Some((_, controller)) = self.in_flight_abort.borrow_mut().take() {
            controller.abort();
        }
        self.refresh_status();

        for animation in &self.animations {
            animation.borrow_mut().take();
        }
        self.close_calendar();

        for listener in self.listeners.borrow_mut().drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.closure.as_ref().unchecked_ref(),
            );
        }
        self.track.borrow_mut().take();
    }
}

impl Drop for RangeSelector {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisualizationLoadedDetail {
    start_revid: u64,
    end_revid: u64,
}

fn dispatch_loaded_event(pair: RevisionPair) {
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let detail = VisualizationLoadedDetail {
        start_revid: pair.start_revid,
        end_revid: pair.end_revid,
    };
    let detail = match serde_wasm_bindgen::to_value(&detail) {
        Ok(detail) => detail,
        Err(error) => {
            zoon::eprintln!("Failed to encode {} detail: {}", VISUALIZATION_LOADED_EVENT, error);
            return;
        }
    };

    let init = web_sys::CustomEventInit::new();
    init.set_detail(&detail);
    match web_sys::CustomEvent::new_with_event_init_dict(VISUALIZATION_LOADED_EVENT, &init) {
        Ok(event) => {
            let _ = document.dispatch_event(&event);
        }
        Err(error) => {
            zoon::eprintln!("Failed to create {} event: {:?}", VISUALIZATION_LOADED_EVENT, error);
        }
    }
}
