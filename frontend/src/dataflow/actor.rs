//! Single-value Actor
//!
//! An Actor owns a `Mutable<T>` and the task that mutates it. The task
//! consumes Relay streams one event at a time, so every change to the value
//! happens in one place, in order.

use std::future::Future;
use std::sync::Arc;
use zoon::{Mutable, Signal, Task, TaskHandle};

/// Reactive value with a single owning processing loop.
///
/// ```rust
/// let (date_changed_relay, mut date_changed_stream) = relay();
/// let selected_date = Actor::new(default_date, async move |state| {
///     while let Some(date) = date_changed_stream.next().await {
///         state.set_neq(date);
///     }
/// });
/// ```
#[derive(Clone, Debug)]
pub struct Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    state: Mutable<T>,
    #[allow(dead_code)]
    task_handle: Arc<TaskHandle>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(Mutable<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Mutable::new(initial_state);
        let task_handle = Arc::new(Task::start_droppable(processor(state.clone())));
        Self { state, task_handle }
    }

    pub fn signal(&self) -> impl Signal<Item = T> + use<T> {
        self.state.signal_cloned()
    }
}
