//! Event streaming Relay
//!
//! A Relay is the sending half of an unbounded channel. UI handlers send
//! events into it and exactly one Actor loop consumes the receiving stream.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::sync::{Arc, OnceLock};

/// Typed event stream from UI code to an Actor.
///
/// Name relays after the event source: `date_changed_relay`,
/// `article_clicked_relay`, `cluster_selected_relay`.
///
/// In debug builds a relay remembers the first call site that sent into it
/// and panics when a second, different call site sends. Each event then has
/// a single place in the code it can originate from.
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
    #[cfg(debug_assertions)]
    emit_location: Arc<OnceLock<&'static std::panic::Location<'static>>>,
}

#[derive(Debug, Clone)]
pub enum RelayError {
    #[cfg(debug_assertions)]
    MultipleEmitters {
        previous: &'static std::panic::Location<'static>,
        current: &'static std::panic::Location<'static>,
    },
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (
            Relay {
                sender,
                #[cfg(debug_assertions)]
                emit_location: Arc::new(OnceLock::new()),
            },
            receiver,
        )
    }

    #[cfg(debug_assertions)]
    #[track_caller]
    fn check_single_source(&self) -> Result<(), RelayError> {
        let caller = std::panic::Location::caller();
        match self.emit_location.set(caller) {
            Ok(()) => Ok(()),
            Err(previous) if previous == caller => Ok(()),
            Err(previous) => Err(RelayError::MultipleEmitters {
                previous,
                current: caller,
            }),
        }
    }

    /// Send an event. Dropped silently once the consuming Actor is gone.
    #[track_caller]
    pub fn send(&self, value: T) {
        #[cfg(debug_assertions)]
        if let Err(error) = self.check_single_source() {
            panic!("{:?}", error);
        }

        let _ = self.sender.unbounded_send(value);
    }
}

/// Create a Relay together with the stream its Actor consumes.
///
/// ```rust
/// let (date_changed_relay, mut date_changed_stream) = relay::<NaiveDate>();
/// date_changed_relay.send(date);
/// while let Some(date) = date_changed_stream.next().await { /* .. */ }
/// ```
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}
