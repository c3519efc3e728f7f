//! Dataflow primitives for the app shell
//!
//! - **[`Relay`]** - typed event stream from UI to Actors
//! - **[`Actor`]** - single value owned by one processing loop
//!
//! Relays follow the `{source}_{event}_relay` naming pattern.

pub mod actor;
pub mod relay;

pub use actor::Actor;
pub use relay::{Relay, relay};
