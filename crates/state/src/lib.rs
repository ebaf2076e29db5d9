//! Key-sequence state store.
//!
//! * [`StateStore`]: cloneable handle to the single sequential mutation stream
//! * [`State`]: the mutable map a transform sees while it runs on the stream
//! * [`StateSnapshot`]: immutable, versioned view returned after every transform
//! * [`Subscription`]: unsubscribe handle for `on_set` listeners
//!
//! Every mutation is a closure submitted to one actor task, so transforms
//! apply strictly in submission order and are never partially visible.

mod error;
pub mod keys;
mod listeners;
mod snapshot;
mod state;
mod store;

pub use error::StateError;
pub use listeners::{SetEvent, Subscription};
pub use snapshot::StateSnapshot;
pub use state::{SetOptions, State};
pub use store::{ContextSink, NullContextSink, StateStore};

/// Values stored in the state map.
pub type Value = serde_json::Value;
