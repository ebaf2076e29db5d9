//! History of executed bindings.
//!
//! Every completed dispatch appends one [`HistoryEntry`]. Ranges of the log
//! are picked by evaluating [`Selector`] expressions against each entry,
//! newest first, and can be replayed directly or pushed onto a named macro
//! stack for later replay.

mod entry;
mod error;
mod log;
mod select;

pub use entry::HistoryEntry;
pub use error::HistoryError;
pub use log::History;
pub use select::Selector;
