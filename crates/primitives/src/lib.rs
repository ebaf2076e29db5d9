//! Core types shared across the keyseq engine: ranges, selections, editor ids and cursor shapes.

/// Cursor shapes a mode or prefix can request from the host.
pub mod cursor;
/// Identifier types for host entities.
pub mod ids;
/// Space-delimited key sequence helpers.
pub mod keys;
/// Char-indexed text ranges.
pub mod range;
/// Multi-cursor selections.
pub mod selection;

pub use cursor::CursorShape;
pub use ids::EditorId;
pub use keys::join_keys;
pub use range::{CharIdx, CharLen, Direction, Range};
pub use selection::Selection;
