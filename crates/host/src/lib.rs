//! The host editor as seen by the engine.
//!
//! Buffer mutation, rendering and command execution belong to the host. The
//! engine reaches them only through [`Host`]; [`MemoryHost`] is a rope-backed
//! implementation for tests and headless embedders.

mod error;
mod memory;

use std::ops::Range as LineRange;
use std::time::Duration;

use async_trait::async_trait;
use keyseq_primitives::{CursorShape, EditorId, Range, Selection};
use keyseq_state::ContextSink;
use ropey::Rope;
use serde_json::Value;

pub use error::HostError;
pub use memory::{CommandHandler, MemoryHost};

/// Which search highlight a decoration set replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
	/// The match the cursor landed on.
	ActiveMatch,
	/// Other visible matches.
	OtherMatches,
}

/// Editor operations the engine needs from its host.
///
/// Context values published through [`ContextSink`] feed the host's
/// when-clauses and status bar.
#[async_trait]
pub trait Host: ContextSink {
	/// The focused editor, if any.
	fn active_editor(&self) -> Option<EditorId>;

	/// Full text of `editor`.
	fn text(&self, editor: EditorId) -> Result<Rope, HostError>;

	/// Current selections of `editor`.
	fn selections(&self, editor: EditorId) -> Result<Selection, HostError>;

	/// Replaces the selections of `editor`.
	fn set_selections(&self, editor: EditorId, selection: Selection) -> Result<(), HostError>;

	/// Inserts `text` at the anchor of every selection; cursors move past the insertion.
	fn insert_text(&self, editor: EditorId, text: &str) -> Result<(), HostError>;

	/// Replaces the character under every cursor with `ch`.
	fn replace_char(&self, editor: EditorId, ch: char) -> Result<(), HostError>;

	/// Inserts `ch` before every cursor without moving the cursors.
	fn insert_char(&self, editor: EditorId, ch: char) -> Result<(), HostError>;

	/// Line ranges currently visible on screen.
	fn visible_lines(&self, editor: EditorId) -> Result<Vec<LineRange<usize>>, HostError>;

	/// Replaces the decorations of `kind` in `editor`; an empty list clears them.
	fn set_decorations(&self, editor: EditorId, kind: DecorationKind, ranges: Vec<Range>);

	/// Changes the cursor style.
	fn set_cursor_shape(&self, shape: CursorShape);

	/// Shows `text` in the status bar for `duration`.
	fn show_status(&self, text: &str, duration: Duration);

	/// Shows an error notification.
	fn notify_error(&self, message: &str);

	/// Runs a host command that is not an engine builtin.
	async fn execute(&self, command: &str, args: &Value) -> Result<(), HostError>;
}
