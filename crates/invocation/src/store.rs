use std::sync::Arc;

use keyseq_primitives::CursorShape;
use serde::{Deserialize, Serialize};

use crate::binding::{Binding, BindingId};
use crate::command::CommandRef;
use crate::error::ResolveError;
use crate::eval::Scope;

/// What happens to a key with no binding in a mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhenNoBinding {
	/// Drop the key and reset transient state.
	#[default]
	Ignore,
	/// Type printable keys into the document, then reset transient state.
	InsertCharacters,
}

/// Per-mode metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeInfo {
	/// Mode name.
	pub name: String,
	/// Cursor shape applied when the mode becomes active.
	#[serde(default)]
	pub cursor_shape: CursorShape,
	/// Handling of unbound keys.
	#[serde(default)]
	pub when_no_binding: WhenNoBinding,
}

impl ModeInfo {
	/// Creates mode metadata with the default cursor and unbound-key handling.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			cursor_shape: CursorShape::default(),
			when_no_binding: WhenNoBinding::default(),
		}
	}

	/// Sets the cursor shape.
	pub fn with_cursor(mut self, shape: CursorShape) -> Self {
		self.cursor_shape = shape;
		self
	}

	/// Sets unbound-key handling.
	pub fn when_no_binding(mut self, handling: WhenNoBinding) -> Self {
		self.when_no_binding = handling;
		self
	}
}

/// The binding table as seen by the dispatcher.
///
/// Parsing binding files into this table is the embedder's business; the
/// engine only looks bindings up, resolves their commands, and writes back
/// arguments edited by interactive commands.
pub trait BindingStore: Send + Sync {
	/// Finds the binding for `key` typed under `prefix_code` in `mode`.
	fn lookup(&self, prefix_code: u64, mode: &str, key: &str) -> Option<Arc<Binding>>;

	/// Finds a binding by id.
	fn binding(&self, id: &BindingId) -> Option<Arc<Binding>>;

	/// Bindings reachable from `prefix_code` in `mode`, for next-key suggestions.
	fn bindings_under(&self, prefix_code: u64, mode: &str) -> Vec<Arc<Binding>>;

	/// Returns command `index` of binding `id` with computed arguments evaluated against `scope`.
	fn resolve_command(&self, id: &BindingId, index: usize, scope: &Scope) -> Result<CommandRef, ResolveError>;

	/// Replaces command `index` of binding `id`.
	fn store_command(&self, id: &BindingId, index: usize, command: CommandRef) -> Result<(), ResolveError>;

	/// The mode the engine starts in.
	fn default_mode(&self) -> String;

	/// Metadata for `mode`, if the mode is known.
	fn mode_info(&self, mode: &str) -> Option<ModeInfo>;
}
