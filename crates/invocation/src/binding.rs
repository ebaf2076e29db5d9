use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::CommandRef;

/// Stable identifier of a binding inside its store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub Arc<str>);

impl BindingId {
	/// Creates an id from any string.
	pub fn new(id: impl AsRef<str>) -> Self {
		Self(Arc::from(id.as_ref()))
	}

	/// Returns the id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for BindingId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for BindingId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// A key bound in one mode under one prefix, and what it runs.
///
/// Bindings are immutable once stored; interactive commands that edit their
/// own arguments are written back through
/// [`BindingStore::store_command`](crate::BindingStore::store_command), which
/// replaces the stored binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
	/// Unique id.
	pub id: BindingId,
	/// The key that triggers this binding, e.g. `"g"` or `"ctrl+d"`.
	pub key: String,
	/// Mode the binding is active in.
	pub mode: String,
	/// Prefix the key must be typed under (`0` is the empty prefix).
	pub prefix_code: u64,
	/// Commands run, in order, on each repetition.
	pub commands: Vec<CommandRef>,
	/// Extra repetitions; `0` runs once, negative values mean canceled.
	#[serde(default)]
	pub repeat: i64,
	/// Expression evaluated for the repeat count, overriding `repeat` when it succeeds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub repeat_expr: Option<String>,
	/// Whether this key completes a sequence and resets transient state.
	#[serde(default)]
	pub final_key: bool,
	/// Free-form labels, carried into history for selection expressions.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
	/// Human readable description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub doc: Option<String>,
}

impl Binding {
	/// Creates a non-final binding that runs `commands` once.
	pub fn new(
		id: impl AsRef<str>,
		key: impl Into<String>,
		mode: impl Into<String>,
		prefix_code: u64,
		commands: Vec<CommandRef>,
	) -> Self {
		Self {
			id: BindingId::new(id),
			key: key.into(),
			mode: mode.into(),
			prefix_code,
			commands,
			repeat: 0,
			repeat_expr: None,
			final_key: false,
			tags: Vec::new(),
			doc: None,
		}
	}

	/// Marks the binding as completing a key sequence.
	pub fn finished(mut self) -> Self {
		self.final_key = true;
		self
	}

	/// Sets the literal repeat count.
	pub fn with_repeat(mut self, repeat: i64) -> Self {
		self.repeat = repeat;
		self
	}

	/// Sets the repeat expression.
	pub fn with_repeat_expr(mut self, expr: impl Into<String>) -> Self {
		self.repeat_expr = Some(expr.into());
		self
	}

	/// Adds a tag.
	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	/// Sets the description.
	pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
		self.doc = Some(doc.into());
		self
	}

	/// Whether the binding is canceled, i.e. runs zero times.
	pub fn is_canceled(&self) -> bool {
		self.repeat < 0
	}

	/// Number of times the command list runs.
	pub fn runs(&self) -> u64 {
		u64::try_from(self.repeat).map_or(0, |r| r.saturating_add(1))
	}

	/// Short description for tracing/logging.
	pub fn describe(&self) -> String {
		let commands: Vec<String> = self.commands.iter().map(CommandRef::describe).collect();
		match self.repeat {
			0 => format!("{}[{}]:{} -> {}", self.mode, self.prefix_code, self.key, commands.join("; ")),
			n => format!("{}[{}]:{} -> {} x{}", self.mode, self.prefix_code, self.key, commands.join("; "), n + 1),
		}
	}
}
