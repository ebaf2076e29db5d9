use std::collections::VecDeque;

use keyseq_invocation::{Evaluator, Scope};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::entry::HistoryEntry;
use crate::error::HistoryError;
use crate::select::Selector;

/// The history log plus named macro stacks.
#[derive(Debug, Default)]
pub struct History {
	entries: VecDeque<HistoryEntry>,
	macros: FxHashMap<String, Vec<Vec<HistoryEntry>>>,
}

impl History {
	/// Creates an empty history.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `entry`, dropping the oldest entries beyond `max_history`.
	pub fn store_binding(&mut self, entry: HistoryEntry, max_history: usize) {
		trace!(binding = %entry.binding_id, repeat = entry.repeat, "history entry");
		self.entries.push_back(entry);
		self.trim(max_history);
	}

	/// Drops the oldest entries beyond `max_history`.
	pub fn trim(&mut self, max_history: usize) {
		let excess = self.entries.len().saturating_sub(max_history);
		if excess > 0 {
			self.entries.drain(..excess);
		}
	}

	/// Entries `from..=to`, oldest first.
	pub fn history_range(&self, from: usize, to: usize) -> Vec<HistoryEntry> {
		if from > to || to >= self.entries.len() {
			return Vec::new();
		}
		self.entries.range(from..=to).cloned().collect()
	}

	/// Resolves `selector` and returns the selected entries.
	pub fn select(
		&self,
		selector: &Selector,
		evaluator: &dyn Evaluator,
		base: &Scope,
	) -> Result<Vec<HistoryEntry>, HistoryError> {
		let (from, to) = selector.resolve(self, evaluator, base)?;
		debug!(from, to, "selected history range");
		Ok(self.history_range(from, to))
	}

	/// Appends typed text to the edit payload of the newest entry.
	pub fn record_edit(&mut self, text: &str) -> bool {
		match self.entries.back_mut() {
			Some(entry) => {
				entry.edit.get_or_insert_with(String::new).push_str(text);
				true
			}
			None => false,
		}
	}

	/// Pushes a replayable segment onto macro stack `name`.
	pub fn push_macro(&mut self, name: &str, entries: Vec<HistoryEntry>) {
		let stack = self.macros.entry(name.to_string()).or_default();
		stack.push(entries);
		debug!(name, depth = stack.len(), "pushed macro");
	}

	/// Segment `index` places below the top of stack `name` (`0` is the top).
	pub fn get_macro(&self, name: &str, index: usize) -> Option<&[HistoryEntry]> {
		let stack = self.macros.get(name)?;
		let pos = stack.len().checked_sub(index + 1)?;
		stack.get(pos).map(Vec::as_slice)
	}

	/// Depth of stack `name`.
	pub fn macro_depth(&self, name: &str) -> usize {
		self.macros.get(name).map_or(0, Vec::len)
	}

	/// Entry at `index`, oldest first.
	pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
		self.entries.get(index)
	}

	/// Entries, oldest first.
	pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
