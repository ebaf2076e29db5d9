use keyseq_primitives::{EditorId, Selection};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::args::SearchArgs;
use crate::navigate::Landing;

/// Identifies a search state: one per editor and register.
pub type SearchKey = (EditorId, String);

/// Mutable record of the last search in one register of one editor.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
	/// Arguments of the last search.
	pub args: SearchArgs,
	/// Text searched for so far.
	pub text: String,
	/// Selections when the search began; incremental updates restart from here.
	pub search_from: Selection,
	/// Set by every navigation, cleared after each completed command.
	pub modified: bool,
	/// Where the last navigation placed each cursor.
	pub landings: Vec<Landing>,
	/// Whether match highlights are currently shown.
	pub highlighted: bool,
}

impl SearchState {
	/// Creates an empty state starting from `search_from`.
	pub fn new(search_from: Selection) -> Self {
		Self {
			args: SearchArgs::default(),
			text: String::new(),
			search_from,
			modified: false,
			landings: Vec::new(),
			highlighted: false,
		}
	}
}

/// All search states, created lazily and dropped when their editor closes.
#[derive(Debug, Default)]
pub struct SearchStates {
	states: FxHashMap<SearchKey, SearchState>,
}

impl SearchStates {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// State for `register` in `editor`, if a search ran there.
	pub fn get(&self, editor: EditorId, register: &str) -> Option<&SearchState> {
		self.states.get(&(editor, register.to_string()))
	}

	/// Mutable state for `register` in `editor`, created from `search_from` on first use.
	pub fn entry(&mut self, editor: EditorId, register: &str, search_from: impl FnOnce() -> Selection) -> &mut SearchState {
		self.states
			.entry((editor, register.to_string()))
			.or_insert_with(|| SearchState::new(search_from()))
	}

	/// Mutable state for `register` in `editor`, if present.
	pub fn get_mut(&mut self, editor: EditorId, register: &str) -> Option<&mut SearchState> {
		self.states.get_mut(&(editor, register.to_string()))
	}

	/// Drops every state of `editor`; returns how many were dropped.
	pub fn remove_editor(&mut self, editor: EditorId) -> usize {
		let before = self.states.len();
		self.states.retain(|(id, _), _| *id != editor);
		let removed = before - self.states.len();
		if removed > 0 {
			debug!(%editor, removed, "dropped search states");
		}
		removed
	}

	/// Runs after every completed command.
	///
	/// States that no navigation touched since the previous call lose their
	/// highlights; the editors whose highlights must be cleared are returned.
	/// Every `modified` flag is then cleared.
	pub fn after_command(&mut self) -> Vec<EditorId> {
		let mut stale: Vec<EditorId> = Vec::new();
		for ((editor, _), state) in &mut self.states {
			if !state.modified && state.highlighted {
				state.highlighted = false;
				if !stale.contains(editor) {
					stale.push(*editor);
				}
			}
			state.modified = false;
		}
		stale.sort_unstable();
		stale
	}

	/// Number of live states.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	/// Whether no search has run.
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}
}
