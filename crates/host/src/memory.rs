use std::collections::BTreeMap;
use std::ops::Range as LineRange;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyseq_primitives::{CharIdx, CursorShape, EditorId, Range, Selection};
use keyseq_state::ContextSink;
use parking_lot::Mutex;
use ropey::Rope;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::trace;

use crate::{DecorationKind, Host, HostError};

/// Handler for a host command registered on a [`MemoryHost`].
pub type CommandHandler = Arc<dyn Fn(&MemoryHost, &Value) -> Result<(), HostError> + Send + Sync>;

#[derive(Debug, Clone)]
struct Document {
	text: Rope,
	selection: Selection,
	visible: Option<LineRange<usize>>,
	decorations: FxHashMap<DecorationKind, Vec<Range>>,
}

#[derive(Debug, Default)]
struct HostState {
	editors: BTreeMap<EditorId, Document>,
	active: Option<EditorId>,
	next_id: u64,
	cursor: CursorShape,
	statuses: Vec<String>,
	errors: Vec<String>,
	context: FxHashMap<String, Value>,
	executed: Vec<(String, Value)>,
}

/// A rope-backed host keeping every effect observable.
///
/// Host commands are recorded in [`executed`](Self::executed); those with a
/// registered handler also run it.
#[derive(Default)]
pub struct MemoryHost {
	state: Mutex<HostState>,
	handlers: Mutex<FxHashMap<String, CommandHandler>>,
}

impl MemoryHost {
	/// Creates a host with no editors.
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens an editor over `text` with a cursor at 0 and focuses it.
	pub fn open(&self, text: &str) -> EditorId {
		let mut state = self.state.lock();
		let id = EditorId(state.next_id);
		state.next_id += 1;
		state.editors.insert(
			id,
			Document {
				text: Rope::from_str(text),
				selection: Selection::point(0),
				visible: None,
				decorations: FxHashMap::default(),
			},
		);
		state.active = Some(id);
		id
	}

	/// Closes `editor`.
	pub fn close(&self, editor: EditorId) {
		let mut state = self.state.lock();
		state.editors.remove(&editor);
		if state.active == Some(editor) {
			state.active = state.editors.keys().next().copied();
		}
	}

	/// Focuses `editor`.
	pub fn focus(&self, editor: EditorId) {
		self.state.lock().active = Some(editor);
	}

	/// Restricts the visible line range of `editor`; by default every line is visible.
	pub fn set_visible(&self, editor: EditorId, lines: LineRange<usize>) {
		if let Some(doc) = self.state.lock().editors.get_mut(&editor) {
			doc.visible = Some(lines);
		}
	}

	/// Registers the handler run for `command`.
	pub fn register<F>(&self, command: &str, handler: F)
	where
		F: Fn(&MemoryHost, &Value) -> Result<(), HostError> + Send + Sync + 'static,
	{
		self.handlers.lock().insert(command.to_string(), Arc::new(handler));
	}

	/// Text of `editor` as a `String`.
	pub fn contents(&self, editor: EditorId) -> String {
		self.state
			.lock()
			.editors
			.get(&editor)
			.map(|doc| doc.text.to_string())
			.unwrap_or_default()
	}

	/// Current decorations of `kind` in `editor`.
	pub fn decorations(&self, editor: EditorId, kind: DecorationKind) -> Vec<Range> {
		self.state
			.lock()
			.editors
			.get(&editor)
			.and_then(|doc| doc.decorations.get(&kind).cloned())
			.unwrap_or_default()
	}

	/// The last cursor shape set.
	pub fn cursor_shape(&self) -> CursorShape {
		self.state.lock().cursor
	}

	/// Every status message shown so far.
	pub fn statuses(&self) -> Vec<String> {
		self.state.lock().statuses.clone()
	}

	/// Every error notification shown so far.
	pub fn errors(&self) -> Vec<String> {
		self.state.lock().errors.clone()
	}

	/// Last published value of a context key.
	pub fn context(&self, key: &str) -> Option<Value> {
		self.state.lock().context.get(key).cloned()
	}

	/// Host commands executed so far, in order.
	pub fn executed(&self) -> Vec<(String, Value)> {
		self.state.lock().executed.clone()
	}

	/// Runs `f` on the document of `editor`.
	fn with_doc<R>(&self, editor: EditorId, f: impl FnOnce(&mut Document) -> R) -> Result<R, HostError> {
		let mut state = self.state.lock();
		let doc = state.editors.get_mut(&editor).ok_or(HostError::UnknownEditor(editor))?;
		Ok(f(doc))
	}
}

/// Inserts `text` at every point, shifting positions after each insertion.
///
/// With `cursors_follow`, a position equal to an insertion point moves past
/// the inserted text; otherwise it stays in front of it.
fn insert_at(doc: &mut Document, points: &[CharIdx], text: &str, cursors_follow: bool) {
	let len = text.chars().count();
	let mut sorted: Vec<CharIdx> = points.iter().map(|&p| p.min(doc.text.len_chars())).collect();
	sorted.sort_unstable();
	sorted.dedup();
	for &point in sorted.iter().rev() {
		doc.text.insert(point, text);
	}
	let shift = |pos: CharIdx| {
		let before = sorted
			.iter()
			.filter(|&&p| if cursors_follow { p <= pos } else { p < pos })
			.count();
		pos + before * len
	};
	doc.selection = doc.selection.transform(|r| r.map(shift));
}

impl ContextSink for MemoryHost {
	fn set_context(&self, key: &str, value: &Value) {
		self.state.lock().context.insert(key.to_string(), value.clone());
	}
}

#[async_trait]
impl Host for MemoryHost {
	fn active_editor(&self) -> Option<EditorId> {
		self.state.lock().active
	}

	fn text(&self, editor: EditorId) -> Result<Rope, HostError> {
		self.with_doc(editor, |doc| doc.text.clone())
	}

	fn selections(&self, editor: EditorId) -> Result<Selection, HostError> {
		self.with_doc(editor, |doc| doc.selection.clone())
	}

	fn set_selections(&self, editor: EditorId, selection: Selection) -> Result<(), HostError> {
		self.with_doc(editor, |doc| {
			let mut selection = selection;
			selection.clamp(doc.text.len_chars());
			doc.selection = selection;
		})
	}

	fn insert_text(&self, editor: EditorId, text: &str) -> Result<(), HostError> {
		self.with_doc(editor, |doc| {
			let points: Vec<CharIdx> = doc.selection.iter().map(|r| r.anchor).collect();
			insert_at(doc, &points, text, true);
		})
	}

	fn replace_char(&self, editor: EditorId, ch: char) -> Result<(), HostError> {
		self.with_doc(editor, |doc| {
			let mut buf = [0u8; 4];
			let replacement: &str = ch.encode_utf8(&mut buf);
			let mut heads: Vec<CharIdx> = doc.selection.iter().map(|r| r.head).collect();
			heads.sort_unstable();
			heads.dedup();
			for &head in heads.iter().rev() {
				if head >= doc.text.len_chars() || doc.text.char(head) == '\n' {
					continue;
				}
				doc.text.remove(head..head + 1);
				doc.text.insert(head, replacement);
			}
		})
	}

	fn insert_char(&self, editor: EditorId, ch: char) -> Result<(), HostError> {
		self.with_doc(editor, |doc| {
			let mut buf = [0u8; 4];
			let points: Vec<CharIdx> = doc.selection.iter().map(|r| r.head).collect();
			insert_at(doc, &points, ch.encode_utf8(&mut buf), false);
		})
	}

	fn visible_lines(&self, editor: EditorId) -> Result<Vec<LineRange<usize>>, HostError> {
		self.with_doc(editor, |doc| {
			let all = 0..doc.text.len_lines();
			vec![doc.visible.clone().unwrap_or(all)]
		})
	}

	fn set_decorations(&self, editor: EditorId, kind: DecorationKind, ranges: Vec<Range>) {
		let _ = self.with_doc(editor, |doc| {
			doc.decorations.insert(kind, ranges);
		});
	}

	fn set_cursor_shape(&self, shape: CursorShape) {
		self.state.lock().cursor = shape;
	}

	fn show_status(&self, text: &str, _duration: Duration) {
		self.state.lock().statuses.push(text.to_string());
	}

	fn notify_error(&self, message: &str) {
		self.state.lock().errors.push(message.to_string());
	}

	async fn execute(&self, command: &str, args: &Value) -> Result<(), HostError> {
		trace!(command, %args, "host command");
		self.state.lock().executed.push((command.to_string(), args.clone()));
		let handler = self.handlers.lock().get(command).cloned();
		match handler {
			Some(handler) => handler(self, args),
			None => Ok(()),
		}
	}
}

impl std::fmt::Debug for MemoryHost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("MemoryHost")
			.field("editors", &state.editors.len())
			.field("active", &state.active)
			.finish()
	}
}
