//! The in-memory host applies edits the way a real editor would.

use keyseq_host::{DecorationKind, Host, HostError, MemoryHost};
use keyseq_primitives::{Range, Selection};
use keyseq_state::ContextSink;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn insert_text_moves_every_cursor_past_the_insertion() {
	let host = MemoryHost::new();
	let ed = host.open("ab\ncd");
	host.set_selections(ed, Selection::new(Range::point(1), [Range::point(4)])).unwrap();

	host.insert_text(ed, "XY").unwrap();

	assert_eq!(host.contents(ed), "aXYb\ncXYd");
	let heads: Vec<usize> = host.selections(ed).unwrap().iter().map(|r| r.head).collect();
	assert_eq!(heads, [3, 8]);
}

#[test]
fn insert_char_leaves_cursors_in_place() {
	let host = MemoryHost::new();
	let ed = host.open("abc");
	host.set_selections(ed, Selection::point(1)).unwrap();
	host.insert_char(ed, '-').unwrap();
	assert_eq!(host.contents(ed), "a-bc");
	assert_eq!(host.selections(ed).unwrap().primary(), Range::point(1));
}

#[test]
fn replace_char_skips_line_ends() {
	let host = MemoryHost::new();
	let ed = host.open("ab\ncd");
	host.set_selections(ed, Selection::new(Range::point(0), [Range::point(2), Range::point(3)]))
		.unwrap();
	host.replace_char(ed, 'z').unwrap();
	assert_eq!(host.contents(ed), "zb\nzd");
}

#[test]
fn selections_are_clamped_to_the_document() {
	let host = MemoryHost::new();
	let ed = host.open("abc");
	host.set_selections(ed, Selection::single(1, 40)).unwrap();
	assert_eq!(host.selections(ed).unwrap().primary(), Range::new(1, 3));
}

#[test]
fn closed_editors_are_unknown() {
	let host = MemoryHost::new();
	let ed = host.open("abc");
	host.close(ed);
	assert_eq!(host.text(ed).unwrap_err(), HostError::UnknownEditor(ed));
	assert_eq!(host.active_editor(), None);
}

#[test]
fn decorations_and_context_are_observable() {
	let host = MemoryHost::new();
	let ed = host.open("abc");
	host.set_decorations(ed, DecorationKind::OtherMatches, vec![Range::new(0, 1)]);
	host.set_context("mode", &json!("normal"));
	assert_eq!(host.decorations(ed, DecorationKind::OtherMatches), [Range::new(0, 1)]);
	assert!(host.decorations(ed, DecorationKind::ActiveMatch).is_empty());
	assert_eq!(host.context("mode"), Some(json!("normal")));
}

#[tokio::test]
async fn execute_records_and_runs_handlers() {
	let host = MemoryHost::new();
	let ed = host.open("abc");
	host.register("cursorEnd", move |host, _| {
		host.set_selections(ed, Selection::point(3))
	});
	host.register("fail", |_, _| Err(HostError::command("fail", "boom")));

	host.execute("cursorEnd", &json!(null)).await.unwrap();
	host.execute("unknown", &json!({"x": 1})).await.unwrap();
	let err = host.execute("fail", &json!(null)).await.unwrap_err();

	assert_eq!(host.selections(ed).unwrap().primary(), Range::point(3));
	assert_eq!(err.to_string(), "command `fail` failed: boom");
	let names: Vec<String> = host.executed().into_iter().map(|(c, _)| c).collect();
	assert_eq!(names, ["cursorEnd", "unknown", "fail"]);
}
