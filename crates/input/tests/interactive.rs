//! Commands that wait for typed input, search navigation, and replay.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Engine, bind, cmd, config, store};
use keyseq_host::{DecorationKind, Host};
use keyseq_input::{Command, CommandCx, CommandError, CommandRegistry, DispatchOutcome};
use keyseq_invocation::{Binding, BindingId, BindingStore, CommandRef, ModeInfo, Resolved, WhenNoBinding};
use keyseq_primitives::{Range, Selection};
use keyseq_state::{SetOptions, keys};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

/// Captures keys with an update callback that panics on the first key.
struct BrokenCapture;

#[async_trait]
impl Command for BrokenCapture {
	fn name(&self) -> &'static str {
		"brokenCapture"
	}

	fn is_interactive(&self, _args: &Value) -> bool {
		true
	}

	async fn run(&self, cx: CommandCx<'_>, _args: &Value) -> Result<Resolved<Value>, CommandError> {
		cx.dispatcher.capture_keys(|_, _| panic!("unreadable key")).await?;
		Ok(Resolved::completed())
	}
}

async fn until_mode(engine: &Engine, mode: &str) {
	while engine.dispatcher.state().current().mode() != mode {
		tokio::task::yield_now().await;
	}
}

fn head(engine: &Engine) -> usize {
	engine.host.selections(engine.editor).unwrap().primary().head
}

#[tokio::test]
async fn captured_text_is_written_back_onto_the_binding() {
	let engine = Engine::new("abc", vec![bind("c", vec![cmd("captureKeys", json!({"acceptAfter": 2}))])]);

	let pending = engine.press_in_background("c");
	engine.until_capturing().await;
	assert!(engine.dispatcher.type_text("ab"));

	assert_eq!(pending.await.unwrap(), DispatchOutcome::Completed);
	let snapshot = engine.dispatcher.state().snapshot().await.unwrap();
	assert_eq!((snapshot.captured(), snapshot.mode()), ("ab", "normal"));
	let stored = engine.store.binding(&BindingId::new("c")).unwrap();
	assert_eq!(stored.commands[0].args, json!({"text": "ab", "acceptAfter": 2}));
	assert_eq!(engine.dispatcher.history_entries()[0].commands, stored.commands);
}

#[tokio::test]
async fn leaving_capture_mode_cancels_the_waiting_binding() {
	let engine = Engine::new(
		"abc",
		vec![
			bind("c", vec![CommandRef::bare("captureKeys")]),
			Binding::new("esc", "escape", "capture", 0, vec![cmd("setMode", json!({"value": "normal"}))]).finished(),
		],
	);

	let pending = engine.press_in_background("c");
	until_mode(&engine, "capture").await;
	engine.dispatcher.type_text("x");

	assert_eq!(engine.press("escape").await, DispatchOutcome::Completed);
	assert_eq!(pending.await.unwrap(), DispatchOutcome::Canceled);

	assert_eq!(engine.dispatcher.state().current().mode(), "normal");
	let ids: Vec<String> = engine
		.dispatcher
		.history_entries()
		.iter()
		.map(|e| e.binding_id.to_string())
		.collect();
	assert_eq!(ids, ["esc"]);
}

#[tokio::test]
async fn panicking_capture_leaves_capture_mode() {
	let mut registry = CommandRegistry::builtin();
	registry.register(Arc::new(BrokenCapture));
	let engine = Engine::build(
		config(),
		"abc",
		store(vec![
			bind("b", vec![CommandRef::bare("brokenCapture")]),
			bind("c", vec![cmd("captureKeys", json!({"acceptAfter": 2}))]),
		]),
		registry,
	);

	let pending = engine.press_in_background("b");
	until_mode(&engine, "capture").await;
	assert!(engine.dispatcher.type_text("x"));
	assert_eq!(pending.await.unwrap(), DispatchOutcome::Failed);

	assert!(!engine.dispatcher.is_capturing());
	assert_eq!(engine.dispatcher.state().snapshot().await.unwrap().mode(), "normal");
	assert!(engine.host.errors()[0].contains("unreadable key"));

	let next = engine.press_in_background("c");
	engine.until_capturing().await;
	assert!(engine.dispatcher.type_text("ok"));
	assert_eq!(next.await.unwrap(), DispatchOutcome::Completed);
}

#[tokio::test]
async fn aborted_dispatch_releases_the_capture() {
	let engine = Engine::new("abc", vec![bind("c", vec![cmd("captureKeys", json!({"acceptAfter": 2}))])]);

	let pending = engine.press_in_background("c");
	until_mode(&engine, "capture").await;
	pending.abort();
	assert!(pending.await.unwrap_err().is_cancelled());

	assert_eq!(engine.dispatcher.state().snapshot().await.unwrap().mode(), "normal");
	assert!(!engine.dispatcher.is_capturing());
	assert!(!engine.dispatcher.type_text("a"));

	let next = engine.press_in_background("c");
	engine.until_capturing().await;
	assert!(engine.dispatcher.type_text("ok"));
	assert_eq!(next.await.unwrap(), DispatchOutcome::Completed);
}

#[tokio::test]
async fn text_typed_past_a_capture_goes_to_the_restored_mode() {
	let store = store(vec![
		Binding::new("r", "r", "insert", 0, vec![CommandRef::bare("replaceChar")]).finished(),
	])
	.with_mode(ModeInfo::new("insert").when_no_binding(WhenNoBinding::InsertCharacters));
	let engine = Engine::build(config(), "abc", store, CommandRegistry::builtin());
	engine.dispatcher.state().set(keys::MODE, "insert", SetOptions::default()).await.unwrap();

	let pending = engine.press_in_background("r");
	engine.until_capturing().await;
	assert!(engine.dispatcher.type_text("xyz"));
	assert_eq!(pending.await.unwrap(), DispatchOutcome::Completed);

	assert_eq!(engine.host.contents(engine.editor), "yzxbc");
	assert_eq!(engine.dispatcher.state().current().mode(), "insert");
}

#[tokio::test]
async fn replace_char_asks_once_then_replays_the_same_char() {
	let engine = Engine::new("abc", vec![bind("r", vec![CommandRef::bare("replaceChar")])]);

	let pending = engine.press_in_background("r");
	engine.until_capturing().await;
	engine.dispatcher.type_text("z");
	assert_eq!(pending.await.unwrap(), DispatchOutcome::Completed);
	assert_eq!(engine.host.contents(engine.editor), "zbc");

	engine.host.set_selections(engine.editor, Selection::point(1)).unwrap();
	assert_eq!(engine.press("r").await, DispatchOutcome::Completed);
	assert_eq!(engine.host.contents(engine.editor), "zzc");
}

#[tokio::test]
async fn insert_char_keeps_the_cursor() {
	let engine = Engine::new("abc", vec![bind("I", vec![cmd("insertChar", json!({"char": "-"}))])]);
	engine.host.set_selections(engine.editor, Selection::point(2)).unwrap();

	engine.press("I").await;

	assert_eq!(engine.host.contents(engine.editor), "ab-c");
	assert_eq!(head(&engine), 2);
}

#[tokio::test]
async fn search_navigates_and_highlights() {
	let engine = Engine::new(
		"foo bar foo",
		vec![
			bind("/", vec![cmd("search", json!({"text": "foo", "wrapAround": true}))]),
			bind("n", vec![CommandRef::bare("nextMatch")]),
			bind("N", vec![CommandRef::bare("previousMatch")]),
			bind("j", vec![CommandRef::bare("cursorDown")]),
		],
	);
	engine.host.set_selections(engine.editor, Selection::point(1)).unwrap();

	engine.press("/").await;
	assert_eq!(head(&engine), 8);
	assert_eq!(engine.host.decorations(engine.editor, DecorationKind::ActiveMatch), [Range::new(8, 11)]);
	assert_eq!(engine.host.decorations(engine.editor, DecorationKind::OtherMatches), [Range::new(0, 3)]);

	engine.press("n").await;
	assert_eq!(head(&engine), 0);

	engine.press("N").await;
	assert_eq!(head(&engine), 8);

	engine.press("j").await;
	assert!(engine.host.decorations(engine.editor, DecorationKind::ActiveMatch).is_empty());
	assert!(engine.host.decorations(engine.editor, DecorationKind::OtherMatches).is_empty());
}

#[tokio::test]
async fn interactive_search_follows_each_keystroke() {
	let engine = Engine::new("foo bar baz", vec![bind("/", vec![CommandRef::bare("search")])]);

	let pending = engine.press_in_background("/");
	engine.until_capturing().await;
	engine.dispatcher.type_text("ba");
	engine.dispatcher.type_text("z\n");

	assert_eq!(pending.await.unwrap(), DispatchOutcome::Completed);
	assert_eq!(head(&engine), 8);
	let stored = engine.store.binding(&BindingId::new("/")).unwrap();
	assert_eq!(stored.commands[0].args["text"], json!("baz"));
	assert_eq!(engine.dispatcher.state().current().mode(), "normal");
}

#[tokio::test]
async fn abandoned_search_restores_the_selection() {
	let engine = Engine::new(
		"foo bar baz",
		vec![
			bind("/", vec![CommandRef::bare("search")]),
			Binding::new("esc", "escape", "capture", 0, vec![cmd("setMode", json!({"value": "normal"}))]).finished(),
		],
	);

	let pending = engine.press_in_background("/");
	until_mode(&engine, "capture").await;
	engine.dispatcher.type_text("bar");
	while head(&engine) != 4 {
		tokio::task::yield_now().await;
	}
	engine.press("escape").await;

	assert_eq!(pending.await.unwrap(), DispatchOutcome::Canceled);
	assert_eq!(head(&engine), 0);
	assert!(engine.host.decorations(engine.editor, DecorationKind::ActiveMatch).is_empty());
}

fn replay_engine() -> Engine {
	Engine::new(
		"a-a-a-a",
		vec![
			bind("f", vec![cmd("search", json!({"text": "-"}))]),
			bind("r", vec![cmd("replaceChar", json!({"char": "+"}))]),
			bind("R", vec![cmd("replayFromHistory", json!({"from": "0", "to": "1"}))]),
			bind("P", vec![cmd("pushHistoryToStack", json!({"from": "0", "to": "1"}))]),
			bind("M", vec![CommandRef::bare("replayFromStack")]),
		],
	)
}

#[tokio::test]
async fn replaying_a_range_twice_from_the_same_start_gives_the_same_result() {
	let engine = replay_engine();
	engine.press("f").await;
	engine.press("r").await;
	assert_eq!(engine.host.contents(engine.editor), "a+a-a-a");

	let first = engine.host.open("a-a-a-a");
	let second = engine.host.open("a-a-a-a");
	engine.host.focus(first);
	assert_eq!(engine.press("R").await, DispatchOutcome::Completed);
	engine.host.focus(second);
	assert_eq!(engine.press("R").await, DispatchOutcome::Completed);

	assert_eq!(engine.host.contents(first), "a+a-a-a");
	assert_eq!(engine.host.contents(second), engine.host.contents(first));
	assert_eq!(
		engine.host.selections(second).unwrap(),
		engine.host.selections(first).unwrap()
	);
}

#[tokio::test]
async fn macro_stack_replays_a_pushed_range() {
	let engine = replay_engine();
	engine.press("f").await;
	engine.press("r").await;
	engine.press("P").await;
	assert_eq!(engine.dispatcher.macro_depth("default"), 1);

	let other = engine.host.open("a-a-a-a");
	assert_eq!(engine.press("M").await, DispatchOutcome::Completed);

	assert_eq!(engine.host.contents(other), "a+a-a-a");
}

#[tokio::test]
async fn replaying_an_empty_stack_fails() {
	let engine = replay_engine();

	assert_eq!(engine.press("M").await, DispatchOutcome::Failed);

	assert!(engine.host.errors()[0].contains("no macro"));
}

#[tokio::test]
async fn recorded_edits_are_typed_again_on_replay() {
	let engine = Engine::new(
		"xy",
		vec![
			bind("o", vec![cmd("record", json!({"on": true}))]),
			bind("R", vec![cmd("replayFromHistory", json!({"index": "0"}))]),
		],
	);
	engine.press("o").await;
	assert!(engine.dispatcher.record_edit("hi"));
	engine.host.insert_text(engine.editor, "hi").unwrap();

	engine.press("R").await;

	assert_eq!(engine.host.contents(engine.editor), "hihixy");
}
