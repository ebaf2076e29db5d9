//! Activation, a full key sequence through the public surface, and teardown.

use std::sync::Arc;

use keyseq::{
	Binding, CommandRef, ConfigError, CursorShape, DispatchOutcome, Engine, EngineConfig, MemoryBindingStore,
	MemoryHost, ModeInfo, PathEvaluator, StateError, keys,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn parts() -> (Arc<MemoryBindingStore>, Arc<MemoryHost>) {
	let store = MemoryBindingStore::new("normal", Arc::new(PathEvaluator))
		.with_mode(ModeInfo::new("normal").with_cursor(CursorShape::Block))
		.with_mode(ModeInfo::new("insert"))
		.with_binding(Binding::new(
			"space",
			"space",
			"normal",
			0,
			vec![CommandRef::new("prefix", json!({"code": 1}))],
		))
		.with_binding(
			Binding::new(
				"space-i",
				"i",
				"normal",
				1,
				vec![CommandRef::new("setMode", json!({"value": "insert"}))],
			)
			.finished(),
		);
	let host = Arc::new(MemoryHost::new());
	host.open("text");
	(Arc::new(store), host)
}

#[tokio::test]
async fn activation_rejects_invalid_config() {
	let (store, host) = parts();
	let config = EngineConfig {
		max_history: 0,
		..EngineConfig::default()
	};
	let err = Engine::activate(config, store, Arc::new(PathEvaluator), host).unwrap_err();
	assert!(matches!(err, ConfigError::Invalid(_)));
}

#[tokio::test]
async fn activated_engine_runs_a_key_sequence() {
	let (store, host) = parts();
	let engine = Engine::activate(EngineConfig::default(), store, Arc::new(PathEvaluator), host.clone()).unwrap();
	assert_eq!(host.cursor_shape(), CursorShape::Block);

	let d = engine.dispatcher();
	assert_eq!(d.handle_key(d.key_press("space")).await, DispatchOutcome::Completed);
	assert_eq!(d.handle_key(d.key_press("i")).await, DispatchOutcome::Completed);

	let snapshot = d.state().snapshot().await.unwrap();
	assert_eq!((snapshot.mode(), snapshot.prefix()), ("insert", ""));
	assert_eq!(host.cursor_shape(), CursorShape::Line);
	assert_eq!(host.context(keys::MODE), Some(json!("insert")));
	assert_eq!(d.history_entries().len(), 2);
}

#[tokio::test]
async fn deactivation_closes_the_state_stream() {
	let (store, host) = parts();
	let engine = Engine::activate(EngineConfig::default(), store, Arc::new(PathEvaluator), host).unwrap();
	let state = engine.dispatcher().state().clone();

	engine.deactivate();

	assert_eq!(state.snapshot().await.unwrap_err(), StateError::Closed);
}
