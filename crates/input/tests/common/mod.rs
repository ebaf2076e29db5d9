#![allow(dead_code)]

use std::sync::Arc;

use keyseq_config::EngineConfig;
use keyseq_host::MemoryHost;
use keyseq_input::{CommandRegistry, DispatchOutcome, Dispatcher};
use keyseq_invocation::{Binding, CommandRef, MemoryBindingStore, ModeInfo, PathEvaluator};
use keyseq_primitives::EditorId;
use serde_json::Value;

pub struct Engine {
	pub dispatcher: Dispatcher,
	pub host: Arc<MemoryHost>,
	pub store: Arc<MemoryBindingStore>,
	pub editor: EditorId,
}

impl Engine {
	pub fn new(text: &str, bindings: Vec<Binding>) -> Self {
		Self::build(config(), text, store(bindings), CommandRegistry::builtin())
	}

	pub fn build(config: EngineConfig, text: &str, store: MemoryBindingStore, registry: CommandRegistry) -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		let host = Arc::new(MemoryHost::new());
		let editor = host.open(text);
		let store = Arc::new(store);
		let dispatcher = Dispatcher::with_registry(config, store.clone(), Arc::new(PathEvaluator), host.clone(), registry);
		Self {
			dispatcher,
			host,
			store,
			editor,
		}
	}

	/// Presses `key` under the current expectation and waits for the cycle.
	pub async fn press(&self, key: &str) -> DispatchOutcome {
		self.dispatcher.handle_key(self.dispatcher.key_press(key)).await
	}

	/// Presses `key` in the background; used for bindings that wait for input.
	pub fn press_in_background(&self, key: &str) -> tokio::task::JoinHandle<DispatchOutcome> {
		let dispatcher = self.dispatcher.clone();
		let press = dispatcher.key_press(key);
		tokio::spawn(async move { dispatcher.handle_key(press).await })
	}

	pub async fn until_capturing(&self) {
		while !self.dispatcher.is_capturing() {
			tokio::task::yield_now().await;
		}
	}

	/// Names of host commands run so far.
	pub fn executed(&self) -> Vec<String> {
		self.host.executed().into_iter().map(|(name, _)| name).collect()
	}
}

pub fn config() -> EngineConfig {
	EngineConfig {
		replay_delay_ms: 0,
		..EngineConfig::default()
	}
}

pub fn store(bindings: Vec<Binding>) -> MemoryBindingStore {
	let store = MemoryBindingStore::new("normal", Arc::new(PathEvaluator)).with_mode(ModeInfo::new("normal"));
	for binding in bindings {
		store.insert(binding);
	}
	store
}

/// A final binding in normal mode at the empty prefix.
pub fn bind(key: &str, commands: Vec<CommandRef>) -> Binding {
	Binding::new(key, key, "normal", 0, commands).finished()
}

pub fn cmd(name: &str, args: Value) -> CommandRef {
	CommandRef::new(name, args)
}
