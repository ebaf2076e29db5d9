//! Builtin commands and the registry the dispatcher looks them up in.
//!
//! Commands not found in the registry are forwarded to the host.

mod capture;
mod replay;
mod search;
mod state;

use std::sync::Arc;

use async_trait::async_trait;
use keyseq_invocation::Resolved;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::CommandError;

pub(crate) use replay::replay;
pub(crate) use search::clear_matches;

pub const PREFIX: &str = "prefix";
pub const SET_MODE: &str = "setMode";
pub const UPDATE_COUNT: &str = "updateCount";
pub const SET_FLAG: &str = "setFlag";
pub const CAPTURE_KEYS: &str = "captureKeys";
pub const REPLACE_CHAR: &str = "replaceChar";
pub const INSERT_CHAR: &str = "insertChar";
pub const SEARCH: &str = "search";
pub const NEXT_MATCH: &str = "nextMatch";
pub const PREVIOUS_MATCH: &str = "previousMatch";
pub const RECORD: &str = "record";
pub const REPLAY_FROM_HISTORY: &str = "replayFromHistory";
pub const PUSH_HISTORY_TO_STACK: &str = "pushHistoryToStack";
pub const REPLAY_FROM_STACK: &str = "replayFromStack";

/// What a running command can reach.
#[derive(Clone, Copy)]
pub struct CommandCx<'a> {
	pub dispatcher: &'a Dispatcher,
	/// Key of the binding the command belongs to.
	pub key: &'a str,
}

/// A command the engine runs itself.
#[async_trait]
pub trait Command: Send + Sync {
	fn name(&self) -> &'static str;

	/// Whether running with `args` waits for user input. The dispatcher
	/// releases its serialization gate before running interactive commands.
	fn is_interactive(&self, _args: &Value) -> bool {
		false
	}

	/// Runs the command. Returned `args` are written back onto the binding.
	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError>;
}

/// Commands by name.
#[derive(Clone, Default)]
pub struct CommandRegistry {
	commands: FxHashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
	/// A registry holding every builtin.
	pub fn builtin() -> Self {
		let mut registry = Self::default();
		registry.register(Arc::new(state::Prefix));
		registry.register(Arc::new(state::SetMode));
		registry.register(Arc::new(state::UpdateCount));
		registry.register(Arc::new(state::SetFlag));
		registry.register(Arc::new(state::Record));
		registry.register(Arc::new(capture::CaptureKeys));
		registry.register(Arc::new(capture::CharCommand::Replace));
		registry.register(Arc::new(capture::CharCommand::Insert));
		registry.register(Arc::new(search::Search));
		registry.register(Arc::new(search::RepeatSearch::Next));
		registry.register(Arc::new(search::RepeatSearch::Previous));
		registry.register(Arc::new(replay::ReplayFromHistory));
		registry.register(Arc::new(replay::PushHistoryToStack));
		registry.register(Arc::new(replay::ReplayFromStack));
		registry
	}

	/// Adds `command`, replacing any command of the same name.
	pub fn register(&mut self, command: Arc<dyn Command>) {
		self.commands.insert(command.name(), command);
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
		self.commands.get(name).cloned()
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<&'static str> {
		let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
		names.sort_unstable();
		names
	}
}

impl std::fmt::Debug for CommandRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

/// One step of a text capture: Enter accepts, Backspace deletes, anything
/// else is appended and accepted once `accept_after` chars were typed.
pub(crate) fn capture_step(text: &str, ch: char, accept_after: Option<usize>) -> (String, bool) {
	match ch {
		'\n' | '\r' => (text.to_string(), true),
		'\u{8}' | '\u{7f}' => {
			let mut text = text.to_string();
			text.pop();
			(text, false)
		}
		_ => {
			let text = format!("{text}{ch}");
			let done = accept_after.is_some_and(|n| text.chars().count() >= n);
			(text, done)
		}
	}
}
