//! The dispatch cycle: staleness check, repeat loop, write-back, history.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use futures::FutureExt;
use futures::future::BoxFuture;
use keyseq_config::EngineConfig;
use keyseq_history::{History, HistoryEntry};
use keyseq_host::{Host, HostError};
use keyseq_invocation::{
	Binding, BindingId, BindingStore, CommandRef, Evaluator, ResolveError, Resolved, Scope, WhenNoBinding,
};
use keyseq_primitives::{EditorId, join_keys};
use keyseq_search::SearchStates;
use keyseq_state::{ContextSink, State, StateError, StateSnapshot, StateStore, Subscription, Value, keys};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::capture::{CaptureController, Captured};
use crate::commands::{CommandCx, CommandRegistry, clear_matches, replay};
use crate::error::CommandError;
use crate::event::{DispatchOutcome, EngineEvent, Expected, KeyPress};
use crate::gate::{DispatchGate, GateGuard};

const EVENT_CAPACITY: usize = 64;

/// Publishes public state through the host.
struct HostSink(Arc<dyn Host>);

impl ContextSink for HostSink {
	fn set_context(&self, key: &str, value: &Value) {
		self.0.set_context(key, value);
	}
}

/// Everything one engine instance owns. Created at activation, torn down by
/// [`Dispatcher::shutdown`].
struct EngineContext {
	config: EngineConfig,
	state: StateStore,
	bindings: Arc<dyn BindingStore>,
	evaluator: Arc<dyn Evaluator>,
	host: Arc<dyn Host>,
	commands: CommandRegistry,
	gate: DispatchGate,
	capture: CaptureController,
	searches: Mutex<SearchStates>,
	history: Mutex<History>,
	events: broadcast::Sender<EngineEvent>,
	suggestions: Mutex<Option<JoinHandle<()>>>,
	subscriptions: Mutex<Vec<Subscription>>,
	replay_depth: AtomicUsize,
}

/// Runs bindings for key presses, one dispatch cycle at a time.
///
/// Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct Dispatcher(Arc<EngineContext>);

impl Dispatcher {
	/// Creates a dispatcher with the builtin commands.
	///
	/// Spawns the state actor, so this must run inside a tokio runtime.
	pub fn new(
		config: EngineConfig,
		bindings: Arc<dyn BindingStore>,
		evaluator: Arc<dyn Evaluator>,
		host: Arc<dyn Host>,
	) -> Self {
		Self::with_registry(config, bindings, evaluator, host, CommandRegistry::builtin())
	}

	/// Creates a dispatcher running the commands of `commands`; anything else goes to the host.
	pub fn with_registry(
		config: EngineConfig,
		bindings: Arc<dyn BindingStore>,
		evaluator: Arc<dyn Evaluator>,
		host: Arc<dyn Host>,
		commands: CommandRegistry,
	) -> Self {
		let default_mode = bindings.default_mode();
		let sink: Arc<dyn ContextSink> = Arc::new(HostSink(Arc::clone(&host)));
		let state = StateStore::spawn(State::standard(&default_mode), sink);
		let capture = CaptureController::new(&config.capture_mode);
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		let mut subscriptions = vec![capture.watch_mode(&state)];
		{
			let host = Arc::clone(&host);
			let bindings = Arc::clone(&bindings);
			subscriptions.push(state.on_set(keys::MODE, move |event| {
				let Some(info) = event.new.as_str().and_then(|mode| bindings.mode_info(mode)) else {
					return;
				};
				trace!(mode = %info.name, cursor = ?info.cursor_shape, "applying mode cursor");
				host.set_cursor_shape(info.cursor_shape);
			}));
		}
		if let Some(info) = bindings.mode_info(&default_mode) {
			host.set_cursor_shape(info.cursor_shape);
		}
		debug!(mode = %default_mode, commands = ?commands, "dispatcher started");

		Self(Arc::new(EngineContext {
			gate: DispatchGate::new(config.lock_timeout()),
			config,
			state,
			bindings,
			evaluator,
			host,
			commands,
			capture,
			searches: Mutex::new(SearchStates::new()),
			history: Mutex::new(History::new()),
			events,
			suggestions: Mutex::new(None),
			subscriptions: Mutex::new(subscriptions),
			replay_depth: AtomicUsize::new(0),
		}))
	}

	/// Receives engine events from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
		self.0.events.subscribe()
	}

	pub fn state(&self) -> &StateStore {
		&self.0.state
	}

	pub fn config(&self) -> &EngineConfig {
		&self.0.config
	}

	pub fn host(&self) -> &Arc<dyn Host> {
		&self.0.host
	}

	pub fn bindings(&self) -> &Arc<dyn BindingStore> {
		&self.0.bindings
	}

	/// Runs a capture on this engine's state stream.
	///
	/// Characters typed in the same batch after the capture stopped are routed
	/// again through [`type_text`](Self::type_text) once the mode is restored.
	pub async fn capture_keys<F>(&self, on_update: F) -> Result<Captured, StateError>
	where
		F: FnMut(&str, char) -> (String, bool) + Send,
	{
		let captured = self.0.capture.capture_keys(&self.0.state, on_update).await?;
		if !captured.rest.is_empty() {
			let used = self.type_text(&captured.rest);
			debug!(rest = %captured.rest, used, "routed text typed past the capture");
		}
		Ok(captured)
	}

	pub fn evaluator(&self) -> &dyn Evaluator {
		&*self.0.evaluator
	}

	pub(crate) fn searches(&self) -> &Mutex<SearchStates> {
		&self.0.searches
	}

	pub(crate) fn history(&self) -> &Mutex<History> {
		&self.0.history
	}

	pub(crate) fn replay_depth(&self) -> &AtomicUsize {
		&self.0.replay_depth
	}

	/// The `(prefix_code, mode)` key presses are produced under right now.
	pub fn expected(&self) -> Expected {
		Expected::from_snapshot(&self.0.state.current())
	}

	/// Stamps `key` with the current expectation, as a host does when the key event arrives.
	pub fn key_press(&self, key: impl Into<String>) -> KeyPress {
		KeyPress {
			key: key.into(),
			expected: self.expected(),
		}
	}

	pub fn active_editor(&self) -> Result<EditorId, HostError> {
		self.0.host.active_editor().ok_or(HostError::NoActiveEditor)
	}

	/// Expression scope built from the latest state.
	pub async fn scope(&self) -> Result<Scope, StateError> {
		let snapshot = self.0.state.snapshot().await?;
		Ok(Scope::from_map(snapshot.to_map()))
	}

	pub(crate) fn emit(&self, event: EngineEvent) {
		// No receivers is fine.
		let _ = self.0.events.send(event);
	}

	pub(crate) fn diagnostic(&self, message: String) {
		debug!(%message, "diagnostic");
		self.emit(EngineEvent::Diagnostic(message));
	}

	/// Looks up the binding for `press` and dispatches it.
	pub async fn handle_key(&self, press: KeyPress) -> DispatchOutcome {
		let KeyPress { key, expected } = press;
		match self.0.bindings.lookup(expected.prefix_code, &expected.mode, &key) {
			Some(binding) => self.dispatch(binding, expected).await,
			None => self.unbound(Some(&key), &expected).await,
		}
	}

	/// Dispatches binding `id` for a key pressed under `expected`.
	pub async fn run_binding(&self, id: &BindingId, expected: Expected) -> DispatchOutcome {
		match self.0.bindings.binding(id) {
			Some(binding) => self.dispatch(binding, expected).await,
			None => {
				warn!(binding = %id, "unknown binding");
				self.unbound(None, &expected).await
			}
		}
	}

	/// Routes typed text: to the active capture, else into the document when
	/// the mode inserts unbound characters. Returns whether the text was used.
	pub fn type_text(&self, text: &str) -> bool {
		if self.0.capture.is_active() {
			return text.chars().all(|ch| self.0.capture.type_char(ch));
		}
		let current = self.0.state.current();
		match self.0.bindings.mode_info(current.mode()) {
			Some(info) if info.when_no_binding == WhenNoBinding::InsertCharacters => {
				self.insert_typed(text, current.record())
			}
			_ => false,
		}
	}

	/// Appends `text` to the newest history entry while recording is on.
	pub fn record_edit(&self, text: &str) -> bool {
		self.0.state.current().record() && self.0.history.lock().record_edit(text)
	}

	/// Drops the search states of a closed editor.
	pub fn editor_closed(&self, editor: EditorId) {
		let removed = self.0.searches.lock().remove_editor(editor);
		debug!(%editor, removed, "editor closed");
	}

	/// Tells the engine the binding table was replaced; prefixes typed so far are dropped.
	pub async fn bindings_changed(&self) -> Result<(), StateError> {
		let _guard = self.0.gate.acquire().await;
		self.cancel_suggestions();
		self.0.state.reset().await?;
		let snapshot = self.0.state.resolve().await?;
		self.emit(EngineEvent::BindingsChanged);
		self.emit(EngineEvent::StateResolved(snapshot));
		Ok(())
	}

	pub fn is_capturing(&self) -> bool {
		self.0.capture.is_active()
	}

	/// Copies the history log, oldest first.
	pub fn history_entries(&self) -> Vec<HistoryEntry> {
		self.0.history.lock().iter().cloned().collect()
	}

	/// Depth of macro stack `name`.
	pub fn macro_depth(&self, name: &str) -> usize {
		self.0.history.lock().macro_depth(name)
	}

	/// Replays history entries outside of any binding, e.g. from a command palette.
	pub async fn replay(&self, entries: &[HistoryEntry]) -> Result<(), CommandError> {
		let _guard = self.0.gate.acquire().await;
		let result = replay(self, entries).await;
		self.after_command();
		result
	}

	/// Ends any capture, stops pending work and closes the state stream.
	pub fn shutdown(&self) {
		self.0.capture.cancel();
		self.cancel_suggestions();
		self.0.subscriptions.lock().clear();
		self.0.state.close();
		debug!("dispatcher shut down");
	}

	/// Runs one command: a registered builtin, or a host command otherwise.
	pub fn run_command<'a>(
		&'a self,
		command: &'a CommandRef,
		key: &'a str,
	) -> BoxFuture<'a, Result<Resolved<Value>, CommandError>> {
		async move {
			trace!(command = %command.describe(), "running command");
			match self.0.commands.get(&command.command) {
				Some(builtin) => builtin.run(CommandCx { dispatcher: self, key }, &command.args).await,
				None => {
					self.0.host.execute(&command.command, &command.args).await?;
					Ok(Resolved::completed())
				}
			}
		}
		.boxed()
	}

	async fn dispatch(&self, binding: Arc<Binding>, expected: Expected) -> DispatchOutcome {
		let mut guard = self.0.gate.acquire().await;
		let before = match self.0.state.snapshot().await {
			Ok(snapshot) => snapshot,
			Err(err) => {
				warn!(%err, "state stream unavailable");
				return DispatchOutcome::Failed;
			}
		};
		if Expected::from_snapshot(&before) != expected {
			debug!(
				binding = %binding.id,
				expected_prefix = expected.prefix_code,
				prefix_code = before.prefix_code(),
				mode = %before.mode(),
				"stale key press"
			);
			return DispatchOutcome::Stale;
		}

		let span = debug_span!("dispatch", binding = %binding.id, key = %binding.key);
		let result = AssertUnwindSafe(self.execute(&binding, &before, &mut guard))
			.catch_unwind()
			.instrument(span)
			.await;
		let outcome = match result {
			Ok(Ok(outcome)) => outcome,
			Ok(Err(err)) => {
				self.fail(&err.to_string()).await;
				DispatchOutcome::Failed
			}
			Err(panic) => {
				self.fail(&panic_message(&*panic)).await;
				DispatchOutcome::Failed
			}
		};
		self.after_command();
		outcome
	}

	async fn execute(
		&self,
		binding: &Binding,
		before: &StateSnapshot,
		guard: &mut GateGuard,
	) -> Result<DispatchOutcome, CommandError> {
		let repeat = self.repeat_of(binding, before);
		trace!(binding = %binding.describe(), repeat, "executing");
		if repeat < 0 {
			return Ok(DispatchOutcome::Canceled);
		}

		let mut ran = Vec::with_capacity(binding.commands.len());
		let mut completed: i64 = 0;
		'repeat: for r in 0..=repeat {
			for index in 0..binding.commands.len() {
				let scope = self.scope().await?;
				let command = match self.0.bindings.resolve_command(&binding.id, index, &scope) {
					Ok(command) => command,
					Err(err @ ResolveError::Eval { .. }) => {
						self.diagnostic(err.to_string());
						continue;
					}
					Err(err) => return Err(err.into()),
				};
				if command.is_noop() {
					if r == 0 {
						ran.push(command);
					}
					continue;
				}
				if self.is_interactive(&command) {
					guard.release();
				}
				let resolved = match self.run_command(&command, &binding.key).await {
					Ok(resolved) => resolved,
					Err(err) if err.is_recoverable() => {
						warn!(command = %command.command, %err, "command skipped");
						self.0.host.notify_error(&err.to_string());
						continue;
					}
					Err(err) => return Err(err),
				};
				if resolved.is_canceled() {
					debug!(command = %command.command, iteration = r, "binding canceled");
					break 'repeat;
				}
				let mut command = command;
				if let Some(args) = resolved.args {
					command.args = args;
					self.0.bindings.store_command(&binding.id, index, command.clone())?;
				}
				if r == 0 {
					ran.push(command);
				}
			}
			completed = r + 1;
		}
		if completed == 0 {
			return Ok(DispatchOutcome::Canceled);
		}

		let after = self.0.state.snapshot().await?;
		if binding.final_key {
			let typed = join_keys(before.prefix(), &binding.key);
			self.0.host.show_status(&typed, self.0.config.status_display());
			self.cancel_suggestions();
			let reset = self.0.state.reset().await?;
			if let Some(info) = self.0.bindings.mode_info(reset.mode()) {
				self.0.host.set_cursor_shape(info.cursor_shape);
			}
		} else if after.prefix_code() != before.prefix_code() || after.mode() != before.mode() {
			self.schedule_suggestions(after.prefix_code(), after.mode().to_string());
		}
		let resolved = self.0.state.resolve().await?;
		self.emit(EngineEvent::StateResolved(resolved));

		let entry = HistoryEntry::from_binding(binding, ran, completed - 1);
		self.0.history.lock().store_binding(entry, self.0.config.max_history);
		Ok(DispatchOutcome::Completed)
	}

	/// Handles a key with no binding.
	async fn unbound(&self, key: Option<&str>, expected: &Expected) -> DispatchOutcome {
		let _guard = self.0.gate.acquire().await;
		let current = match self.0.state.snapshot().await {
			Ok(snapshot) => snapshot,
			Err(err) => {
				warn!(%err, "state stream unavailable");
				return DispatchOutcome::Failed;
			}
		};
		if Expected::from_snapshot(&current) != *expected {
			return DispatchOutcome::Stale;
		}
		if let Some(ch) = key.and_then(single_char) {
			let inserts = self
				.0
				.bindings
				.mode_info(current.mode())
				.is_some_and(|info| info.when_no_binding == WhenNoBinding::InsertCharacters);
			if inserts && current.prefix_code() == 0 {
				self.insert_typed(&ch.to_string(), current.record());
			}
		}
		trace!(key, mode = %current.mode(), prefix_code = current.prefix_code(), "unbound key");
		self.cancel_suggestions();
		if let Err(err) = self.settle().await {
			warn!(%err, "reset after unbound key failed");
		}
		DispatchOutcome::Unbound
	}

	fn insert_typed(&self, text: &str, record: bool) -> bool {
		let inserted = self
			.active_editor()
			.and_then(|editor| self.0.host.insert_text(editor, text));
		match inserted {
			Ok(()) => {
				if record {
					self.0.history.lock().record_edit(text);
				}
				true
			}
			Err(err) => {
				debug!(%err, "typed text dropped");
				false
			}
		}
	}

	fn repeat_of(&self, binding: &Binding, before: &StateSnapshot) -> i64 {
		let Some(expr) = &binding.repeat_expr else {
			return binding.repeat;
		};
		let scope = Scope::from_map(before.to_map());
		match self.0.evaluator.evaluate(expr, &scope) {
			Ok(value) => match value.as_i64() {
				Some(repeat) => repeat,
				None => {
					self.diagnostic(format!("repeat expression `{expr}` gave {value}, expected an integer"));
					binding.repeat
				}
			},
			Err(err) => {
				self.diagnostic(err.to_string());
				binding.repeat
			}
		}
	}

	fn is_interactive(&self, command: &CommandRef) -> bool {
		self.0
			.commands
			.get(&command.command)
			.is_some_and(|builtin| builtin.is_interactive(&command.args))
	}

	async fn fail(&self, message: &str) {
		warn!(%message, "dispatch failed");
		self.0.host.notify_error(message);
		self.cancel_suggestions();
		self.0.capture.abort(&self.0.state);
		if let Err(err) = self.settle().await {
			warn!(%err, "reset after failure failed");
		}
	}

	/// Resets transient state and publishes the result.
	async fn settle(&self) -> Result<(), StateError> {
		self.0.state.reset().await?;
		let snapshot = self.0.state.resolve().await?;
		self.emit(EngineEvent::StateResolved(snapshot));
		Ok(())
	}

	/// Clears search highlights nothing refreshed during the last command.
	fn after_command(&self) {
		let stale = self.0.searches.lock().after_command();
		for editor in stale {
			clear_matches(self, editor);
		}
	}

	fn schedule_suggestions(&self, prefix_code: u64, mode: String) {
		let Some(delay) = self.0.config.suggestion_delay() else {
			return;
		};
		let context = Arc::downgrade(&self.0);
		let task = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let Some(context) = context.upgrade() else {
				return;
			};
			let current = context.state.current();
			if current.prefix_code() != prefix_code || current.mode() != mode {
				return;
			}
			let bindings = context.bindings.bindings_under(prefix_code, &mode);
			trace!(prefix_code, mode = %mode, count = bindings.len(), "next-key suggestions");
			let _ = context.events.send(EngineEvent::NextKeySuggestions {
				prefix: current.prefix().to_string(),
				mode,
				bindings,
			});
		});
		if let Some(previous) = self.0.suggestions.lock().replace(task) {
			previous.abort();
		}
	}

	fn cancel_suggestions(&self) {
		if let Some(task) = self.0.suggestions.lock().take() {
			task.abort();
		}
	}
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("state", &self.0.state)
			.field("commands", &self.0.commands)
			.finish_non_exhaustive()
	}
}

fn single_char(key: &str) -> Option<char> {
	let mut chars = key.chars();
	match (chars.next(), chars.next()) {
		(Some(ch), None) => Some(ch),
		_ => None,
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		format!("command panicked: {message}")
	} else if let Some(message) = payload.downcast_ref::<String>() {
		format!("command panicked: {message}")
	} else {
		"command panicked".to_string()
	}
}
