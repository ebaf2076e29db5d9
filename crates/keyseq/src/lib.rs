//! Modal, sequence-based keybindings for a text editor.
//!
//! Key presses accumulate into prefixes, resolve against a binding table
//! scoped by mode and prefix, and run one or more commands, with counts,
//! captured free-text input, search, and replay of earlier bindings.
//!
//! [`Engine::activate`] wires a binding table, an expression evaluator and a
//! [`Host`] into a running [`Dispatcher`]:
//!
//! ```no_run
//! # async fn demo() -> Result<(), keyseq::ConfigError> {
//! use std::sync::Arc;
//!
//! use keyseq::{Binding, CommandRef, Engine, EngineConfig, MemoryBindingStore, MemoryHost, PathEvaluator};
//!
//! let evaluator = Arc::new(PathEvaluator);
//! let bindings = MemoryBindingStore::new("normal", evaluator.clone())
//! 	.with_binding(Binding::new("down", "j", "normal", 0, vec![CommandRef::bare("cursorDown")]).finished());
//! let host = Arc::new(MemoryHost::new());
//! host.open("hello");
//!
//! let engine = Engine::activate(EngineConfig::default(), Arc::new(bindings), evaluator, host)?;
//! let press = engine.dispatcher().key_press("j");
//! engine.dispatcher().handle_key(press).await;
//! engine.deactivate();
//! # Ok(())
//! # }
//! ```

pub mod logging;

use std::sync::Arc;

pub use keyseq_config::{ConfigError, EngineConfig};
pub use keyseq_history::{History, HistoryEntry, HistoryError, Selector};
pub use keyseq_host::{DecorationKind, Host, HostError, MemoryHost};
pub use keyseq_input::{
	CaptureController, Captured, Command, CommandCx, CommandError, CommandRegistry, DispatchOutcome, Dispatcher,
	EngineEvent, Expected, KeyPress,
};
pub use keyseq_invocation::{
	Binding, BindingId, BindingStore, CommandRef, EvalError, Evaluator, MemoryBindingStore, ModeInfo, NOOP, Outcome,
	PathEvaluator, ResolveError, Resolved, Scope, WhenNoBinding,
};
pub use keyseq_primitives::{CursorShape, Direction, EditorId, Range, Selection};
pub use keyseq_search::{Boundary, SearchArgs, SearchError};
pub use keyseq_state::{SetOptions, StateError, StateSnapshot, StateStore, Value, keys};
use tracing::info;

/// One activated engine.
///
/// Owns the dispatcher and with it the state stream, capture subscription,
/// search states and history. Dropping the engine without
/// [`deactivate`](Self::deactivate) also stops the state stream once every
/// dispatcher clone is gone.
#[derive(Debug)]
pub struct Engine {
	dispatcher: Dispatcher,
}

impl Engine {
	/// Validates `config` and starts the engine. Must run inside a tokio runtime.
	pub fn activate(
		config: EngineConfig,
		bindings: Arc<dyn BindingStore>,
		evaluator: Arc<dyn Evaluator>,
		host: Arc<dyn Host>,
	) -> Result<Self, ConfigError> {
		config.validate()?;
		info!(
			max_history = config.max_history,
			capture_mode = %config.capture_mode,
			"activating keyseq engine"
		);
		Ok(Self {
			dispatcher: Dispatcher::new(config, bindings, evaluator, host),
		})
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	/// Cancels any capture, closes the state stream and drops every subscription.
	pub fn deactivate(self) {
		self.dispatcher.shutdown();
		info!("keyseq engine deactivated");
	}
}
