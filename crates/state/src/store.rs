use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::StateError;
use crate::listeners::{Listeners, SetEvent, Subscription};
use crate::snapshot::StateSnapshot;
use crate::state::{SetOptions, State};
use crate::Value;

/// Receiver of public state values, e.g. the host's when-clause context.
pub trait ContextSink: Send + Sync {
	/// Publishes `value` under `key`.
	fn set_context(&self, key: &str, value: &Value);
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullContextSink;

impl ContextSink for NullContextSink {
	fn set_context(&self, _key: &str, _value: &Value) {}
}

type Reply = Box<dyn FnOnce(StateSnapshot) + Send>;
type Job = Box<dyn FnOnce(&mut State) -> Reply + Send>;

enum Request {
	Apply(Job),
	Resolve(oneshot::Sender<StateSnapshot>),
	Shutdown,
}

/// Handle to the state stream.
///
/// Cloning the handle shares the same stream. Mutations are closures sent to
/// a single actor task; each caller awaits the snapshot produced right after
/// its own transform, so every change is ordered by submission.
#[derive(Clone)]
pub struct StateStore {
	tx: mpsc::UnboundedSender<Request>,
	listeners: Arc<Listeners>,
	latest: Arc<RwLock<StateSnapshot>>,
}

impl StateStore {
	/// Spawns the state actor on the current tokio runtime.
	pub fn spawn(initial: State, sink: Arc<dyn ContextSink>) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let listeners = Arc::new(Listeners::default());
		let latest = Arc::new(RwLock::new(initial.snapshot()));
		tokio::spawn(run_actor(initial, rx, Arc::clone(&listeners), Arc::clone(&latest), sink));
		Self { tx, listeners, latest }
	}

	/// Runs `f` on the stream and returns its output with the resulting snapshot.
	pub async fn with_state<R, F>(&self, f: F) -> Result<(R, StateSnapshot), StateError>
	where
		F: FnOnce(&mut State) -> R + Send + 'static,
		R: Send + 'static,
	{
		let (reply_tx, reply_rx) = oneshot::channel();
		let job: Job = Box::new(move |state: &mut State| {
			let out = f(state);
			let reply: Reply = Box::new(move |snapshot: StateSnapshot| {
				let _ = reply_tx.send((out, snapshot));
			});
			reply
		});
		self.tx.send(Request::Apply(job)).map_err(|_| StateError::Closed)?;
		reply_rx.await.map_err(|_| StateError::Closed)
	}

	/// Runs a transform that only mutates, returning the resulting snapshot.
	pub async fn transform<F>(&self, f: F) -> Result<StateSnapshot, StateError>
	where
		F: FnOnce(&mut State) + Send + 'static,
	{
		self.with_state(f).await.map(|((), snapshot)| snapshot)
	}

	/// Queues a transform without waiting for it, e.g. from a `Drop` impl.
	///
	/// Transforms submitted later still run after this one.
	pub fn submit<F>(&self, f: F) -> Result<(), StateError>
	where
		F: FnOnce(&mut State) + Send + 'static,
	{
		let job: Job = Box::new(move |state: &mut State| {
			f(state);
			let reply: Reply = Box::new(|_| {});
			reply
		});
		self.tx.send(Request::Apply(job)).map_err(|_| StateError::Closed)
	}

	/// Sets `key` to `value`; a no-op (with no listener calls) when the value is unchanged.
	pub async fn set(&self, key: &str, value: impl Into<Value>, opts: SetOptions) -> Result<StateSnapshot, StateError> {
		let key = key.to_string();
		let value = value.into();
		let (res, snapshot) = self.with_state(move |state| state.set(&key, value, opts)).await?;
		res.map(|_| snapshot)
	}

	/// Replaces the value of `key` with `f(current)`.
	pub async fn update<F>(&self, key: &str, f: F) -> Result<StateSnapshot, StateError>
	where
		F: FnOnce(Option<&Value>) -> Value + Send + 'static,
	{
		let key = key.to_string();
		let (res, snapshot) = self.with_state(move |state| state.update(&key, f)).await?;
		res.map(|_| snapshot)
	}

	/// Moves to prefix `code` with key text `prefix`.
	pub async fn set_prefix(&self, code: u64, prefix: impl Into<String>) -> Result<StateSnapshot, StateError> {
		let prefix = prefix.into();
		self.transform(move |state| state.set_prefix(code, prefix)).await
	}

	/// Applies transient reset values; only entries that actually change notify listeners.
	pub async fn reset(&self) -> Result<StateSnapshot, StateError> {
		self.transform(State::reset).await
	}

	/// Runs resolve listeners, then publishes every public value to the context sink.
	pub async fn resolve(&self) -> Result<StateSnapshot, StateError> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.tx.send(Request::Resolve(reply_tx)).map_err(|_| StateError::Closed)?;
		reply_rx.await.map_err(|_| StateError::Closed)
	}

	/// Returns a snapshot ordered after every previously submitted transform.
	pub async fn snapshot(&self) -> Result<StateSnapshot, StateError> {
		self.transform(|_| {}).await
	}

	/// Returns the most recently published snapshot without queueing.
	///
	/// May lag behind transforms that are still queued.
	pub fn current(&self) -> StateSnapshot {
		self.latest.read().clone()
	}

	/// Calls `listener` whenever `key` changes value.
	pub fn on_set<F>(&self, key: &str, listener: F) -> Subscription
	where
		F: Fn(&SetEvent<'_>) + Send + Sync + 'static,
	{
		self.listeners.add_set(key, Arc::new(listener))
	}

	/// Registers the resolve listener for subsystem `name`, replacing any earlier one.
	pub fn on_resolve<F>(&self, name: &str, listener: F)
	where
		F: Fn(&StateSnapshot) + Send + Sync + 'static,
	{
		self.listeners.set_resolve(name, Arc::new(listener));
	}

	/// Removes the resolve listener for `name`. Returns whether one existed.
	pub fn remove_resolve(&self, name: &str) -> bool {
		self.listeners.remove_resolve(name)
	}

	/// Stops the actor after the transforms already queued; later calls fail with [`StateError::Closed`].
	pub fn close(&self) {
		let _ = self.tx.send(Request::Shutdown);
	}

	/// Returns true once the actor has stopped.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

impl std::fmt::Debug for StateStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StateStore").field("latest", &*self.latest.read()).finish()
	}
}

async fn run_actor(
	mut state: State,
	mut rx: mpsc::UnboundedReceiver<Request>,
	listeners: Arc<Listeners>,
	latest: Arc<RwLock<StateSnapshot>>,
	sink: Arc<dyn ContextSink>,
) {
	debug!("state actor started");
	while let Some(request) = rx.recv().await {
		match request {
			Request::Apply(job) => {
				let reply = job(&mut state);
				let changes = state.take_changes();
				let snapshot = state.snapshot();
				if !changes.is_empty() {
					*latest.write() = snapshot.clone();
					listeners.fire_set(&changes, &snapshot);
				}
				reply(snapshot);
			}
			Request::Resolve(reply) => {
				let snapshot = state.snapshot();
				listeners.fire_resolve(&snapshot);
				for (key, value) in state.public_values() {
					trace!(key, ?value, "publishing context value");
					sink.set_context(key, value);
				}
				let _ = reply.send(snapshot);
			}
			Request::Shutdown => break,
		}
	}
	debug!("state actor stopped");
}
