use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::Value;
use crate::snapshot::StateSnapshot;
use crate::state::Change;

/// A value change delivered to `on_set` listeners.
#[derive(Debug, Clone, Copy)]
pub struct SetEvent<'a> {
	/// Key that changed.
	pub key: &'a str,
	/// Previous value, `None` when the entry did not exist.
	pub old: Option<&'a Value>,
	/// New value.
	pub new: &'a Value,
	/// Snapshot taken after the transform that produced this change.
	pub snapshot: &'a StateSnapshot,
}

pub(crate) type SetListener = Arc<dyn Fn(&SetEvent<'_>) + Send + Sync>;
pub(crate) type ResolveListener = Arc<dyn Fn(&StateSnapshot) + Send + Sync>;

/// Observer registry shared between store handles and the state actor.
#[derive(Default)]
pub(crate) struct Listeners {
	next_id: AtomicU64,
	on_set: Mutex<FxHashMap<String, Vec<(u64, SetListener)>>>,
	on_resolve: Mutex<IndexMap<String, ResolveListener>>,
}

impl Listeners {
	pub fn add_set(self: &Arc<Self>, key: &str, listener: SetListener) -> Subscription {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.on_set.lock().entry(key.to_string()).or_default().push((id, listener));
		Subscription {
			registry: Arc::downgrade(self),
			key: key.to_string(),
			id,
			active: true,
		}
	}

	/// Registers (or replaces) the resolve listener named `name`.
	pub fn set_resolve(&self, name: &str, listener: ResolveListener) {
		self.on_resolve.lock().insert(name.to_string(), listener);
	}

	pub fn remove_resolve(&self, name: &str) -> bool {
		self.on_resolve.lock().shift_remove(name).is_some()
	}

	fn remove_set(&self, key: &str, id: u64) {
		let mut map = self.on_set.lock();
		if let Some(list) = map.get_mut(key) {
			list.retain(|(lid, _)| *lid != id);
			if list.is_empty() {
				map.remove(key);
			}
		}
	}

	/// Invokes the listeners of every changed key, in change order.
	///
	/// Listener lists are cloned out of the lock first so a listener may
	/// subscribe or unsubscribe while it runs.
	pub fn fire_set(&self, changes: &[Change], snapshot: &StateSnapshot) {
		for change in changes {
			let listeners: Vec<SetListener> = match self.on_set.lock().get(&change.key) {
				Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
				None => continue,
			};
			let event = SetEvent {
				key: &change.key,
				old: change.old.as_ref(),
				new: &change.new,
				snapshot,
			};
			for listener in listeners {
				listener(&event);
			}
		}
	}

	pub fn fire_resolve(&self, snapshot: &StateSnapshot) {
		let listeners: Vec<ResolveListener> = self.on_resolve.lock().values().cloned().collect();
		for listener in listeners {
			listener(snapshot);
		}
	}
}

/// Handle returned by [`StateStore::on_set`](crate::StateStore::on_set).
///
/// The listener stays registered until the handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
	registry: Weak<Listeners>,
	key: String,
	id: u64,
	active: bool,
}

impl Subscription {
	/// Unregisters the listener now.
	pub fn unsubscribe(mut self) {
		self.remove();
	}

	/// Key this subscription listens to.
	pub fn key(&self) -> &str {
		&self.key
	}

	fn remove(&mut self) {
		if !self.active {
			return;
		}
		self.active = false;
		if let Some(registry) = self.registry.upgrade() {
			registry.remove_set(&self.key, self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.remove();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription").field("key", &self.key).field("id", &self.id).finish()
	}
}
