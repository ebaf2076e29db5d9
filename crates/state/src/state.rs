use indexmap::IndexMap;
use tracing::trace;

use crate::error::StateError;
use crate::keys;
use crate::snapshot::StateSnapshot;
use crate::Value;

/// Options attached to an entry by [`State::set`].
///
/// `None` fields keep whatever the entry already had, so callers only
/// describe an entry's metadata the first time they set it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
	/// Value restored by [`State::reset`] when the current key sequence concludes.
	pub transient: Option<Value>,
	/// Broadcast the value to the host context on every resolve.
	pub public: Option<bool>,
}

impl SetOptions {
	/// Marks the entry as resetting to `value` at the end of each key sequence.
	pub fn transient(value: impl Into<Value>) -> Self {
		Self {
			transient: Some(value.into()),
			public: None,
		}
	}

	/// Marks the entry as public.
	pub fn public() -> Self {
		Self {
			transient: None,
			public: Some(true),
		}
	}

	/// Adds the public flag to these options.
	pub fn and_public(mut self) -> Self {
		self.public = Some(true);
		self
	}
}

#[derive(Debug, Clone)]
struct Entry {
	value: Value,
	reset: Option<Value>,
	public: bool,
}

/// A single value change produced by a transform.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
	pub key: String,
	pub old: Option<Value>,
	pub new: Value,
}

/// The mutable state map visible to transforms running on the state stream.
#[derive(Debug, Clone)]
pub struct State {
	entries: IndexMap<String, Entry>,
	changes: Vec<Change>,
	version: u64,
}

impl State {
	/// Creates an empty state map.
	pub fn empty() -> Self {
		Self {
			entries: IndexMap::new(),
			changes: Vec::new(),
			version: 0,
		}
	}

	/// Creates the standard entries: `mode`, `prefix`, `prefixCode`, `count`, `captured`, `record`.
	///
	/// `prefix`, `prefixCode` and `count` reset at the end of every key sequence;
	/// `mode`, `prefixCode`, `count` and `record` are public.
	pub fn standard(default_mode: &str) -> Self {
		let mut entries = IndexMap::new();
		let mut insert = |key: &str, value: Value, reset: Option<Value>, public: bool| {
			entries.insert(key.to_string(), Entry { value, reset, public });
		};
		insert(keys::MODE, Value::from(default_mode), None, true);
		insert(keys::PREFIX, Value::from(""), Some(Value::from("")), false);
		insert(keys::PREFIX_CODE, Value::from(0), Some(Value::from(0)), true);
		insert(keys::COUNT, Value::from(0), Some(Value::from(0)), true);
		insert(keys::CAPTURED, Value::from(""), None, false);
		insert(keys::RECORD, Value::from(false), None, true);
		Self {
			entries,
			changes: Vec::new(),
			version: 0,
		}
	}

	/// Returns the current value for `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key).map(|e| &e.value)
	}

	/// Returns the monotonically increasing version of the map.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Sets `key` to `value`. Returns whether the value changed.
	///
	/// Options are applied even when the value itself is unchanged, but no
	/// change is recorded in that case and no listener fires.
	pub fn set(&mut self, key: &str, value: impl Into<Value>, opts: SetOptions) -> Result<bool, StateError> {
		if keys::is_reserved(key) {
			return Err(StateError::ReservedKey(key.to_string()));
		}
		Ok(self.set_unchecked(key, value.into(), opts))
	}

	/// Replaces the value of `key` with `f(current)`. Returns whether the value changed.
	pub fn update(&mut self, key: &str, f: impl FnOnce(Option<&Value>) -> Value) -> Result<bool, StateError> {
		if keys::is_reserved(key) {
			return Err(StateError::ReservedKey(key.to_string()));
		}
		let next = f(self.get(key));
		Ok(self.set_unchecked(key, next, SetOptions::default()))
	}

	/// Moves to prefix `code`, whose key text is `prefix`.
	///
	/// The only way `prefix` and `prefixCode` change, so the two never disagree.
	pub fn set_prefix(&mut self, code: u64, prefix: impl Into<String>) {
		self.set_unchecked(keys::PREFIX_CODE, Value::from(code), SetOptions::default());
		self.set_unchecked(keys::PREFIX, Value::from(prefix.into()), SetOptions::default());
	}

	/// Restores every entry with a transient reset value that currently differs from it.
	pub fn reset(&mut self) {
		let pending: Vec<(String, Value)> = self
			.entries
			.iter()
			.filter_map(|(key, entry)| match &entry.reset {
				Some(reset) if *reset != entry.value => Some((key.clone(), reset.clone())),
				_ => None,
			})
			.collect();
		for (key, value) in pending {
			self.set_unchecked(&key, value, SetOptions::default());
		}
	}

	/// Returns `(key, value)` for every public entry.
	pub fn public_values(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().filter(|(_, e)| e.public).map(|(k, e)| (k.as_str(), &e.value))
	}

	pub(crate) fn snapshot(&self) -> StateSnapshot {
		let values = self.entries.iter().map(|(k, e)| (k.clone(), e.value.clone())).collect();
		StateSnapshot::new(self.version, values)
	}

	pub(crate) fn take_changes(&mut self) -> Vec<Change> {
		let changes = std::mem::take(&mut self.changes);
		if !changes.is_empty() {
			self.version += 1;
		}
		changes
	}

	fn set_unchecked(&mut self, key: &str, value: Value, opts: SetOptions) -> bool {
		let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
			value: Value::Null,
			reset: None,
			public: false,
		});
		if let Some(reset) = opts.transient {
			entry.reset = Some(reset);
		}
		if let Some(public) = opts.public {
			entry.public = public;
		}
		if entry.value == value {
			return false;
		}
		let old = std::mem::replace(&mut entry.value, value.clone());
		let old = if old.is_null() { None } else { Some(old) };
		trace!(key, ?old, new = ?value, "state value changed");
		self.changes.push(Change {
			key: key.to_string(),
			old,
			new: value,
		});
		true
	}
}

impl Default for State {
	fn default() -> Self {
		Self::empty()
	}
}
