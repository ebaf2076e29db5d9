use std::sync::Arc;

use indexmap::IndexMap;

use crate::Value;
use crate::keys;

/// Immutable view of the state map at one version.
///
/// Cheap to clone; every transform on the state stream answers with one.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
	version: u64,
	values: Arc<IndexMap<String, Value>>,
}

impl StateSnapshot {
	pub(crate) fn new(version: u64, values: IndexMap<String, Value>) -> Self {
		Self {
			version,
			values: Arc::new(values),
		}
	}

	/// Version of the map this snapshot was taken from.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Returns the raw value for `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.values.get(key)
	}

	/// Iterates all `(key, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Current mode name.
	pub fn mode(&self) -> &str {
		self.get_str(keys::MODE)
	}

	/// Keys typed so far in the current sequence.
	pub fn prefix(&self) -> &str {
		self.get_str(keys::PREFIX)
	}

	/// Id of the current prefix.
	pub fn prefix_code(&self) -> u64 {
		self.get(keys::PREFIX_CODE).and_then(Value::as_u64).unwrap_or(0)
	}

	/// Pending count, `0` when none was typed.
	pub fn count(&self) -> u64 {
		self.get(keys::COUNT).and_then(Value::as_u64).unwrap_or(0)
	}

	/// Text gathered by the most recent capture.
	pub fn captured(&self) -> &str {
		self.get_str(keys::CAPTURED)
	}

	/// Whether edit recording is on.
	pub fn record(&self) -> bool {
		self.flag(keys::RECORD)
	}

	/// Reads a boolean entry, treating anything else as `false`.
	pub fn flag(&self, key: &str) -> bool {
		self.get(key).and_then(Value::as_bool).unwrap_or(false)
	}

	/// Copies every entry into a JSON object, the shape expression scopes start from.
	pub fn to_map(&self) -> serde_json::Map<String, Value> {
		self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	fn get_str(&self, key: &str) -> &str {
		self.get(key).and_then(Value::as_str).unwrap_or_default()
	}
}

impl Default for StateSnapshot {
	fn default() -> Self {
		Self::new(0, IndexMap::new())
	}
}
