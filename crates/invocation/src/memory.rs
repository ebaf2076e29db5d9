use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::binding::{Binding, BindingId};
use crate::command::CommandRef;
use crate::error::ResolveError;
use crate::eval::{Evaluator, Scope};
use crate::store::{BindingStore, ModeInfo};

type LookupKey = (u64, String, String);

#[derive(Default)]
struct Table {
	bindings: FxHashMap<BindingId, Arc<Binding>>,
	index: FxHashMap<LookupKey, BindingId>,
	modes: FxHashMap<String, ModeInfo>,
}

impl Table {
	fn insert(&mut self, binding: Binding) {
		let key = (binding.prefix_code, binding.mode.clone(), binding.key.clone());
		if let Some(previous) = self.index.insert(key, binding.id.clone()) {
			if previous != binding.id {
				self.bindings.remove(&previous);
			}
		}
		self.bindings.insert(binding.id.clone(), Arc::new(binding));
	}
}

/// An in-memory binding table.
///
/// Bindings are indexed by `(prefix_code, mode, key)`; a later binding for
/// the same triple replaces the earlier one.
pub struct MemoryBindingStore {
	table: RwLock<Table>,
	default_mode: String,
	evaluator: Arc<dyn Evaluator>,
}

impl MemoryBindingStore {
	/// Creates an empty table starting in `default_mode`.
	pub fn new(default_mode: impl Into<String>, evaluator: Arc<dyn Evaluator>) -> Self {
		let default_mode = default_mode.into();
		let mut table = Table::default();
		table.modes.insert(default_mode.clone(), ModeInfo::new(default_mode.clone()));
		Self {
			table: RwLock::new(table),
			default_mode,
			evaluator,
		}
	}

	/// Adds mode metadata.
	pub fn with_mode(self, info: ModeInfo) -> Self {
		self.table.write().modes.insert(info.name.clone(), info);
		self
	}

	/// Adds a binding.
	pub fn with_binding(self, binding: Binding) -> Self {
		self.insert(binding);
		self
	}

	/// Adds or replaces a binding.
	pub fn insert(&self, binding: Binding) {
		self.table.write().insert(binding);
	}

	/// Replaces every binding at once, keeping mode metadata.
	pub fn set_bindings(&self, bindings: impl IntoIterator<Item = Binding>) {
		let mut table = self.table.write();
		table.bindings.clear();
		table.index.clear();
		for binding in bindings {
			table.insert(binding);
		}
		debug!(count = table.bindings.len(), "bindings replaced");
	}

	/// Number of stored bindings.
	pub fn len(&self) -> usize {
		self.table.read().bindings.len()
	}

	/// Whether the table holds no bindings.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn command_at(&self, id: &BindingId, index: usize) -> Result<CommandRef, ResolveError> {
		let table = self.table.read();
		let binding = table.bindings.get(id).ok_or_else(|| ResolveError::UnknownBinding(id.clone()))?;
		binding
			.commands
			.get(index)
			.cloned()
			.ok_or_else(|| ResolveError::NoCommand { id: id.clone(), index })
	}
}

impl BindingStore for MemoryBindingStore {
	fn lookup(&self, prefix_code: u64, mode: &str, key: &str) -> Option<Arc<Binding>> {
		let table = self.table.read();
		let id = table.index.get(&(prefix_code, mode.to_string(), key.to_string()))?;
		table.bindings.get(id).cloned()
	}

	fn binding(&self, id: &BindingId) -> Option<Arc<Binding>> {
		self.table.read().bindings.get(id).cloned()
	}

	fn bindings_under(&self, prefix_code: u64, mode: &str) -> Vec<Arc<Binding>> {
		let table = self.table.read();
		let mut found: Vec<Arc<Binding>> = table
			.bindings
			.values()
			.filter(|b| b.prefix_code == prefix_code && b.mode == mode)
			.cloned()
			.collect();
		found.sort_by(|a, b| a.key.cmp(&b.key));
		found
	}

	fn resolve_command(&self, id: &BindingId, index: usize, scope: &Scope) -> Result<CommandRef, ResolveError> {
		let mut command = self.command_at(id, index)?;
		let Some(computed) = command.computed_args.take() else {
			return Ok(command);
		};
		let mut args = match std::mem::take(&mut command.args) {
			Value::Object(map) => map,
			Value::Null => Map::new(),
			other => {
				let mut map = Map::new();
				map.insert("value".to_string(), other);
				map
			}
		};
		for (arg, expr) in &computed {
			let value = match expr {
				Value::String(expr) => self.evaluator.evaluate(expr, scope).map_err(|source| ResolveError::Eval {
					id: id.clone(),
					arg: arg.clone(),
					source,
				})?,
				literal => literal.clone(),
			};
			trace!(binding = %id, arg, ?value, "computed argument");
			args.insert(arg.clone(), value);
		}
		command.args = Value::Object(args);
		command.computed_args = Some(computed);
		Ok(command)
	}

	fn store_command(&self, id: &BindingId, index: usize, command: CommandRef) -> Result<(), ResolveError> {
		let mut table = self.table.write();
		let binding = table
			.bindings
			.get_mut(id)
			.ok_or_else(|| ResolveError::UnknownBinding(id.clone()))?;
		let binding = Arc::make_mut(binding);
		let slot = binding
			.commands
			.get_mut(index)
			.ok_or_else(|| ResolveError::NoCommand { id: id.clone(), index })?;
		trace!(binding = %id, index, command = %command.describe(), "stored edited command");
		*slot = command;
		Ok(())
	}

	fn default_mode(&self) -> String {
		self.default_mode.clone()
	}

	fn mode_info(&self, mode: &str) -> Option<ModeInfo> {
		self.table.read().modes.get(mode).cloned()
	}
}

impl std::fmt::Debug for MemoryBindingStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryBindingStore")
			.field("bindings", &self.len())
			.field("default_mode", &self.default_mode)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use keyseq_primitives::CursorShape;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::eval::PathEvaluator;
	use crate::store::WhenNoBinding;

	fn store() -> MemoryBindingStore {
		MemoryBindingStore::new("normal", Arc::new(PathEvaluator))
			.with_mode(ModeInfo::new("insert").when_no_binding(WhenNoBinding::InsertCharacters))
			.with_binding(Binding::new("g", "g", "normal", 0, vec![CommandRef::new("prefix", json!({"code": 1}))]))
			.with_binding(
				Binding::new("gg", "g", "normal", 1, vec![CommandRef::bare("cursorTop").with_computed("lines", "count")])
					.finished(),
			)
	}

	#[test]
	fn lookup_is_scoped_by_prefix_and_mode() {
		let store = store();
		assert_eq!(store.lookup(0, "normal", "g").unwrap().id.as_str(), "g");
		assert_eq!(store.lookup(1, "normal", "g").unwrap().id.as_str(), "gg");
		assert!(store.lookup(0, "insert", "g").is_none());
	}

	#[test]
	fn resolve_merges_computed_args() {
		let store = store();
		let scope = Scope::new().with("count", 4);
		let cmd = store.resolve_command(&"gg".into(), 0, &scope).unwrap();
		assert_eq!(cmd.args, json!({ "lines": 4 }));
	}

	#[test]
	fn resolve_reports_eval_failures() {
		let store = store();
		let err = store.resolve_command(&"gg".into(), 0, &Scope::new()).unwrap_err();
		assert!(matches!(err, ResolveError::Eval { ref arg, .. } if arg == "lines"));
		assert_eq!(
			store.resolve_command(&"gg".into(), 3, &Scope::new()),
			Err(ResolveError::NoCommand { id: "gg".into(), index: 3 })
		);
	}

	#[test]
	fn store_command_replaces_without_touching_readers() {
		let store = store();
		let before = store.binding(&"g".into()).unwrap();
		store
			.store_command(&"g".into(), 0, CommandRef::new("prefix", json!({"code": 1, "cursor": "block"})))
			.unwrap();
		let after = store.binding(&"g".into()).unwrap();
		assert_eq!(before.commands[0].args, json!({"code": 1}));
		assert_eq!(after.commands[0].args["cursor"], json!("block"));
	}

	#[test]
	fn set_bindings_keeps_modes() {
		let store = store();
		store.set_bindings(vec![Binding::new("i", "i", "normal", 0, vec![])]);
		assert_eq!(store.len(), 1);
		assert!(store.lookup(0, "normal", "g").is_none());
		assert_eq!(store.mode_info("insert").unwrap().when_no_binding, WhenNoBinding::InsertCharacters);
		assert_eq!(store.mode_info("normal").unwrap().cursor_shape, CursorShape::Line);
	}

	#[test]
	fn bindings_under_lists_sorted_keys() {
		let store = store().with_binding(Binding::new("a", "a", "normal", 0, vec![]));
		let keys: Vec<String> = store.bindings_under(0, "normal").iter().map(|b| b.key.clone()).collect();
		assert_eq!(keys, ["a", "g"]);
	}
}
