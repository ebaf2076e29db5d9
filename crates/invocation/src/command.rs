use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The reserved command that does nothing and is skipped by the dispatcher.
pub const NOOP: &str = "noop";

/// One command invocation inside a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRef {
	/// Command name, either an engine builtin or a host command.
	pub command: String,
	/// Arguments passed to the command.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub args: Value,
	/// Argument names mapped to expressions; their values are merged into
	/// `args` when the binding store resolves the command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub computed_args: Option<Map<String, Value>>,
}

impl CommandRef {
	/// Creates a command with literal arguments.
	pub fn new(command: impl Into<String>, args: Value) -> Self {
		Self {
			command: command.into(),
			args,
			computed_args: None,
		}
	}

	/// Creates a command without arguments.
	pub fn bare(command: impl Into<String>) -> Self {
		Self::new(command, Value::Null)
	}

	/// Adds an argument computed from `expr` at resolve time.
	pub fn with_computed(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
		self.computed_args
			.get_or_insert_with(Map::new)
			.insert(name.into(), Value::String(expr.into()));
		self
	}

	/// Whether this is the reserved no-op command.
	pub fn is_noop(&self) -> bool {
		self.command == NOOP
	}

	/// Short description for tracing/logging.
	pub fn describe(&self) -> String {
		match &self.args {
			Value::Null => self.command.clone(),
			Value::Object(map) if map.is_empty() => self.command.clone(),
			args => format!("{} {args}", self.command),
		}
	}
}

/// Whether a command ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// The command finished.
	Completed,
	/// The command was canceled; the current repetition stops.
	Canceled,
}

/// Result of running a command.
///
/// Interactive commands that gathered input return the arguments they
/// effectively ran with in `args`, and the dispatcher writes them back onto
/// the stored binding so later replays run without interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
	/// Completion status.
	pub outcome: Outcome,
	/// Edited arguments to persist, if any.
	pub args: Option<T>,
}

impl<T> Resolved<T> {
	/// A completed run with nothing to persist.
	pub fn completed() -> Self {
		Self {
			outcome: Outcome::Completed,
			args: None,
		}
	}

	/// A canceled run.
	pub fn canceled() -> Self {
		Self {
			outcome: Outcome::Canceled,
			args: None,
		}
	}

	/// A completed run that edited its arguments.
	pub fn with_args(args: T) -> Self {
		Self {
			outcome: Outcome::Completed,
			args: Some(args),
		}
	}

	/// Whether the run was canceled.
	pub fn is_canceled(&self) -> bool {
		self.outcome == Outcome::Canceled
	}

	/// Maps the persisted arguments, keeping the outcome.
	pub fn map_args<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
		Resolved {
			outcome: self.outcome,
			args: self.args.map(f),
		}
	}
}
