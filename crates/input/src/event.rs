use std::sync::Arc;

use keyseq_invocation::Binding;
use keyseq_state::StateSnapshot;

/// Notifications for UI collaborators.
#[derive(Debug, Clone)]
pub enum EngineEvent {
	/// Transient state settled after a dispatch; public values were published.
	StateResolved(StateSnapshot),
	/// The binding table was replaced.
	BindingsChanged,
	/// The keys that can follow the current prefix, after the suggestion delay.
	NextKeySuggestions {
		mode: String,
		prefix: String,
		bindings: Vec<Arc<Binding>>,
	},
	/// An expression failed to evaluate.
	Diagnostic(String),
}

/// The `(prefix_code, mode)` a key event was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expected {
	pub prefix_code: u64,
	pub mode: String,
}

impl Expected {
	/// Reads the expectation off a snapshot.
	pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
		Self {
			prefix_code: snapshot.prefix_code(),
			mode: snapshot.mode().to_string(),
		}
	}
}

/// A physical key press.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
	pub key: String,
	pub expected: Expected,
}

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
	/// The binding ran and was recorded.
	Completed,
	/// A command canceled the first repetition; nothing was recorded.
	Canceled,
	/// The state moved on since the key was pressed; nothing ran.
	Stale,
	/// No binding matched; transient state was reset.
	Unbound,
	/// A command failed; transient state was reset.
	Failed,
}
