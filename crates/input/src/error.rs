use keyseq_history::HistoryError;
use keyseq_host::HostError;
use keyseq_invocation::ResolveError;
use keyseq_search::SearchError;
use keyseq_state::StateError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure of a command run by the dispatcher.
///
/// [`CommandError::InvalidArgs`] skips the offending command and the cycle
/// goes on. Every other variant aborts the cycle, is shown to the user, and
/// forces a reset of transient state.
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("invalid arguments for `{command}`: {message}")]
	InvalidArgs { command: String, message: String },
	#[error(transparent)]
	Host(#[from] HostError),
	#[error(transparent)]
	Search(#[from] SearchError),
	#[error(transparent)]
	History(#[from] HistoryError),
	#[error(transparent)]
	State(#[from] StateError),
	#[error(transparent)]
	Resolve(#[from] ResolveError),
	#[error("{0}")]
	Failed(String),
}

impl CommandError {
	/// Whether the cycle survives this error.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::InvalidArgs { .. })
	}
}

/// Decodes command arguments; absent arguments decode like an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(command: &str, args: &Value) -> Result<T, CommandError> {
	let args = match args {
		Value::Null => Value::Object(Default::default()),
		other => other.clone(),
	};
	serde_json::from_value(args).map_err(|e| CommandError::InvalidArgs {
		command: command.to_string(),
		message: e.to_string(),
	})
}
