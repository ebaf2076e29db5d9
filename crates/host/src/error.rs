use keyseq_primitives::EditorId;
use thiserror::Error;

/// Failure reported by the host editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
	/// No editor has focus.
	#[error("no active editor")]
	NoActiveEditor,
	/// The editor was closed or never existed.
	#[error("unknown editor {0}")]
	UnknownEditor(EditorId),
	/// A host command failed.
	#[error("command `{command}` failed: {message}")]
	Command { command: String, message: String },
}

impl HostError {
	/// Builds a command failure.
	pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Command {
			command: command.into(),
			message: message.into(),
		}
	}
}
