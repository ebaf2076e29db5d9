use keyseq_invocation::{Binding, BindingId, CommandRef};
use serde::{Deserialize, Serialize};

/// One executed binding, as it actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub binding_id: BindingId,
	pub key: String,
	pub mode: String,
	pub prefix_code: u64,
	/// Commands with the arguments they ran with, interactive input included.
	pub commands: Vec<CommandRef>,
	/// Extra repetitions that completed.
	pub repeat: i64,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub doc: Option<String>,
	/// Text typed while recording, reinserted on replay.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edit: Option<String>,
}

impl HistoryEntry {
	/// Snapshots `binding` with the commands and repeat count it ran with.
	pub fn from_binding(binding: &Binding, commands: Vec<CommandRef>, repeat: i64) -> Self {
		Self {
			binding_id: binding.id.clone(),
			key: binding.key.clone(),
			mode: binding.mode.clone(),
			prefix_code: binding.prefix_code,
			commands,
			repeat,
			tags: binding.tags.clone(),
			doc: binding.doc.clone(),
			edit: None,
		}
	}
}
