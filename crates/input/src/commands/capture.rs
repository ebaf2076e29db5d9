use async_trait::async_trait;
use keyseq_invocation::Resolved;
use keyseq_state::{SetOptions, Value, keys};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CAPTURE_KEYS, Command, CommandCx, INSERT_CHAR, REPLACE_CHAR, capture_step};
use crate::error::{CommandError, parse_args};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CaptureArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	accept_after: Option<usize>,
}

/// Captures free text into the `captured` state entry.
///
/// Without `text` the keys typed next are captured until Enter or
/// `acceptAfter` characters; the result is written back as `text`.
pub(super) struct CaptureKeys;

#[async_trait]
impl Command for CaptureKeys {
	fn name(&self) -> &'static str {
		CAPTURE_KEYS
	}

	fn is_interactive(&self, args: &Value) -> bool {
		args.get("text").is_none()
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let mut args: CaptureArgs = parse_args(CAPTURE_KEYS, args)?;
		let d = cx.dispatcher;
		if let Some(text) = &args.text {
			d.state().set(keys::CAPTURED, text.as_str(), SetOptions::default()).await?;
			return Ok(Resolved::completed());
		}
		let accept_after = args.accept_after;
		let captured = d
			.capture_keys(move |text, ch| capture_step(text, ch, accept_after))
			.await?;
		if !captured.stopped {
			debug!(partial = %captured.text, "text capture abandoned");
			return Ok(Resolved::canceled());
		}
		args.text = Some(captured.text);
		Ok(Resolved::with_args(to_value(CAPTURE_KEYS, &args)?))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CharArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	char: Option<char>,
}

/// Replaces or inserts one character at every cursor, capturing it first when not given.
pub(super) enum CharCommand {
	Replace,
	Insert,
}

#[async_trait]
impl Command for CharCommand {
	fn name(&self) -> &'static str {
		match self {
			Self::Replace => REPLACE_CHAR,
			Self::Insert => INSERT_CHAR,
		}
	}

	fn is_interactive(&self, args: &Value) -> bool {
		args.get("char").is_none()
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: CharArgs = parse_args(self.name(), args)?;
		let d = cx.dispatcher;
		let (ch, typed) = match args.char {
			Some(ch) => (ch, false),
			None => {
				let captured = d.capture_keys(|_, ch| (ch.to_string(), true)).await?;
				match captured.text.chars().next() {
					Some(ch) if captured.stopped => (ch, true),
					_ => return Ok(Resolved::canceled()),
				}
			}
		};
		let editor = d.active_editor()?;
		match self {
			Self::Replace => d.host().replace_char(editor, ch)?,
			Self::Insert => d.host().insert_char(editor, ch)?,
		}
		if !typed {
			return Ok(Resolved::completed());
		}
		Ok(Resolved::with_args(to_value(self.name(), &CharArgs { char: Some(ch) })?))
	}
}

pub(super) fn to_value<T: Serialize>(command: &str, args: &T) -> Result<Value, CommandError> {
	serde_json::to_value(args).map_err(|e| CommandError::Failed(format!("cannot encode arguments of `{command}`: {e}")))
}
