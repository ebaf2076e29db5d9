use async_trait::async_trait;
use keyseq_invocation::Resolved;
use keyseq_primitives::{CursorShape, join_keys};
use keyseq_state::{SetOptions, Value, keys};
use serde::Deserialize;

use super::{Command, CommandCx, PREFIX, RECORD, SET_FLAG, SET_MODE, UPDATE_COUNT};
use crate::error::{CommandError, parse_args};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PrefixArgs {
	code: u64,
	#[serde(default)]
	flag: Option<String>,
	#[serde(default)]
	cursor: Option<CursorShape>,
}

/// Extends the current prefix with the binding's key.
pub(super) struct Prefix;

#[async_trait]
impl Command for Prefix {
	fn name(&self) -> &'static str {
		PREFIX
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let PrefixArgs { code, flag, cursor } = parse_args(PREFIX, args)?;
		if let Some(flag) = flag.as_deref().filter(|flag| keys::is_reserved(flag)) {
			return Err(CommandError::InvalidArgs {
				command: PREFIX.to_string(),
				message: format!("`{flag}` cannot be used as a flag"),
			});
		}
		let key = cx.key.to_string();
		let (result, _) = cx
			.dispatcher
			.state()
			.with_state(move |s| {
				let current = s.get(keys::PREFIX).and_then(Value::as_str).unwrap_or_default();
				let prefix = join_keys(current, &key);
				s.set_prefix(code, prefix);
				match flag {
					Some(flag) => s.set(&flag, true, SetOptions::transient(false).and_public()).map(|_| ()),
					None => Ok(()),
				}
			})
			.await?;
		result?;
		if let Some(shape) = cursor {
			cx.dispatcher.host().set_cursor_shape(shape);
		}
		Ok(Resolved::completed())
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValueArgs<T> {
	value: T,
}

pub(super) struct SetMode;

#[async_trait]
impl Command for SetMode {
	fn name(&self) -> &'static str {
		SET_MODE
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: ValueArgs<String> = parse_args(SET_MODE, args)?;
		cx.dispatcher.state().set(keys::MODE, args.value, SetOptions::default()).await?;
		Ok(Resolved::completed())
	}
}

/// Appends a digit to the pending count.
pub(super) struct UpdateCount;

#[async_trait]
impl Command for UpdateCount {
	fn name(&self) -> &'static str {
		UPDATE_COUNT
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let ValueArgs { value } = parse_args::<ValueArgs<u64>>(UPDATE_COUNT, args)?;
		cx.dispatcher
			.state()
			.update(keys::COUNT, move |count| {
				let count = count.and_then(Value::as_u64).unwrap_or(0);
				Value::from(count.saturating_mul(10).saturating_add(value))
			})
			.await?;
		Ok(Resolved::completed())
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlagArgs {
	name: String,
	value: bool,
	#[serde(default)]
	transient: bool,
}

/// Sets a public boolean flag, optionally reset to `false` when the key sequence ends.
pub(super) struct SetFlag;

#[async_trait]
impl Command for SetFlag {
	fn name(&self) -> &'static str {
		SET_FLAG
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let FlagArgs { name, value, transient } = parse_args(SET_FLAG, args)?;
		let opts = if transient {
			SetOptions::transient(false).and_public()
		} else {
			SetOptions::public()
		};
		cx.dispatcher.state().set(&name, value, opts).await?;
		Ok(Resolved::completed())
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordArgs {
	on: bool,
}

/// Turns edit recording on or off.
pub(super) struct Record;

#[async_trait]
impl Command for Record {
	fn name(&self) -> &'static str {
		RECORD
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let RecordArgs { on } = parse_args(RECORD, args)?;
		cx.dispatcher.state().set(keys::RECORD, on, SetOptions::default()).await?;
		Ok(Resolved::completed())
	}
}
