use std::sync::atomic::Ordering;

use async_trait::async_trait;
use keyseq_history::{HistoryEntry, HistoryError, Selector};
use keyseq_invocation::{NOOP, Resolved};
use keyseq_state::Value;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::{Command, CommandCx, PREFIX, PUSH_HISTORY_TO_STACK, REPLAY_FROM_HISTORY, REPLAY_FROM_STACK};
use crate::dispatch::Dispatcher;
use crate::error::{CommandError, parse_args};
use crate::event::EngineEvent;

/// Nested replays allowed before a replay is refused.
const MAX_REPLAY_DEPTH: usize = 16;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SelectArgs {
	from: Option<String>,
	to: Option<String>,
	index: Option<String>,
	register: Option<String>,
}

impl SelectArgs {
	fn selector(&self) -> Result<Selector, HistoryError> {
		Selector::from_parts(self.from.clone(), self.to.clone(), self.index.clone())
	}
}

/// Evaluates the selector against history. `None` means nothing was selected.
async fn select(d: &Dispatcher, command: &str, args: &SelectArgs) -> Result<Option<Vec<HistoryEntry>>, CommandError> {
	let selector = match args.selector() {
		Ok(selector) => selector,
		Err(err) => {
			return Err(CommandError::InvalidArgs {
				command: command.to_string(),
				message: err.to_string(),
			});
		}
	};
	let scope = d.scope().await?;
	let selected = d.history().lock().select(&selector, d.evaluator(), &scope);
	match selected {
		Ok(entries) if entries.is_empty() => Ok(None),
		Ok(entries) => Ok(Some(entries)),
		Err(HistoryError::Eval(err)) => {
			d.emit(EngineEvent::Diagnostic(err.to_string()));
			Ok(None)
		}
		Err(err) => {
			debug!(%err, "history selection matched nothing");
			Ok(None)
		}
	}
}

/// Replays a range of history picked by `from`/`to` or `index` expressions.
pub(super) struct ReplayFromHistory;

#[async_trait]
impl Command for ReplayFromHistory {
	fn name(&self) -> &'static str {
		REPLAY_FROM_HISTORY
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: SelectArgs = parse_args(REPLAY_FROM_HISTORY, args)?;
		let Some(entries) = select(cx.dispatcher, REPLAY_FROM_HISTORY, &args).await? else {
			return Ok(Resolved::canceled());
		};
		replay(cx.dispatcher, &entries).await?;
		Ok(Resolved::completed())
	}
}

/// Copies a range of history onto a macro stack without running it.
pub(super) struct PushHistoryToStack;

#[async_trait]
impl Command for PushHistoryToStack {
	fn name(&self) -> &'static str {
		PUSH_HISTORY_TO_STACK
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: SelectArgs = parse_args(PUSH_HISTORY_TO_STACK, args)?;
		let d = cx.dispatcher;
		let Some(entries) = select(d, PUSH_HISTORY_TO_STACK, &args).await? else {
			return Ok(Resolved::canceled());
		};
		let register = args.register.unwrap_or_else(|| d.config().default_register.clone());
		debug!(register, len = entries.len(), "pushing history to macro stack");
		d.history().lock().push_macro(&register, entries);
		Ok(Resolved::completed())
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StackArgs {
	index: usize,
	register: Option<String>,
}

/// Replays a macro stack segment; `index` 0 is the most recently pushed.
pub(super) struct ReplayFromStack;

#[async_trait]
impl Command for ReplayFromStack {
	fn name(&self) -> &'static str {
		REPLAY_FROM_STACK
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: StackArgs = parse_args(REPLAY_FROM_STACK, args)?;
		let d = cx.dispatcher;
		let register = args.register.unwrap_or_else(|| d.config().default_register.clone());
		let entries = d.history().lock().get_macro(&register, args.index).map(<[HistoryEntry]>::to_vec);
		let Some(entries) = entries else {
			return Err(CommandError::Failed(format!(
				"no macro at index {} of `{register}`",
				args.index
			)));
		};
		replay(d, &entries).await?;
		Ok(Resolved::completed())
	}
}

/// Re-runs `entries` in order, each with its recorded repeat count.
///
/// `prefix` and `noop` commands are skipped since every entry is already a
/// complete key sequence. Recorded edits are typed at every cursor after the
/// entry's commands, and the host gets `replay_delay` to settle between entries.
pub(crate) async fn replay(d: &Dispatcher, entries: &[HistoryEntry]) -> Result<(), CommandError> {
	let depth = d.replay_depth().fetch_add(1, Ordering::SeqCst);
	let _depth = DepthGuard(d);
	if depth >= MAX_REPLAY_DEPTH {
		warn!(depth, "replay nested too deeply");
		return Err(CommandError::Failed("replay nested too deeply".to_string()));
	}

	let delay = d.config().replay_delay();
	for (i, entry) in entries.iter().enumerate() {
		if i > 0 && !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		trace!(binding = %entry.binding_id, repeat = entry.repeat, "replaying entry");
		'repeat: for _ in 0..=entry.repeat.max(0) {
			for command in &entry.commands {
				if command.is_noop() || command.command == PREFIX {
					continue;
				}
				let resolved = d.run_command(command, &entry.key).await?;
				if resolved.is_canceled() {
					debug!(binding = %entry.binding_id, command = %command.command, "replay canceled");
					break 'repeat;
				}
			}
		}
		if let Some(edit) = entry.edit.as_deref().filter(|e| !e.is_empty()) {
			let editor = d.active_editor()?;
			d.host().insert_text(editor, edit)?;
		}
	}
	Ok(())
}

struct DepthGuard<'a>(&'a Dispatcher);

impl Drop for DepthGuard<'_> {
	fn drop(&mut self) {
		self.0.replay_depth().fetch_sub(1, Ordering::SeqCst);
	}
}
