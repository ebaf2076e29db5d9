use async_trait::async_trait;
use keyseq_host::DecorationKind;
use keyseq_invocation::Resolved;
use keyseq_primitives::{Direction, EditorId, Range};
use keyseq_search::{SearchArgs, navigate, visible_matches};
use keyseq_state::Value;
use serde::Deserialize;
use tracing::{debug, trace};

use super::capture::to_value;
use super::{Command, CommandCx, NEXT_MATCH, PREVIOUS_MATCH, SEARCH, capture_step};
use crate::dispatch::Dispatcher;
use crate::error::{CommandError, parse_args};

/// Moves every cursor to its next match, capturing the search text
/// incrementally when `text` is absent.
pub(super) struct Search;

#[async_trait]
impl Command for Search {
	fn name(&self) -> &'static str {
		SEARCH
	}

	fn is_interactive(&self, args: &Value) -> bool {
		args.get("text").is_none()
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let mut args: SearchArgs = parse_args(SEARCH, args)?;
		let d = cx.dispatcher;
		let editor = d.active_editor()?;
		let register = args.register.clone().unwrap_or_else(|| d.config().default_register.clone());
		let from = d.host().selections(editor)?;
		let direction = direction_of(&args);
		{
			let mut searches = d.searches().lock();
			let state = searches.entry(editor, &register, || from.clone());
			state.args = args.clone();
			state.search_from = from.clone();
			state.text = args.text.clone().unwrap_or_default();
			state.landings.clear();
			state.modified = true;
		}

		if args.text.is_some() {
			show_matches(d, editor, &register, direction, false)?;
			return Ok(Resolved::completed());
		}

		let accept_after = args.accept_after;
		let captured = {
			let d = d.clone();
			let register = register.clone();
			cx.dispatcher
				.capture_keys(move |text, ch| {
					let (text, stop) = capture_step(text, ch, accept_after);
					if let Some(state) = d.searches().lock().get_mut(editor, &register) {
						state.text = text.clone();
					}
					if let Err(err) = show_matches(&d, editor, &register, direction, false) {
						trace!(%err, "incremental search skipped");
					}
					(text, stop)
				})
				.await?
		};

		if !captured.stopped || captured.text.is_empty() {
			debug!(register, "search abandoned");
			d.host().set_selections(editor, from)?;
			clear_matches(d, editor);
			return Ok(Resolved::canceled());
		}
		args.text = Some(captured.text);
		Ok(Resolved::with_args(to_value(SEARCH, &args)?))
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RepeatArgs {
	register: Option<String>,
}

/// Repeats the last search of a register, in its direction or reversed.
pub(super) enum RepeatSearch {
	Next,
	Previous,
}

#[async_trait]
impl Command for RepeatSearch {
	fn name(&self) -> &'static str {
		match self {
			Self::Next => NEXT_MATCH,
			Self::Previous => PREVIOUS_MATCH,
		}
	}

	async fn run(&self, cx: CommandCx<'_>, args: &Value) -> Result<Resolved<Value>, CommandError> {
		let args: RepeatArgs = parse_args(self.name(), args)?;
		let d = cx.dispatcher;
		let editor = d.active_editor()?;
		let register = args.register.unwrap_or_else(|| d.config().default_register.clone());
		let direction = match d.searches().lock().get(editor, &register) {
			Some(state) => direction_of(&state.args),
			None => {
				debug!(%editor, register, "no search to repeat");
				return Ok(Resolved::completed());
			}
		};
		let direction = match self {
			Self::Next => direction,
			Self::Previous => direction.reverse(),
		};
		show_matches(d, editor, &register, direction, true)?;
		Ok(Resolved::completed())
	}
}

fn direction_of(args: &SearchArgs) -> Direction {
	if args.backwards { Direction::Backward } else { Direction::Forward }
}

/// Navigates with the register's current text and refreshes the highlights.
///
/// A first navigation starts from the selections the search began with; a
/// repeated one from the current selections. Returns whether any cursor found
/// a match.
fn show_matches(
	d: &Dispatcher,
	editor: EditorId,
	register: &str,
	direction: Direction,
	repeat: bool,
) -> Result<bool, CommandError> {
	let host = d.host();
	let text = host.text(editor)?;
	let current = if repeat { Some(host.selections(editor)?) } else { None };
	let mut searches = d.searches().lock();
	let Some(state) = searches.get_mut(editor, register) else {
		return Ok(false);
	};
	state.modified = true;
	if state.text.is_empty() {
		state.landings.clear();
		state.highlighted = false;
		let origin = current.unwrap_or_else(|| state.search_from.clone());
		drop(searches);
		host.set_selections(editor, origin)?;
		clear_matches(d, editor);
		return Ok(false);
	}
	let pattern = state.args.pattern(&state.text)?;
	let nav = match &current {
		Some(selection) => navigate(&text, &pattern, &state.args, selection, Some(&state.landings), direction),
		None => navigate(&text, &pattern, &state.args, &state.search_from, None, direction),
	};
	let active = nav.active_matches();
	let others: Vec<Range> = visible_matches(&text, &pattern, &host.visible_lines(editor)?)
		.into_iter()
		.filter(|m| !active.contains(m))
		.collect();
	trace!(register, active = active.len(), others = others.len(), "search navigated");
	state.landings = nav.landings.clone();
	state.highlighted = true;
	drop(searches);

	let found = nav.found();
	host.set_selections(editor, nav.selection)?;
	host.set_decorations(editor, DecorationKind::ActiveMatch, active);
	host.set_decorations(editor, DecorationKind::OtherMatches, others);
	Ok(found)
}

pub(crate) fn clear_matches(d: &Dispatcher, editor: EditorId) {
	d.host().set_decorations(editor, DecorationKind::ActiveMatch, Vec::new());
	d.host().set_decorations(editor, DecorationKind::OtherMatches, Vec::new());
}
