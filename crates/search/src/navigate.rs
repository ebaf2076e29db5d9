use std::ops::Range as LineRange;

use keyseq_primitives::{CharIdx, Direction, Range, Selection};
use ropey::Rope;

use crate::args::SearchArgs;
use crate::matches::{MatchIter, continue_from, find_match};
use crate::pattern::Pattern;

/// Where one cursor landed and the match it landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landing {
	pub position: CharIdx,
	pub matched: Range,
}

/// Outcome of moving every cursor to its next match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
	/// New selections; cursors without a match keep their range.
	pub selection: Selection,
	/// One entry per cursor that found a match.
	pub landings: Vec<Landing>,
}

impl Navigation {
	/// Whether any cursor found a match.
	pub fn found(&self) -> bool {
		!self.landings.is_empty()
	}

	/// The matches cursors landed on.
	pub fn active_matches(&self) -> Vec<Range> {
		self.landings.iter().map(|l| l.matched).collect()
	}
}

/// Moves each range of `from` to its own next match.
///
/// Every cursor searches from its head independently of the others. On a
/// first navigation (`previous` is `None`) the match nearest to the head is
/// taken and `args.skip` further navigations are applied. On a repeated
/// navigation a cursor still sitting where the last one placed it resumes
/// just past that match, so offsets that land before the match do not find
/// it again; `skip` is not reapplied.
pub fn navigate(
	text: &Rope,
	pattern: &Pattern,
	args: &SearchArgs,
	from: &Selection,
	previous: Option<&[Landing]>,
	direction: Direction,
) -> Navigation {
	let len = text.len_chars();
	let placement = args.placement();
	let skip = if previous.is_some() { 0 } else { args.skip };
	let mut landings = Vec::new();
	let selection = from.transform(|range| {
		let start = previous
			.and_then(|landings| landings.iter().find(|l| l.position == range.head))
			.map_or(range.head, |l| continue_from(&l.matched, direction));
		let Some(matched) = find_match(text, pattern, start, direction, args.wrap_around, skip) else {
			return *range;
		};
		let position = placement.position(&matched, direction, len);
		landings.push(Landing { position, matched });
		if args.select_till_match {
			Range::new(range.anchor, position)
		} else {
			Range::point(position)
		}
	});
	Navigation { selection, landings }
}

/// Every match inside the visible line ranges, in document order.
pub fn visible_matches(text: &Rope, pattern: &Pattern, visible: &[LineRange<usize>]) -> Vec<Range> {
	let lines = text.len_lines();
	let mut found = Vec::new();
	for range in visible {
		if range.start >= lines || range.start >= range.end {
			continue;
		}
		let start = text.line_to_char(range.start);
		let end = if range.end >= lines { text.len_chars() } else { text.line_to_char(range.end) };
		found.extend(MatchIter::new(text, pattern, start, Direction::Forward).bounded(end));
	}
	found
}
