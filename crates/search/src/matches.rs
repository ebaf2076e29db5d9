use std::collections::VecDeque;

use keyseq_primitives::{CharIdx, Direction, Range};
use ropey::Rope;
use tracing::trace;

use crate::pattern::Pattern;

/// Which matches of a line a scan step keeps, relative to the starting column.
#[derive(Debug, Clone, Copy)]
enum LineFilter {
	All,
	/// Forward first step: matches starting at or after the column.
	StartingFrom(CharIdx),
	/// Forward wrap step: matches starting before the column.
	StartingBefore(CharIdx),
	/// Backward first step: matches ending at or before the column.
	EndingBy(CharIdx),
	/// Backward wrap step: matches ending after the column.
	EndingAfter(CharIdx),
}

/// Lazy sequence of matches walking away from a starting position.
///
/// The current line is scanned from the start column, then following lines
/// in the search direction. With wraparound the scan continues from the far
/// end of the document until it is back where it started, so every match is
/// yielded at most once. Matches are yielded as ranges with `anchor` at the
/// match start and `head` at its end.
pub struct MatchIter<'a> {
	text: &'a Rope,
	pattern: &'a Pattern,
	direction: Direction,
	wrap: bool,
	bound: Option<CharIdx>,
	start_line: usize,
	start_col: CharIdx,
	step: usize,
	pending: VecDeque<Range>,
	done: bool,
}

impl<'a> MatchIter<'a> {
	/// Starts a scan at `from` (clamped to the document).
	pub fn new(text: &'a Rope, pattern: &'a Pattern, from: CharIdx, direction: Direction) -> Self {
		let mut iter = Self {
			text,
			pattern,
			direction,
			wrap: false,
			bound: None,
			start_line: 0,
			start_col: 0,
			step: 0,
			pending: VecDeque::new(),
			done: false,
		};
		iter.restart(from);
		iter
	}

	/// Continues past the document end from the other side, back to the start position.
	pub fn wrap_around(mut self, wrap: bool) -> Self {
		self.wrap = wrap;
		self
	}

	/// Stops the scan at `bound`: forward scans yield matches ending at or
	/// before it, backward scans matches starting at or after it. A bound
	/// disables wraparound.
	pub fn bounded(mut self, bound: CharIdx) -> Self {
		self.bound = Some(bound);
		self
	}

	/// Rewinds the scan to start again at `from`.
	pub fn restart(&mut self, from: CharIdx) {
		let from = from.min(self.text.len_chars());
		self.start_line = self.text.char_to_line(from);
		self.start_col = from - self.text.line_to_char(self.start_line);
		self.step = 0;
		self.pending.clear();
		self.done = false;
	}

	fn total_steps(&self) -> usize {
		let lines = self.text.len_lines();
		let wrapping = self.wrap && self.bound.is_none();
		match (self.direction, wrapping) {
			(_, true) => lines + 1,
			(Direction::Forward, false) => lines - self.start_line,
			(Direction::Backward, false) => self.start_line + 1,
		}
	}

	/// Line index and filter for scan step `k`.
	fn plan(&self, k: usize) -> (usize, LineFilter) {
		let lines = self.text.len_lines();
		let (line, col) = (self.start_line, self.start_col);
		match self.direction {
			Direction::Forward if k == 0 => (line, LineFilter::StartingFrom(col)),
			Direction::Forward if k < lines - line => (line + k, LineFilter::All),
			Direction::Forward if k < lines => (k - (lines - line), LineFilter::All),
			Direction::Forward => (line, LineFilter::StartingBefore(col)),
			Direction::Backward if k == 0 => (line, LineFilter::EndingBy(col)),
			Direction::Backward if k <= line => (line - k, LineFilter::All),
			Direction::Backward if k < lines => (lines + line - k, LineFilter::All),
			Direction::Backward => (line, LineFilter::EndingAfter(col)),
		}
	}

	fn scan_line(&mut self, line: usize, filter: LineFilter) {
		let slice = self.text.line(line);
		let mut content: String = slice.chars().collect();
		while content.ends_with(['\n', '\r']) {
			content.pop();
		}
		let offset = self.text.line_to_char(line);
		let from = match filter {
			LineFilter::StartingFrom(col) => col,
			_ => 0,
		};
		let mut found: Vec<Range> = self
			.pattern
			.find_in_line(&content, from)
			.into_iter()
			.filter(|&(start, end)| match filter {
				LineFilter::All | LineFilter::StartingFrom(_) => true,
				LineFilter::StartingBefore(col) => start < col,
				LineFilter::EndingBy(col) => end <= col,
				LineFilter::EndingAfter(col) => end > col,
			})
			.map(|(start, end)| Range::new(offset + start, offset + end))
			.collect();
		if self.direction == Direction::Backward {
			found.reverse();
		}
		trace!(line, matches = found.len(), "scanned line");
		self.pending.extend(found);
	}

	fn past_bound(&self, m: &Range) -> bool {
		match (self.bound, self.direction) {
			(None, _) => false,
			(Some(bound), Direction::Forward) => m.head > bound,
			(Some(bound), Direction::Backward) => m.anchor < bound,
		}
	}
}

impl Iterator for MatchIter<'_> {
	type Item = Range;

	fn next(&mut self) -> Option<Range> {
		loop {
			if self.done {
				return None;
			}
			if let Some(m) = self.pending.pop_front() {
				if self.past_bound(&m) {
					self.done = true;
					return None;
				}
				return Some(m);
			}
			if self.step >= self.total_steps() {
				self.done = true;
				return None;
			}
			let (line, filter) = self.plan(self.step);
			self.step += 1;
			self.scan_line(line, filter);
		}
	}
}

/// Finds the match `skip` navigations away from `from`.
///
/// The first match is the nearest one at (forward) or ending at (backward)
/// `from`; each skipped navigation restarts one char past the previous
/// match's start (forward) or before its end (backward).
pub fn find_match(
	text: &Rope,
	pattern: &Pattern,
	from: CharIdx,
	direction: Direction,
	wrap: bool,
	skip: usize,
) -> Option<Range> {
	let mut iter = MatchIter::new(text, pattern, from, direction).wrap_around(wrap);
	let mut found = iter.next()?;
	for _ in 0..skip {
		iter.restart(continue_from(&found, direction));
		found = iter.next()?;
	}
	Some(found)
}

/// Position a repeated navigation resumes from after landing on `m`.
pub(crate) fn continue_from(m: &Range, direction: Direction) -> CharIdx {
	match direction {
		Direction::Forward => m.anchor + 1,
		Direction::Backward => m.head.saturating_sub(1),
	}
}
