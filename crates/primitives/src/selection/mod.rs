use smallvec::{SmallVec, smallvec};

use crate::range::{CharIdx, Range};


/// A set of ranges with a designated primary.
///
/// A selection always contains at least one range. Ranges are kept in the
/// order the host reported them; overlapping cursors are left alone since
/// every cursor is advanced independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
	ranges: SmallVec<[Range; 1]>,
	primary_index: usize,
}

impl Selection {
	/// Creates a selection from a primary range and any additional ranges.
	pub fn new(primary: Range, others: impl IntoIterator<Item = Range>) -> Self {
		let mut ranges: SmallVec<[Range; 1]> = smallvec![primary];
		ranges.extend(others);
		Self { ranges, primary_index: 0 }
	}

	/// Creates a single-range selection.
	pub fn single(anchor: CharIdx, head: CharIdx) -> Self {
		Self::from(Range::new(anchor, head))
	}

	/// Creates a point selection (zero-width cursor).
	pub fn point(pos: CharIdx) -> Self {
		Self::single(pos, pos)
	}

	/// Returns the primary range.
	pub fn primary(&self) -> Range {
		self.ranges[self.primary_index]
	}

	/// Returns all ranges as a slice.
	pub fn ranges(&self) -> &[Range] {
		&self.ranges
	}

	/// Returns the number of ranges in this selection.
	#[allow(clippy::len_without_is_empty, reason = "Selection is never empty")]
	pub fn len(&self) -> usize {
		self.ranges.len()
	}

	/// Iterates over all ranges.
	pub fn iter(&self) -> impl Iterator<Item = &Range> {
		self.ranges.iter()
	}

	/// Transforms all ranges using the given function, keeping the primary index.
	pub fn transform<F>(&self, f: F) -> Self
	where
		F: FnMut(&Range) -> Range,
	{
		Self {
			ranges: self.ranges.iter().map(f).collect(),
			primary_index: self.primary_index,
		}
	}

	/// Clamps all ranges to `[0, max_char]`.
	pub fn clamp(&mut self, max_char: CharIdx) {
		for range in &mut self.ranges {
			*range = range.clamp(max_char);
		}
	}
}

impl Default for Selection {
	fn default() -> Self {
		Self::point(0)
	}
}

impl From<Range> for Selection {
	fn from(range: Range) -> Self {
		Self {
			ranges: smallvec![range],
			primary_index: 0,
		}
	}
}
