use keyseq_primitives::{CharIdx, Direction, Range};
use serde::{Deserialize, Serialize};

/// Which edge of a match the cursor lands on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Boundary {
	/// The edge nearer to where the search came from.
	Closer,
	/// The edge further from where the search came from.
	Farther,
	/// The match start, whatever the direction.
	#[default]
	Start,
	/// The match end, whatever the direction.
	End,
}

/// Where the cursor lands relative to a match.
///
/// For [`Boundary::Closer`] and [`Boundary::Farther`] a positive `step`
/// moves further along the search direction; for [`Boundary::Start`] and
/// [`Boundary::End`] it moves toward the end of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Placement {
	pub boundary: Boundary,
	pub step: i64,
}

impl Placement {
	/// Creates a placement.
	pub fn new(boundary: Boundary, step: i64) -> Self {
		Self { boundary, step }
	}

	/// Cursor position for match `m` (anchor = start, head = end), clamped to `[0, len]`.
	pub fn position(&self, m: &Range, direction: Direction, len: CharIdx) -> CharIdx {
		let (start, end) = (m.min(), m.max());
		let (base, sign) = match (self.boundary, direction) {
			(Boundary::Start, _) => (start, 1),
			(Boundary::End, _) => (end, 1),
			(Boundary::Closer, Direction::Forward) => (start, 1),
			(Boundary::Closer, Direction::Backward) => (end, -1),
			(Boundary::Farther, Direction::Forward) => (end, 1),
			(Boundary::Farther, Direction::Backward) => (start, -1),
		};
		let base = i64::try_from(base).unwrap_or(i64::MAX);
		let pos = base.saturating_add(self.step.saturating_mul(sign)).max(0);
		usize::try_from(pos).map_or(len, |p| p.min(len))
	}
}
