use std::fmt;

use serde::{Deserialize, Serialize};

/// Cursor rendering style requested from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorShape {
	/// Thin vertical bar, the usual insert cursor.
	#[default]
	Line,
	/// Full cell block.
	Block,
	/// Underscore beneath the cell.
	Underline,
	/// Thin bar drawn with reduced weight.
	LineThin,
	/// Hollow block outline.
	BlockOutline,
	/// Thin underline.
	UnderlineThin,
}

impl fmt::Display for CursorShape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Line => "line",
			Self::Block => "block",
			Self::Underline => "underline",
			Self::LineThin => "lineThin",
			Self::BlockOutline => "blockOutline",
			Self::UnderlineThin => "underlineThin",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serde_names_are_camel_case() {
		let shape: CursorShape = serde_json::from_str("\"blockOutline\"").unwrap();
		assert_eq!(shape, CursorShape::BlockOutline);
		assert_eq!(serde_json::to_string(&CursorShape::LineThin).unwrap(), "\"lineThin\"");
	}

	#[test]
	fn display_matches_serde_name() {
		assert_eq!(CursorShape::UnderlineThin.to_string(), "underlineThin");
		assert_eq!(CursorShape::default().to_string(), "line");
	}
}
