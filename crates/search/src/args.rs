use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::pattern::Pattern;
use crate::placement::{Boundary, Placement};

/// Arguments of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SearchArgs {
	/// Search text; captured interactively when absent.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
	/// Treat `text` as a regular expression.
	pub regex: bool,
	pub case_sensitive: bool,
	pub backwards: bool,
	pub wrap_around: bool,
	/// Stop interactive capture after this many characters.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub accept_after: Option<usize>,
	/// Extend each selection from its anchor to the landing position.
	pub select_till_match: bool,
	pub offset: Boundary,
	pub step: i64,
	/// Extra navigations before the reported match.
	pub skip: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub register: Option<String>,
}

impl SearchArgs {
	/// Compiles `text` with these options.
	pub fn pattern(&self, text: &str) -> Result<Pattern, SearchError> {
		Pattern::new(text, self.regex, self.case_sensitive)
	}

	/// Landing placement.
	pub fn placement(&self) -> Placement {
		Placement::new(self.offset, self.step)
	}
}
