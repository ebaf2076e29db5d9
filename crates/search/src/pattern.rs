use keyseq_primitives::CharIdx;
use regex::{Regex, RegexBuilder};

use crate::error::SearchError;

/// A compiled search target.
#[derive(Debug, Clone)]
pub enum Pattern {
	/// Regular expression, matched per line.
	Regex(Regex),
	/// Literal text; `needle` is already lower-cased when not case-sensitive.
	Literal { needle: Vec<char>, case_sensitive: bool },
}

impl Pattern {
	/// Compiles `text`. Regexes are case-insensitive unless `case_sensitive` is set.
	pub fn new(text: &str, regex: bool, case_sensitive: bool) -> Result<Self, SearchError> {
		if text.is_empty() {
			return Err(SearchError::Empty);
		}
		if regex {
			let re = RegexBuilder::new(text)
				.case_insensitive(!case_sensitive)
				.build()
				.map_err(|source| SearchError::InvalidRegex {
					pattern: text.to_string(),
					source,
				})?;
			return Ok(Self::Regex(re));
		}
		Ok(Self::Literal {
			needle: fold(text, case_sensitive).chars,
			case_sensitive,
		})
	}

	/// Non-empty matches in `line` starting at or after char `from`, as char offsets.
	///
	/// Scanning starts at `from`, so a match beginning there is found even if
	/// an earlier match would have overlapped it.
	pub fn find_in_line(&self, line: &str, from: CharIdx) -> Vec<(CharIdx, CharIdx)> {
		match self {
			Self::Regex(re) => find_regex(re, line, from),
			Self::Literal { needle, case_sensitive } => find_literal(needle, *case_sensitive, line, from),
		}
	}
}

fn find_regex(re: &Regex, line: &str, from: CharIdx) -> Vec<(CharIdx, CharIdx)> {
	let mut found = Vec::new();
	let mut pos = char_to_byte_offset(line, from);
	while pos <= line.len() {
		let Some(m) = re.find_at(line, pos) else { break };
		if m.is_empty() {
			pos = next_boundary(line, m.end());
			continue;
		}
		found.push((byte_to_char_offset(line, m.start()), byte_to_char_offset(line, m.end())));
		pos = m.end();
	}
	found
}

fn find_literal(needle: &[char], case_sensitive: bool, line: &str, from: CharIdx) -> Vec<(CharIdx, CharIdx)> {
	let folded = fold(line, case_sensitive);
	let n = needle.len();
	let mut found = Vec::new();
	if n == 0 || folded.chars.len() < n {
		return found;
	}
	let mut i = folded.origin.partition_point(|&o| o < from);
	while i + n <= folded.chars.len() {
		if folded.chars[i..i + n] == *needle {
			found.push((folded.origin[i], folded.origin[i + n - 1] + 1));
			i += n;
		} else {
			i += 1;
		}
	}
	found
}

/// Characters of a line, lower-cased unless case-sensitive, each mapped back
/// to the char offset it came from.
struct Folded {
	chars: Vec<char>,
	origin: Vec<CharIdx>,
}

fn fold(text: &str, case_sensitive: bool) -> Folded {
	let mut chars = Vec::with_capacity(text.len());
	let mut origin = Vec::with_capacity(text.len());
	for (idx, ch) in text.chars().enumerate() {
		if case_sensitive {
			chars.push(ch);
			origin.push(idx);
			continue;
		}
		for lower in ch.to_lowercase() {
			chars.push(lower);
			origin.push(idx);
		}
	}
	Folded { chars, origin }
}

/// Converts a byte offset to a character offset.
fn byte_to_char_offset(s: &str, byte_offset: usize) -> CharIdx {
	s[..byte_offset].chars().count()
}

/// Converts a character offset to a byte offset.
fn char_to_byte_offset(s: &str, char_offset: CharIdx) -> usize {
	s.char_indices().nth(char_offset).map(|(i, _)| i).unwrap_or(s.len())
}

fn next_boundary(s: &str, byte: usize) -> usize {
	s[byte..].chars().next().map_or(s.len() + 1, |c| byte + c.len_utf8())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("aaa", false, false, "aaa bbb aaa", 0, vec![(0, 3), (8, 11)])]
	#[case("aaa", false, false, "aaa bbb aaa", 1, vec![(8, 11)])]
	#[case("AB", false, false, "xaby Ab", 0, vec![(1, 3), (5, 7)])]
	#[case("AB", false, true, "xaby AB", 0, vec![(5, 7)])]
	#[case("a.c", true, false, "ABC a.c", 0, vec![(0, 3), (4, 7)])]
	#[case("a.c", true, true, "ABC a.c", 0, vec![(4, 7)])]
	#[case("aa", false, true, "aaaa", 1, vec![(1, 3)])]
	fn finds_matches_in_a_line(
		#[case] text: &str,
		#[case] regex: bool,
		#[case] case_sensitive: bool,
		#[case] line: &str,
		#[case] from: CharIdx,
		#[case] expected: Vec<(CharIdx, CharIdx)>,
	) {
		let pattern = Pattern::new(text, regex, case_sensitive).unwrap();
		assert_eq!(pattern.find_in_line(line, from), expected);
	}

	#[test]
	fn literal_offsets_survive_expanding_lowercase() {
		// 'İ' lower-cases to two chars; offsets must stay in original coordinates.
		let pattern = Pattern::new("x", false, false).unwrap();
		assert_eq!(pattern.find_in_line("İx", 0), vec![(1, 2)]);
	}

	#[test]
	fn regex_offsets_are_chars_not_bytes() {
		let pattern = Pattern::new("b+", true, false).unwrap();
		assert_eq!(pattern.find_in_line("äöbb", 0), vec![(2, 4)]);
	}

	#[test]
	fn empty_regex_matches_are_skipped() {
		let pattern = Pattern::new("x*", true, false).unwrap();
		assert_eq!(pattern.find_in_line("abxx", 0), vec![(2, 4)]);
	}

	#[test]
	fn rejects_empty_and_invalid_patterns() {
		assert!(matches!(Pattern::new("", false, false), Err(SearchError::Empty)));
		assert!(matches!(Pattern::new("(", true, false), Err(SearchError::InvalidRegex { .. })));
	}
}
