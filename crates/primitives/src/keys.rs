//! A prefix is the space-delimited list of keys typed so far, e.g. `"g"` or `"ctrl+k g"`.

/// Appends `key` to `prefix`, inserting the separator only when needed.
pub fn join_keys(prefix: &str, key: &str) -> String {
	match (prefix.is_empty(), key.is_empty()) {
		(true, _) => key.to_string(),
		(false, true) => prefix.to_string(),
		(false, false) => format!("{prefix} {key}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_skips_separator_for_empty_parts() {
		assert_eq!(join_keys("", "g"), "g");
		assert_eq!(join_keys("g", ""), "g");
		assert_eq!(join_keys("ctrl+k", "g"), "ctrl+k g");
	}
}
