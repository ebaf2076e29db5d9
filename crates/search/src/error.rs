use thiserror::Error;

/// Failure preparing a search.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
	#[error("invalid search pattern `{pattern}`: {source}")]
	InvalidRegex {
		pattern: String,
		#[source]
		source: regex::Error,
	},
	#[error("empty search text")]
	Empty,
}
