use keyseq_invocation::{Evaluator, Scope, truthy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::HistoryError;
use crate::log::History;

/// Expressions picking a contiguous range of history.
///
/// Each expression is evaluated once per entry, newest first, with `index`,
/// `length` and `entry` added to the scope. The first entry for which it is
/// truthy is selected; a numeric result is taken as the index itself. For a
/// range, `to` is resolved first over the whole log and `from` is then
/// resolved scanning backward from `to`, so `from <= to`. Both must resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
	/// A single entry.
	Index(String),
	/// Entries `from..=to`.
	Range { from: String, to: String },
}

impl Selector {
	/// Builds a selector from optional command arguments; `index` wins over `from`/`to`.
	pub fn from_parts(from: Option<String>, to: Option<String>, index: Option<String>) -> Result<Self, HistoryError> {
		match (index, from, to) {
			(Some(index), _, _) => Ok(Self::Index(index)),
			(None, Some(from), Some(to)) => Ok(Self::Range { from, to }),
			_ => Err(HistoryError::MissingSelector),
		}
	}

	pub(crate) fn resolve(
		&self,
		history: &History,
		evaluator: &dyn Evaluator,
		base: &Scope,
	) -> Result<(usize, usize), HistoryError> {
		let newest = history.len().checked_sub(1);
		match self {
			Self::Index(expr) => {
				let index = scan(history, expr, newest, evaluator, base)?;
				Ok((index, index))
			}
			Self::Range { from, to } => {
				let to = scan(history, to, newest, evaluator, base)?;
				let from = scan(history, from, Some(to), evaluator, base)?;
				if from > to {
					return Err(HistoryError::Inverted { from, to });
				}
				Ok((from, to))
			}
		}
	}
}

/// Scans entries `start, start - 1, ..., 0` for the first match of `expr`.
fn scan(
	history: &History,
	expr: &str,
	start: Option<usize>,
	evaluator: &dyn Evaluator,
	base: &Scope,
) -> Result<usize, HistoryError> {
	let unresolved = || HistoryError::Unresolved { expr: expr.to_string() };
	let start = start.ok_or_else(unresolved)?;
	let len = history.len();
	for index in (0..=start).rev() {
		let Some(entry) = history.get(index) else { continue };
		let entry = serde_json::to_value(entry).map_err(|e| HistoryError::Encode(e.to_string()))?;
		let scope = base.clone().with("index", index).with("length", len).with("entry", entry);
		let value = evaluator.evaluate(expr, &scope)?;
		trace!(expr, index, %value, "history selector");
		match value {
			Value::Number(n) => {
				return n
					.as_u64()
					.and_then(|i| usize::try_from(i).ok())
					.filter(|&i| i < len)
					.ok_or_else(|| HistoryError::OutOfRange { index: n.to_string(), len });
			}
			v if truthy(&v) => return Ok(index),
			_ => {}
		}
	}
	Err(unresolved())
}
