use keyseq_invocation::EvalError;
use thiserror::Error;

/// Failure selecting from history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
	/// Neither `index` nor a `from`/`to` pair was given.
	#[error("history selection needs `index` or both `from` and `to`")]
	MissingSelector,
	/// An expression never matched.
	#[error("no history entry matches `{expr}`")]
	Unresolved { expr: String },
	/// An expression produced an index outside the log.
	#[error("history index {index} is out of range (length {len})")]
	OutOfRange { index: String, len: usize },
	/// `from` resolved after `to`.
	#[error("history range {from}..={to} is inverted")]
	Inverted { from: usize, to: usize },
	#[error(transparent)]
	Eval(#[from] EvalError),
	#[error("cannot expose history entry to expressions: {0}")]
	Encode(String),
}
