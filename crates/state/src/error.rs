use thiserror::Error;

/// Errors returned by [`StateStore`](crate::StateStore) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
	/// The state actor has shut down; no further mutations are accepted.
	#[error("state store is closed")]
	Closed,

	/// The key may only change through [`State::set_prefix`](crate::State::set_prefix).
	#[error("`{0}` is reserved and can only change through set_prefix")]
	ReservedKey(String),
}
