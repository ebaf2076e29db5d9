//! Key-sequence dispatch.
//!
//! A [`Dispatcher`] turns key presses into binding runs. Each press carries
//! the `(prefix_code, mode)` it was typed under; a press whose premise no
//! longer holds when its turn comes is dropped as stale. Dispatch cycles are
//! serialized by a [`DispatchGate`], which interactive commands release
//! while they wait for input through the [`CaptureController`].
//!
//! Builtin commands live in a [`CommandRegistry`]; every other command name
//! is forwarded to the host.

mod capture;
mod commands;
mod dispatch;
mod error;
mod event;
mod gate;

pub use capture::{CaptureController, Captured};
pub use commands::{
	CAPTURE_KEYS, Command, CommandCx, CommandRegistry, INSERT_CHAR, NEXT_MATCH, PREFIX, PREVIOUS_MATCH,
	PUSH_HISTORY_TO_STACK, RECORD, REPLACE_CHAR, REPLAY_FROM_HISTORY, REPLAY_FROM_STACK, SEARCH, SET_FLAG,
	SET_MODE, UPDATE_COUNT,
};
pub use dispatch::Dispatcher;
pub use error::CommandError;
pub use event::{DispatchOutcome, EngineEvent, Expected, KeyPress};
pub use gate::{DispatchGate, GateGuard};
