//! Well-known state keys.

/// Current mode name.
pub const MODE: &str = "mode";
/// Space-delimited keys typed so far in the current sequence.
pub const PREFIX: &str = "prefix";
/// Numeric id of the current prefix, as assigned by the binding table.
pub const PREFIX_CODE: &str = "prefixCode";
/// Pending numeric count.
pub const COUNT: &str = "count";
/// Text gathered by the most recent capture.
pub const CAPTURED: &str = "captured";
/// Whether text edits are being recorded into history.
pub const RECORD: &str = "record";

/// Returns true for keys that only [`State::set_prefix`](crate::State::set_prefix) may write.
pub fn is_reserved(key: &str) -> bool {
	key == PREFIX || key == PREFIX_CODE
}
