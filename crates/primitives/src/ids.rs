use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one open text editor inside the host.
///
/// Search state and decorations are scoped per editor; the host hands out
/// ids and reports when an editor closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "editor#{}", self.0)
	}
}
