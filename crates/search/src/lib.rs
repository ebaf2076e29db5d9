//! Text search over a rope, one line at a time.
//!
//! [`MatchIter`] lazily walks matches from a position in either direction,
//! optionally wrapping around the document. [`navigate`] applies a search to
//! every cursor independently and places each one according to a
//! [`Placement`]. [`SearchStates`] keeps one [`SearchState`] per editor and
//! register so independent searches never clobber each other.

mod args;
mod error;
mod matches;
mod navigate;
mod pattern;
mod placement;
mod states;

pub use args::SearchArgs;
pub use error::SearchError;
pub use matches::{MatchIter, find_match};
pub use navigate::{Landing, Navigation, navigate, visible_matches};
pub use pattern::Pattern;
pub use placement::{Boundary, Placement};
pub use states::{SearchKey, SearchState, SearchStates};
