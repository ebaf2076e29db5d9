//! Canonical binding and command types for key-sequence dispatch.
//!
//! Every key press resolves to a [`Binding`] through a [`BindingStore`]; the
//! dispatcher then runs the binding's [`CommandRef`]s, each of which answers
//! with a [`Resolved`] outcome. Expressions embedded in bindings are evaluated
//! by an injected [`Evaluator`] against a [`Scope`] built from engine state.

mod binding;
mod command;
mod error;
mod eval;
mod memory;
mod store;

pub use binding::{Binding, BindingId};
pub use command::{CommandRef, NOOP, Outcome, Resolved};
pub use error::{EvalError, ResolveError};
pub use eval::{Evaluator, PathEvaluator, Scope, truthy};
pub use memory::MemoryBindingStore;
pub use store::{BindingStore, ModeInfo, WhenNoBinding};
