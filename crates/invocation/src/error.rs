use thiserror::Error;

use crate::binding::BindingId;

/// Failure evaluating an expression embedded in a binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
	/// The expression referenced a name the scope does not define.
	#[error("unknown name `{name}` in `{expr}`")]
	Unknown { expr: String, name: String },
	/// The expression could not be parsed.
	#[error("cannot parse `{expr}`: {message}")]
	Syntax { expr: String, message: String },
	/// The expression evaluated to a value of the wrong type.
	#[error("`{expr}` evaluated to {found}, expected {expected}")]
	Type {
		expr: String,
		expected: &'static str,
		found: String,
	},
}

/// Failure resolving a command out of the binding store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
	#[error("unknown binding {0}")]
	UnknownBinding(BindingId),
	#[error("binding {id} has no command at index {index}")]
	NoCommand { id: BindingId, index: usize },
	#[error("argument `{arg}` of binding {id}: {source}")]
	Eval {
		id: BindingId,
		arg: String,
		#[source]
		source: EvalError,
	},
}
