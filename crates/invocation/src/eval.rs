//! The expression contract.
//!
//! The engine never parses a binding expression itself; it builds a [`Scope`]
//! from the current state and hands both to an injected [`Evaluator`].

use serde_json::{Map, Value};

use crate::error::EvalError;

/// Named values an expression is evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
	values: Map<String, Value>,
}

impl Scope {
	/// Creates an empty scope.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a scope over an existing map.
	pub fn from_map(values: Map<String, Value>) -> Self {
		Self { values }
	}

	/// Adds or replaces `key`.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.insert(key, value);
		self
	}

	/// Adds or replaces `key` in place.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.values.insert(key.into(), value.into());
	}

	/// Looks up a dotted path such as `entry.commands.0.command`.
	pub fn get(&self, path: &str) -> Option<&Value> {
		let mut parts = path.split('.');
		let mut current = self.values.get(parts.next()?)?;
		for part in parts {
			current = match current {
				Value::Object(map) => map.get(part)?,
				Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
				_ => return None,
			};
		}
		Some(current)
	}

	/// The underlying map.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.values
	}
}

/// Evaluates binding expressions.
///
/// Implementations must be pure with respect to engine state: everything an
/// expression may read is in the scope.
pub trait Evaluator: Send + Sync {
	/// Evaluates `expr` against `scope`.
	fn evaluate(&self, expr: &str, scope: &Scope) -> Result<Value, EvalError>;
}

impl<F> Evaluator for F
where
	F: Fn(&str, &Scope) -> Result<Value, EvalError> + Send + Sync,
{
	fn evaluate(&self, expr: &str, scope: &Scope) -> Result<Value, EvalError> {
		self(expr, scope)
	}
}

/// A minimal evaluator: JSON literals, dotted scope paths, and `!` negation.
///
/// Enough for counts (`count`), flags (`!record`) and history selection
/// (`entry.tags.0`); embedders with a real expression language inject their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl Evaluator for PathEvaluator {
	fn evaluate(&self, expr: &str, scope: &Scope) -> Result<Value, EvalError> {
		let trimmed = expr.trim();
		if let Some(inner) = trimmed.strip_prefix('!') {
			return self.evaluate(inner, scope).map(|v| Value::Bool(!truthy(&v)));
		}
		if trimmed.is_empty() {
			return Err(EvalError::Syntax {
				expr: expr.to_string(),
				message: "empty expression".to_string(),
			});
		}
		if let Ok(literal) = serde_json::from_str::<Value>(trimmed) {
			return Ok(literal);
		}
		if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
			return Err(EvalError::Syntax {
				expr: expr.to_string(),
				message: "expected a literal or a dotted name".to_string(),
			});
		}
		scope.get(trimmed).cloned().ok_or_else(|| EvalError::Unknown {
			expr: expr.to_string(),
			name: trimmed.to_string(),
		})
	}
}

/// JavaScript-style truthiness of a JSON value.
pub fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	fn scope() -> Scope {
		Scope::new()
			.with("count", 3)
			.with("record", false)
			.with("entry", json!({ "tags": ["edit"], "commands": [{ "command": "deleteLeft" }] }))
	}

	#[rstest]
	#[case("count", json!(3))]
	#[case("!record", json!(true))]
	#[case("entry.tags.0", json!("edit"))]
	#[case("entry.commands.0.command", json!("deleteLeft"))]
	#[case("42", json!(42))]
	#[case("\"text\"", json!("text"))]
	fn path_evaluator_reads_literals_and_paths(#[case] expr: &str, #[case] expected: Value) {
		assert_eq!(PathEvaluator.evaluate(expr, &scope()).unwrap(), expected);
	}

	#[test]
	fn unknown_names_are_reported() {
		let err = PathEvaluator.evaluate("missing.path", &scope()).unwrap_err();
		assert_eq!(
			err,
			EvalError::Unknown {
				expr: "missing.path".into(),
				name: "missing.path".into()
			}
		);
		assert!(matches!(PathEvaluator.evaluate("a + b", &scope()), Err(EvalError::Syntax { .. })));
	}

	#[test]
	fn closures_are_evaluators() {
		let eval = |expr: &str, _: &Scope| Ok::<_, EvalError>(json!(expr.len()));
		assert_eq!(eval.evaluate("abc", &Scope::new()).unwrap(), json!(3));
	}

	#[rstest]
	#[case(json!(null), false)]
	#[case(json!(0), false)]
	#[case(json!(""), false)]
	#[case(json!(2), true)]
	#[case(json!([]), true)]
	fn truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(truthy(&value), expected);
	}
}
