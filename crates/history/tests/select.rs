//! Selecting history ranges with expressions.

use keyseq_history::{History, HistoryEntry, HistoryError, Selector};
use keyseq_invocation::{Binding, CommandRef, EvalError, Evaluator, PathEvaluator, Scope};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn history(keys: &[&str]) -> History {
	let mut history = History::new();
	for key in keys {
		let binding = Binding::new(*key, *key, "normal", 0, vec![CommandRef::bare(*key)]).with_tag(format!("tag-{key}"));
		history.store_binding(HistoryEntry::from_binding(&binding, binding.commands.clone(), 0), 100);
	}
	history
}

/// `entry.key == "<k>"`, written as a closure since the path evaluator has no operators.
fn key_is(expected: &'static str) -> impl Fn(&str, &Scope) -> Result<Value, EvalError> + Send + Sync {
	move |expr: &str, scope: &Scope| {
		if expr == "match" {
			Ok(json!(scope.get("entry.key") == Some(&json!(expected))))
		} else {
			PathEvaluator.evaluate(expr, scope)
		}
	}
}

fn keys(entries: &[HistoryEntry]) -> Vec<&str> {
	entries.iter().map(|e| e.key.as_str()).collect()
}

#[test]
fn truthy_expressions_pick_the_newest_match() {
	let history = history(&["a", "b", "a", "c"]);
	let eval = key_is("a");
	let picked = history.select(&Selector::Index("match".into()), &eval, &Scope::new()).unwrap();
	assert_eq!(keys(&picked), ["a"]);

	let range = Selector::Range {
		from: "match".into(),
		to: "true".into(),
	};
	let picked = history.select(&range, &eval, &Scope::new()).unwrap();
	assert_eq!(keys(&picked), ["a", "c"]);
}

#[test]
fn from_scans_backward_from_to() {
	let history = history(&["x", "b", "x", "c", "b"]);
	let eval = |expr: &str, scope: &Scope| -> Result<Value, EvalError> {
		let key = scope.get("entry.key").cloned().unwrap_or(Value::Null);
		Ok(json!(key == json!(expr)))
	};
	let range = Selector::Range {
		from: "x".into(),
		to: "c".into(),
	};
	let picked = history.select(&range, &eval, &Scope::new()).unwrap();
	assert_eq!(keys(&picked), ["x", "c"]);
}

#[rstest]
#[case("0", "2", vec!["a", "b", "c"])]
#[case("1", "1", vec!["b"])]
fn numeric_results_are_indices(#[case] from: &str, #[case] to: &str, #[case] expected: Vec<&str>) {
	let history = history(&["a", "b", "c"]);
	let range = Selector::Range {
		from: from.into(),
		to: to.into(),
	};
	let picked = history.select(&range, &PathEvaluator, &Scope::new()).unwrap();
	assert_eq!(keys(&picked), expected);
}

#[test]
fn both_endpoints_must_resolve() {
	let history = history(&["a", "b"]);
	let range = Selector::Range {
		from: "false".into(),
		to: "true".into(),
	};
	assert_eq!(
		history.select(&range, &PathEvaluator, &Scope::new()),
		Err(HistoryError::Unresolved { expr: "false".into() })
	);
}

#[test]
fn bad_indices_and_empty_logs_are_errors() {
	let history = history(&["a"]);
	assert!(matches!(
		history.select(&Selector::Index("5".into()), &PathEvaluator, &Scope::new()),
		Err(HistoryError::OutOfRange { len: 1, .. })
	));
	assert!(matches!(
		History::new().select(&Selector::Index("true".into()), &PathEvaluator, &Scope::new()),
		Err(HistoryError::Unresolved { .. })
	));
	assert!(matches!(
		history.select(&Selector::Index("nope".into()), &PathEvaluator, &Scope::new()),
		Err(HistoryError::Eval(EvalError::Unknown { .. }))
	));
}

#[test]
fn from_parts_prefers_index() {
	assert_eq!(
		Selector::from_parts(Some("a".into()), Some("b".into()), Some("i".into())),
		Ok(Selector::Index("i".into()))
	);
	assert_eq!(Selector::from_parts(Some("a".into()), None, None), Err(HistoryError::MissingSelector));
}

#[test]
fn trimming_keeps_the_newest_in_order() {
	let mut history = History::new();
	let max = 4;
	for i in 0..max + 3 {
		let binding = Binding::new(format!("b{i}"), format!("k{i}"), "normal", 0, vec![]);
		history.store_binding(HistoryEntry::from_binding(&binding, vec![], 0), max);
	}
	let remaining: Vec<String> = history.iter().map(|e| e.key.clone()).collect();
	assert_eq!(remaining, ["k3", "k4", "k5", "k6"]);
}
