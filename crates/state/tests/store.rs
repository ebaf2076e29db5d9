//! Behavior of the state stream: ordering, listener firing, resolve broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keyseq_state::{ContextSink, SetOptions, State, StateError, StateStore, Value, keys};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;

#[derive(Default)]
struct RecordingSink {
	published: Mutex<Vec<(String, Value)>>,
}

impl ContextSink for RecordingSink {
	fn set_context(&self, key: &str, value: &Value) {
		self.published.lock().push((key.to_string(), value.clone()));
	}
}

fn store() -> (StateStore, Arc<RecordingSink>) {
	let sink = Arc::new(RecordingSink::default());
	let store = StateStore::spawn(State::standard("normal"), sink.clone());
	(store, sink)
}

#[tokio::test]
async fn listeners_never_fire_for_unchanged_values() {
	let (store, _) = store();
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&calls);
	let _sub = store.on_set(keys::MODE, move |_| {
		seen.fetch_add(1, Ordering::SeqCst);
	});

	store.set(keys::MODE, "normal", SetOptions::default()).await.unwrap();
	assert_eq!(calls.load(Ordering::SeqCst), 0);

	store.set(keys::MODE, "insert", SetOptions::default()).await.unwrap();
	store.set(keys::MODE, "insert", SetOptions::default()).await.unwrap();
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listener_sees_old_and_new_values() {
	let (store, _) = store();
	let log = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&log);
	let _sub = store.on_set(keys::MODE, move |ev| {
		sink.lock().push((ev.old.cloned(), ev.new.clone(), ev.snapshot.mode().to_string()));
	});

	store.set(keys::MODE, "insert", SetOptions::default()).await.unwrap();
	assert_eq!(*log.lock(), vec![(Some(json!("normal")), json!("insert"), "insert".to_string())]);
}

#[tokio::test]
async fn concurrent_submissions_apply_atomically() {
	let (store, _) = store();
	let mut tasks = Vec::new();
	for digit in 1..=9u64 {
		let store = store.clone();
		tasks.push(tokio::spawn(async move {
			store
				.update(keys::COUNT, move |v| json!(v.and_then(Value::as_u64).unwrap_or(0) * 10 + digit))
				.await
				.unwrap()
		}));
	}
	for task in tasks {
		task.await.unwrap();
	}
	let snap = store.snapshot().await.unwrap();
	let mut digits: Vec<char> = snap.count().to_string().chars().collect();
	digits.sort_unstable();
	assert_eq!(digits.into_iter().collect::<String>(), "123456789");
	assert_eq!(snap.version(), 9);
}

#[tokio::test]
async fn reset_notifies_only_changed_entries() {
	let (store, _) = store();
	store.set(keys::COUNT, 4, SetOptions::default()).await.unwrap();

	let fired = Arc::new(Mutex::new(Vec::new()));
	let mut subs = Vec::new();
	for key in [keys::COUNT, keys::PREFIX, keys::PREFIX_CODE, keys::MODE] {
		let fired = Arc::clone(&fired);
		subs.push(store.on_set(key, move |ev| fired.lock().push(ev.key.to_string())));
	}

	let snap = store.reset().await.unwrap();
	assert_eq!(snap.count(), 0);
	assert_eq!(*fired.lock(), vec![keys::COUNT.to_string()]);
}

#[tokio::test]
async fn prefix_changes_only_through_set_prefix() {
	let (store, _) = store();
	let err = store.set(keys::PREFIX_CODE, 3, SetOptions::default()).await.unwrap_err();
	assert_eq!(err, StateError::ReservedKey(keys::PREFIX_CODE.to_string()));

	let snap = store.set_prefix(3, "g").await.unwrap();
	assert_eq!((snap.prefix_code(), snap.prefix()), (3, "g"));

	let snap = store.reset().await.unwrap();
	assert_eq!((snap.prefix_code(), snap.prefix()), (0, ""));
}

#[tokio::test]
async fn resolve_runs_named_listeners_and_publishes_public_values() {
	let (store, sink) = store();
	let hits = Arc::new(Mutex::new(Vec::new()));

	let first = Arc::clone(&hits);
	store.on_resolve("palette", move |_| first.lock().push("first"));
	let second = Arc::clone(&hits);
	store.on_resolve("palette", move |_| second.lock().push("second"));

	store.set("hidden", true, SetOptions::default()).await.unwrap();
	store.resolve().await.unwrap();

	assert_eq!(*hits.lock(), vec!["second"]);
	let keys: Vec<String> = sink.published.lock().iter().map(|(k, _)| k.clone()).collect();
	assert_eq!(keys, ["mode", "prefixCode", "count", "record"]);
}

#[tokio::test]
async fn dropped_subscription_stops_listening() {
	let (store, _) = store();
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&calls);
	let sub = store.on_set(keys::RECORD, move |_| {
		seen.fetch_add(1, Ordering::SeqCst);
	});
	store.set(keys::RECORD, true, SetOptions::default()).await.unwrap();
	sub.unsubscribe();
	store.set(keys::RECORD, false, SetOptions::default()).await.unwrap();
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn current_tracks_latest_applied_snapshot() {
	let (store, _) = store();
	store.set(keys::MODE, "visual", SetOptions::default()).await.unwrap();
	assert_eq!(store.current().mode(), "visual");
}

#[tokio::test]
async fn submitted_transform_runs_before_later_ones() {
	let (store, _) = store();
	store
		.submit(|s| {
			let _ = s.set(keys::MODE, "insert", SetOptions::default());
		})
		.unwrap();
	let snap = store.snapshot().await.unwrap();
	assert_eq!(snap.mode(), "insert");
}

#[tokio::test]
async fn closed_store_rejects_mutations() {
	let (store, _) = store();
	store.close();
	let err = store.set(keys::MODE, "insert", SetOptions::default()).await.unwrap_err();
	assert_eq!(err, StateError::Closed);
}
