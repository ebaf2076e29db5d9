//! Routing raw keystrokes to a single pending capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keyseq_state::{SetOptions, StateError, StateStore, Subscription, Value, keys};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Text gathered by one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
	/// Accumulated text.
	pub text: String,
	/// `true` when the update callback asked to stop; `false` when the
	/// capture was ended from outside (mode change, newer capture, shutdown).
	pub stopped: bool,
	/// Characters that were already typed when the capture stopped.
	pub rest: String,
}

struct Slot {
	id: u64,
	tx: mpsc::UnboundedSender<char>,
	/// Mode to restore when this capture ends.
	restore: String,
}

#[derive(Default)]
struct Inner {
	slot: Mutex<Option<Slot>>,
	next_id: AtomicU64,
}

/// The one shared "next character goes to the capture handler" subscription.
///
/// Starting a capture replaces any earlier one, which then ends with the text
/// it had. A capture also ends when the mode leaves the capture mode.
#[derive(Clone)]
pub struct CaptureController {
	inner: Arc<Inner>,
	capture_mode: Arc<str>,
}

impl CaptureController {
	pub fn new(capture_mode: &str) -> Self {
		Self {
			inner: Arc::new(Inner::default()),
			capture_mode: Arc::from(capture_mode),
		}
	}

	/// Ends the active capture whenever `mode` changes to anything but the capture mode.
	pub fn watch_mode(&self, state: &StateStore) -> Subscription {
		let controller = self.clone();
		state.on_set(keys::MODE, move |event| {
			if event.new.as_str() != Some(&*controller.capture_mode) && controller.cancel() {
				debug!(mode = %event.new, "capture ended by mode change");
			}
		})
	}

	/// Name of the capture mode.
	pub fn capture_mode(&self) -> &str {
		&self.capture_mode
	}

	/// Whether a capture is waiting for keys.
	pub fn is_active(&self) -> bool {
		self.inner.slot.lock().is_some()
	}

	/// Hands `ch` to the active capture. Returns `false` when none is active.
	pub fn type_char(&self, ch: char) -> bool {
		match &*self.inner.slot.lock() {
			Some(slot) => slot.tx.send(ch).is_ok(),
			None => false,
		}
	}

	/// Ends the active capture, if any, without restoring the mode.
	pub fn cancel(&self) -> bool {
		self.inner.slot.lock().take().is_some()
	}

	/// Ends the active capture, if any, and queues the restore of its pre-capture mode.
	pub fn abort(&self, state: &StateStore) -> bool {
		let taken = self.inner.slot.lock().take();
		match taken {
			Some(slot) => {
				debug!(id = slot.id, "capture aborted");
				self.queue_restore(state, slot.restore);
				true
			}
			None => false,
		}
	}

	/// Switches to the capture mode and feeds every typed character to `on_update`.
	///
	/// `on_update(text, ch)` returns the new accumulated text and whether to
	/// stop. The accumulated text is mirrored into the `captured` state entry.
	/// When the capture ends the pre-capture mode is restored, unless the mode
	/// already moved elsewhere. This also holds when `on_update` panics or the
	/// returned future is dropped early.
	pub async fn capture_keys<F>(&self, state: &StateStore, mut on_update: F) -> Result<Captured, StateError>
	where
		F: FnMut(&str, char) -> (String, bool) + Send,
	{
		let (tx, mut rx) = mpsc::unbounded_channel();
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let capture_mode = self.capture_mode.to_string();
		let current = state.current();
		{
			let mut slot = self.inner.slot.lock();
			let restore = match slot.take() {
				Some(previous) => previous.restore,
				None => current.mode().to_string(),
			};
			*slot = Some(Slot { id, tx, restore });
		}
		let _guard = CaptureGuard {
			controller: self,
			state,
			id,
		};
		trace!(id, "capture started");

		state
			.transform(move |s| {
				let _ = s.set(keys::MODE, capture_mode, SetOptions::default());
				let _ = s.set(keys::CAPTURED, "", SetOptions::default());
			})
			.await?;

		let mut text = String::new();
		let mut stopped = false;
		while let Some(ch) = rx.recv().await {
			let (next, stop) = on_update(&text, ch);
			text = next;
			state.set(keys::CAPTURED, text.as_str(), SetOptions::default()).await?;
			if stop {
				stopped = true;
				break;
			}
		}

		// Taking the slot drops the sender, so `rx` now holds everything typed past the stop.
		let restore = self.finish(id);
		let mut rest = String::new();
		while let Ok(ch) = rx.try_recv() {
			rest.push(ch);
		}
		if let Some(restore) = restore {
			self.queue_restore(state, restore);
			state.snapshot().await?;
		}
		debug!(id, stopped, len = text.chars().count(), rest = rest.chars().count(), "capture finished");
		Ok(Captured { text, stopped, rest })
	}

	/// Clears the slot if it still belongs to capture `id`, returning its restore mode.
	fn finish(&self, id: u64) -> Option<String> {
		let mut slot = self.inner.slot.lock();
		match slot.as_ref() {
			Some(current) if current.id == id => slot.take().map(|s| s.restore),
			_ => None,
		}
	}

	/// Switches back to `restore` if the mode is still the capture mode.
	fn queue_restore(&self, state: &StateStore, restore: String) {
		let capture_mode = self.capture_mode.to_string();
		let queued = state.submit(move |s| {
			if s.get(keys::MODE).and_then(Value::as_str) == Some(capture_mode.as_str()) {
				let _ = s.set(keys::MODE, restore, SetOptions::default());
			}
		});
		if queued.is_err() {
			trace!("state closed before capture mode was restored");
		}
	}
}

/// Releases capture `id` when its future ends on any path other than the normal return.
struct CaptureGuard<'a> {
	controller: &'a CaptureController,
	state: &'a StateStore,
	id: u64,
}

impl Drop for CaptureGuard<'_> {
	fn drop(&mut self) {
		if let Some(restore) = self.controller.finish(self.id) {
			debug!(id = self.id, "capture dropped before it finished");
			self.controller.queue_restore(self.state, restore);
		}
	}
}

impl std::fmt::Debug for CaptureController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CaptureController")
			.field("capture_mode", &self.capture_mode)
			.field("active", &self.is_active())
			.finish()
	}
}
