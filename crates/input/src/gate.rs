use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

#[derive(Debug, Default)]
struct GateState {
	held: Option<u64>,
	next_generation: u64,
}

/// Serializes dispatch cycles.
///
/// Only one guard is live at a time. A watchdog force-releases a guard held
/// longer than the timeout; it does not stop the holder, it only lets the
/// next dispatch in. Each acquisition has its own generation, so a late
/// release never frees a newer holder.
#[derive(Debug, Clone)]
pub struct DispatchGate {
	state: Arc<Mutex<GateState>>,
	notify: Arc<Notify>,
	timeout: Duration,
}

impl DispatchGate {
	pub fn new(timeout: Duration) -> Self {
		Self {
			state: Arc::new(Mutex::new(GateState::default())),
			notify: Arc::new(Notify::new()),
			timeout,
		}
	}

	/// Waits for the gate and returns a guard releasing it on drop.
	pub async fn acquire(&self) -> GateGuard {
		let generation = loop {
			let notified = self.notify.notified();
			{
				let mut state = self.state.lock();
				if state.held.is_none() {
					let generation = state.next_generation;
					state.next_generation += 1;
					state.held = Some(generation);
					break generation;
				}
			}
			notified.await;
		};
		trace!(generation, "dispatch gate acquired");
		let watchdog = {
			let gate = self.clone();
			tokio::spawn(async move {
				tokio::time::sleep(gate.timeout).await;
				if gate.release(generation) {
					warn!(generation, timeout_ms = gate.timeout.as_millis() as u64, "dispatch gate force-released");
				}
			})
		};
		GateGuard {
			gate: self.clone(),
			generation,
			watchdog: Some(watchdog),
		}
	}

	/// Whether a guard currently holds the gate.
	pub fn is_held(&self) -> bool {
		self.state.lock().held.is_some()
	}

	fn release(&self, generation: u64) -> bool {
		let released = {
			let mut state = self.state.lock();
			if state.held == Some(generation) {
				state.held = None;
				true
			} else {
				false
			}
		};
		if released {
			self.notify.notify_one();
		}
		released
	}
}

/// Holds the dispatch gate until released or dropped.
#[must_use = "dropping a GateGuard releases the gate immediately"]
pub struct GateGuard {
	gate: DispatchGate,
	generation: u64,
	watchdog: Option<JoinHandle<()>>,
}

impl GateGuard {
	/// Releases the gate early; later calls and the drop do nothing.
	pub fn release(&mut self) {
		if let Some(watchdog) = self.watchdog.take() {
			watchdog.abort();
			if self.gate.release(self.generation) {
				trace!(generation = self.generation, "dispatch gate released");
			}
		}
	}

	/// Whether this guard still holds the gate.
	pub fn is_held(&self) -> bool {
		self.watchdog.is_some() && self.gate.state.lock().held == Some(self.generation)
	}
}

impl Drop for GateGuard {
	fn drop(&mut self) {
		self.release();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn second_acquire_waits_for_release() {
		let gate = DispatchGate::new(Duration::from_secs(60));
		let mut first = gate.acquire().await;

		let waiter = {
			let gate = gate.clone();
			tokio::spawn(async move {
				let _guard = gate.acquire().await;
			})
		};
		tokio::task::yield_now().await;
		assert!(!waiter.is_finished());

		first.release();
		assert!(!first.is_held());
		tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
		assert!(!gate.is_held());
	}

	#[tokio::test(start_paused = true)]
	async fn watchdog_frees_a_stuck_holder() {
		let gate = DispatchGate::new(Duration::from_millis(1500));
		let stuck = gate.acquire().await;

		let started = tokio::time::Instant::now();
		let next = gate.acquire().await;
		assert!(started.elapsed() >= Duration::from_millis(1500));
		assert!(!stuck.is_held());
		assert!(next.is_held());

		drop(stuck);
		assert!(next.is_held());
	}
}
