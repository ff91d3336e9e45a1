//! The ready flag and its waiters.
//!
//! A single `watch` cell holds the phase. Completion happens only on the
//! `Waiting -> Ready` edge, so a repeated ready signal can never run the
//! completion path twice.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Waiting,
	Ready,
	/// Owner destroyed; waiters give up immediately.
	Closed,
}

pub(super) struct Readiness {
	tx: watch::Sender<Phase>,
}

impl Readiness {
	pub(super) fn new() -> Self {
		let (tx, _rx) = watch::channel(Phase::Waiting);
		Self { tx }
	}

	pub(super) fn is_ready(&self) -> bool {
		*self.tx.borrow() == Phase::Ready
	}

	/// Returns `true` only for the call that performed the transition.
	pub(super) fn mark_ready(&self) -> bool {
		self.tx.send_if_modified(|phase| {
			if *phase == Phase::Waiting {
				*phase = Phase::Ready;
				true
			} else {
				false
			}
		})
	}

	/// Back to waiting, e.g. after the remote context reloaded.
	pub(super) fn reset(&self) {
		self.tx.send_if_modified(|phase| {
			if *phase == Phase::Ready {
				*phase = Phase::Waiting;
				true
			} else {
				false
			}
		});
	}

	pub(super) fn close(&self) {
		self.tx.send_replace(Phase::Closed);
	}

	/// Waits up to `timeout` for readiness. Returns `false` on timeout or close.
	pub(super) async fn wait(&self, timeout: Duration) -> bool {
		let mut rx = self.tx.subscribe();
		let settled = async move {
			match rx.wait_for(|phase| *phase != Phase::Waiting).await {
				Ok(phase) => *phase == Phase::Ready,
				Err(_) => false,
			}
		};
		tokio::time::timeout(timeout, settled).await.unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transition_fires_once() {
		let readiness = Readiness::new();
		assert!(readiness.mark_ready());
		assert!(!readiness.mark_ready());
		assert!(readiness.is_ready());

		readiness.reset();
		assert!(!readiness.is_ready());
		assert!(readiness.mark_ready());
	}

	#[test]
	fn closed_never_becomes_ready() {
		let readiness = Readiness::new();
		readiness.close();
		assert!(!readiness.mark_ready());
		readiness.reset();
		assert!(!readiness.is_ready());
	}

	#[tokio::test]
	async fn wait_returns_when_marked() {
		let readiness = std::sync::Arc::new(Readiness::new());
		let r = std::sync::Arc::clone(&readiness);
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			r.mark_ready();
		});
		assert!(readiness.wait(Duration::from_secs(2)).await);
	}

	#[tokio::test]
	async fn wait_times_out_and_close_wakes() {
		let readiness = std::sync::Arc::new(Readiness::new());
		assert!(!readiness.wait(Duration::from_millis(20)).await);

		let r = std::sync::Arc::clone(&readiness);
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			r.close();
		});
		assert!(!readiness.wait(Duration::from_secs(5)).await);
	}
}
