//! Bounded reconnection episodes driven by a liveness probe.
//!
//! An episode starts on a request timeout or an explicit trigger and ends with
//! either a successful probe or exhaustion of the attempt limit. At most one
//! probe is in flight and at most one retry is scheduled at any time.

use std::sync::Arc;
use std::time::Duration;

use pdf_bridge_protocol::MessageType;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use super::Inner;
use crate::error::Error;
use crate::events::{RECONNECT_EXHAUSTED, RECONNECT_SUCCESS};

/// Point-in-time view of the reconnection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectSnapshot {
	pub attempts: u32,
	pub max_attempts: u32,
	pub in_progress: bool,
	pub delay: Duration,
}

/// Result of a manual [`Correlator::reconnect`](super::Correlator::reconnect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
	/// The viewer was already ready; nothing was done.
	AlreadyReady,
	/// An episode is already running; no second one was started.
	Busy,
	/// The viewer became ready again.
	Reconnected,
}

#[derive(Default)]
pub(super) struct ReconnectState {
	pub(super) attempts: u32,
	pub(super) in_progress: bool,
	exhausted_notified: bool,
	/// Bumped whenever the episode is abandoned, so stale probe results are dropped.
	episode: u64,
	retry: Option<JoinHandle<()>>,
}

impl ReconnectState {
	/// Starts over with a fresh attempt count, abandoning whatever was in flight.
	pub(super) fn restart(&mut self) {
		if let Some(retry) = self.retry.take() {
			retry.abort();
		}
		self.attempts = 0;
		self.in_progress = false;
		self.exhausted_notified = false;
		self.episode += 1;
	}

	/// Forgets spent attempts without touching the probe in flight.
	pub(super) fn refill(&mut self) {
		self.attempts = 0;
		self.exhausted_notified = false;
	}
}

impl Drop for ReconnectState {
	fn drop(&mut self) {
		if let Some(retry) = self.retry.take() {
			retry.abort();
		}
	}
}

impl Inner {
	pub(super) fn reconnect_snapshot(&self) -> ReconnectSnapshot {
		let state = self.reconnect.lock();
		ReconnectSnapshot {
			attempts: state.attempts,
			max_attempts: self.config.max_reconnect_attempts,
			in_progress: state.in_progress,
			delay: self.config.reconnect_delay,
		}
	}

	/// Starts the next attempt of the current episode, if allowed.
	pub(super) fn attempt_reconnect(self: &Arc<Self>) {
		let max = self.config.max_reconnect_attempts;
		let (attempt, episode) = {
			let mut state = self.reconnect.lock();
			if self.is_destroyed() || state.in_progress || state.attempts >= max {
				tracing::debug!(
					attempts = state.attempts,
					in_progress = state.in_progress,
					"Reconnect attempt skipped"
				);
				return;
			}
			if let Some(retry) = state.retry.take() {
				retry.abort();
			}
			state.in_progress = true;
			state.attempts += 1;
			(state.attempts, state.episode)
		};

		tracing::info!(attempt, max, "Probing viewer connection");
		let inner = Arc::clone(self);
		tokio::spawn(async move { inner.run_probe(attempt, episode).await });
	}

	async fn run_probe(self: Arc<Self>, attempt: u32, episode: u64) {
		let probe = self
			.request(MessageType::Ping, Value::Null, self.config.probe_timeout, false)
			.await;

		let stale = self.reconnect.lock().episode != episode;
		if stale {
			tracing::debug!(attempt, "Stale probe outcome ignored");
			return;
		}

		match probe {
			Ok(_) => self.probe_succeeded(attempt).await,
			Err(e) => self.probe_failed(attempt, episode, e),
		}
	}

	async fn probe_succeeded(self: &Arc<Self>, attempt: u32) {
		{
			let mut state = self.reconnect.lock();
			state.in_progress = false;
			state.attempts = 0;
			state.exhausted_notified = false;
		}
		tracing::info!(attempts = attempt, "Viewer connection restored");
		self.events.emit(RECONNECT_SUCCESS, &json!({ "attempts": attempt }));

		if self.readiness.is_ready() {
			return;
		}
		match self
			.request(MessageType::CheckReady, Value::Null, self.config.probe_timeout, false)
			.await
		{
			Ok(Value::Bool(true)) => self.complete_ready(&Value::Null),
			Ok(_) => tracing::debug!("Viewer reachable but not ready yet"),
			Err(e) => tracing::warn!(error = %e, "Readiness check after reconnect failed"),
		}
	}

	fn probe_failed(self: &Arc<Self>, attempt: u32, episode: u64, err: Error) {
		let max = self.config.max_reconnect_attempts;
		let mut state = self.reconnect.lock();
		state.in_progress = false;
		if self.is_destroyed() {
			return;
		}

		if state.attempts < max {
			let delay = self.config.reconnect_delay;
			tracing::warn!(
				attempt,
				max,
				error = %err,
				delay_ms = delay.as_millis() as u64,
				"Reconnect probe failed, retrying"
			);
			if let Some(prev) = state.retry.take() {
				prev.abort();
			}
			let weak = Arc::downgrade(self);
			state.retry = Some(tokio::spawn(async move {
				tokio::time::sleep(delay).await;
				let Some(inner) = weak.upgrade() else {
					return;
				};
				{
					let mut state = inner.reconnect.lock();
					if state.episode != episode {
						return;
					}
					state.retry = None;
				}
				inner.attempt_reconnect();
			}));
		} else if !state.exhausted_notified {
			state.exhausted_notified = true;
			let attempts = state.attempts;
			drop(state);
			tracing::error!(attempts, max, error = %err, "Reconnection attempts exhausted");
			self.events.emit(
				RECONNECT_EXHAUSTED,
				&json!({ "attempts": attempts, "maxAttempts": max }),
			);
		}
	}
}
