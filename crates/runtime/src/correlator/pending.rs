//! In-flight request bookkeeping.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use pdf_bridge_protocol::MessageType;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::Inner;
use crate::error::{Error, Result};

/// One request awaiting its response.
pub(super) struct PendingRequest {
	pub(super) kind: MessageType,
	tx: oneshot::Sender<Result<Value>>,
	timer: Option<JoinHandle<()>>,
}

impl PendingRequest {
	/// Resolves or rejects the caller and cancels the deadline.
	pub(super) fn settle(mut self, result: Result<Value>) {
		if let Some(timer) = self.timer.take() {
			timer.abort();
		}
		let _ = self.tx.send(result);
	}

	/// Rejects from inside the deadline task itself, which must not abort itself.
	pub(super) fn expire(mut self, err: Error) {
		self.timer.take();
		let _ = self.tx.send(Err(err));
	}
}

/// Pending requests keyed by correlation id.
#[derive(Default)]
pub(super) struct PendingTable {
	entries: HashMap<String, PendingRequest>,
}

impl PendingTable {
	pub(super) fn contains(&self, id: &str) -> bool {
		self.entries.contains_key(id)
	}

	pub(super) fn insert(&mut self, id: String, kind: MessageType) -> oneshot::Receiver<Result<Value>> {
		let (tx, rx) = oneshot::channel();
		self.entries.insert(id, PendingRequest { kind, tx, timer: None });
		rx
	}

	/// Attaches the deadline task. Aborts it right away if the entry is already gone.
	pub(super) fn set_timer(&mut self, id: &str, timer: JoinHandle<()>) {
		match self.entries.get_mut(id) {
			Some(entry) => entry.timer = Some(timer),
			None => timer.abort(),
		}
	}

	pub(super) fn take(&mut self, id: &str) -> Option<PendingRequest> {
		self.entries.remove(id)
	}

	pub(super) fn drain(&mut self) -> Vec<(String, PendingRequest)> {
		self.entries.drain().collect()
	}

	pub(super) fn len(&self) -> usize {
		self.entries.len()
	}
}

/// RAII guard removing the pending entry when a request future is dropped early.
pub(super) struct CancelGuard {
	id: String,
	inner: Weak<Inner>,
	completed: bool,
}

impl CancelGuard {
	pub(super) fn new(id: String, inner: Weak<Inner>) -> Self {
		Self {
			id,
			inner,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}
		let Some(inner) = self.inner.upgrade() else {
			return;
		};
		let removed = inner.pending.lock().take(&self.id);
		if let Some(entry) = removed {
			if let Some(timer) = entry.timer {
				timer.abort();
			}
			tracing::debug!(id = %self.id, "CancelGuard: removed orphaned request");
		}
	}
}

/// Future returned by `send_request` with automatic cancellation cleanup.
pub(super) struct ResponseFuture {
	pub(super) rx: oneshot::Receiver<Result<Value>>,
	pub(super) guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}
