//! Host-side request/response correlation.
//!
//! The [`Correlator`] assigns correlation ids, keeps the pending-request table,
//! gates requests on the viewer's ready handshake, and runs bounded
//! reconnection episodes when requests start timing out.
//!
//! One inbound pump task per correlator reads the transport. It is started in
//! [`Correlator::new`] and stopped by [`Correlator::destroy`] (or when the last
//! handle is dropped).

mod pending;
mod readiness;
mod reconnect;


use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use pdf_bridge_protocol::{Envelope, MessageType, Pong};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::events::{EventBus, RECONNECT_EXHAUSTED};
use crate::transport::{ChannelEvent, ContextId, Packet, Transport, TransportParts};
use pending::{CancelGuard, PendingTable, ResponseFuture};
use readiness::Readiness;
use reconnect::ReconnectState;
pub use reconnect::{ReconnectOutcome, ReconnectSnapshot};

/// Timing and retry knobs.
#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
	/// Deadline for an ordinary request.
	pub request_timeout: Duration,
	/// How long a ready-gated request waits for the handshake.
	pub ready_timeout: Duration,
	/// Deadline for the liveness probe and the follow-up readiness check.
	pub probe_timeout: Duration,
	pub max_reconnect_attempts: u32,
	/// Fixed delay between failed probes.
	pub reconnect_delay: Duration,
	/// Overall bound of a manual [`Correlator::reconnect`].
	pub reconnect_timeout: Duration,
}

impl Default for CorrelatorConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(5),
			ready_timeout: Duration::from_secs(30),
			probe_timeout: Duration::from_secs(5),
			max_reconnect_attempts: 3,
			reconnect_delay: Duration::from_secs(2),
			reconnect_timeout: Duration::from_secs(10),
		}
	}
}

/// Cloneable handle to one correlation engine bound to one transport.
#[derive(Clone)]
pub struct Correlator {
	inner: Arc<Inner>,
}

struct Inner {
	transport: Arc<dyn Transport>,
	config: CorrelatorConfig,
	pending: Mutex<PendingTable>,
	readiness: Readiness,
	reconnect: Mutex<ReconnectState>,
	events: EventBus,
	destroyed: AtomicBool,
	last_seq: AtomicU64,
	pump: Mutex<Option<JoinHandle<()>>>,
}

impl Correlator {
	/// Binds a correlator to `parts` and starts its inbound pump.
	///
	/// Must be called within a Tokio runtime.
	pub fn new(parts: TransportParts, config: CorrelatorConfig) -> Self {
		let TransportParts { sender, inbound } = parts;
		let inner = Arc::new(Inner {
			transport: sender,
			config,
			pending: Mutex::new(PendingTable::default()),
			readiness: Readiness::new(),
			reconnect: Mutex::new(ReconnectState::default()),
			events: EventBus::new(),
			destroyed: AtomicBool::new(false),
			last_seq: AtomicU64::new(0),
			pump: Mutex::new(None),
		});

		let pump = tokio::spawn(run_pump(Arc::downgrade(&inner), inbound));
		*inner.pump.lock() = Some(pump);

		tracing::debug!(
			context = %inner.transport.context(),
			peer = %inner.transport.peer(),
			"Correlator attached"
		);
		Self { inner }
	}

	pub fn config(&self) -> &CorrelatorConfig {
		&self.inner.config
	}

	/// Context this correlator talks to.
	pub fn peer(&self) -> &ContextId {
		self.inner.transport.peer()
	}

	/// Local bus carrying inbound events, the ready event, and reconnect notifications.
	pub fn events(&self) -> &EventBus {
		&self.inner.events
	}

	/// Sends `kind` with `data` and waits for the matching reply.
	///
	/// With `require_ready`, non-bypass types first wait for readiness (bounded
	/// by [`CorrelatorConfig::ready_timeout`]). If that wait fails but the
	/// transport is still open the request is sent anyway and its own deadline
	/// decides the outcome.
	pub async fn send_request(
		&self,
		kind: MessageType,
		data: Value,
		timeout: Duration,
		require_ready: bool,
	) -> Result<Value> {
		self.inner.request(kind, data, timeout, require_ready).await
	}

	/// [`send_request`](Self::send_request) with the default deadline, gated on readiness.
	pub async fn request(&self, kind: MessageType, data: Value) -> Result<Value> {
		self.inner
			.request(kind, data, self.inner.config.request_timeout, true)
			.await
	}

	/// Liveness probe. Does not wait for readiness.
	pub async fn ping(&self) -> Result<Pong> {
		let value = self
			.inner
			.request(MessageType::Ping, Value::Null, self.inner.config.probe_timeout, false)
			.await?;
		Ok(serde_json::from_value(value)?)
	}

	/// Waits up to `timeout` for the ready handshake.
	///
	/// On timeout with a live transport a reconnection episode is started.
	pub async fn ready(&self, timeout: Duration) -> Result<()> {
		self.inner.wait_ready(timeout).await
	}

	pub fn is_ready(&self) -> bool {
		self.inner.readiness.is_ready()
	}

	pub fn is_destroyed(&self) -> bool {
		self.inner.is_destroyed()
	}

	pub fn pending_count(&self) -> usize {
		self.inner.pending.lock().len()
	}

	/// Explicit external trigger for a reconnection attempt.
	pub fn trigger_reconnect(&self) {
		self.inner.attempt_reconnect();
	}

	pub fn reconnect_state(&self) -> ReconnectSnapshot {
		self.inner.reconnect_snapshot()
	}

	/// Starts a fresh reconnection episode and waits for its outcome.
	///
	/// Resolves on the next ready event, fails with [`Error::ConnectionLost`] on
	/// exhaustion, and is bounded overall by [`CorrelatorConfig::reconnect_timeout`].
	pub async fn reconnect(&self) -> Result<ReconnectOutcome> {
		let inner = &self.inner;
		inner.ensure_alive()?;
		if inner.readiness.is_ready() {
			return Ok(ReconnectOutcome::AlreadyReady);
		}
		if inner.reconnect.lock().in_progress {
			return Ok(ReconnectOutcome::Busy);
		}

		let (tx, rx) = oneshot::channel::<Result<()>>();
		let tx = Arc::new(Mutex::new(Some(tx)));

		let ready_tx = Arc::clone(&tx);
		let ready_id = inner.events.on(MessageType::Ready.as_str(), move |_| {
			if let Some(tx) = ready_tx.lock().take() {
				let _ = tx.send(Ok(()));
			}
			Ok(())
		});
		let exhausted_tx = tx;
		let exhausted_id = inner.events.on(RECONNECT_EXHAUSTED, move |data| {
			if let Some(tx) = exhausted_tx.lock().take() {
				let attempts = data.get("attempts").and_then(Value::as_u64).unwrap_or_default() as u32;
				let _ = tx.send(Err(Error::ConnectionLost { attempts }));
			}
			Ok(())
		});

		inner.reconnect.lock().restart();
		inner.attempt_reconnect();

		let timeout = inner.config.reconnect_timeout;
		let outcome = tokio::time::timeout(timeout, rx).await;
		inner.events.off(MessageType::Ready.as_str(), Some(ready_id));
		inner.events.off(RECONNECT_EXHAUSTED, Some(exhausted_id));

		match outcome {
			Ok(Ok(Ok(()))) => Ok(ReconnectOutcome::Reconnected),
			Ok(Ok(Err(e))) => Err(e),
			Ok(Err(_)) => Err(Error::Cancelled("reconnect abandoned".into())),
			Err(_) if inner.readiness.is_ready() => Ok(ReconnectOutcome::Reconnected),
			Err(_) => Err(Error::Timeout {
				kind: "reconnect".into(),
				timeout_ms: timeout.as_millis() as u64,
			}),
		}
	}

	/// Cancels every pending request and clears listeners, readiness, and
	/// reconnection counters. The transport stays attached.
	pub fn reset(&self) {
		let inner = &self.inner;
		inner.reject_all(|id| Error::Cancelled(format!("request {id} cancelled by reset")));
		inner.events.clear();
		inner.readiness.reset();
		inner.reconnect.lock().restart();
		tracing::debug!("Correlator reset");
	}

	/// Tears the correlator down. Idempotent.
	///
	/// Pending requests reject with [`Error::Destroyed`], the pump stops, and
	/// every later call fails with the same error.
	pub fn destroy(&self) {
		let inner = &self.inner;
		if inner.destroyed.swap(true, Ordering::SeqCst) {
			return;
		}
		if let Some(pump) = inner.pump.lock().take() {
			pump.abort();
		}
		inner.reject_all(|id| Error::Destroyed(format!("request {id} cancelled by destroy")));
		inner.reconnect.lock().restart();
		inner.events.clear();
		inner.readiness.close();
		tracing::debug!(peer = %inner.transport.peer(), "Correlator destroyed");
	}
}

impl std::fmt::Debug for Correlator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Correlator")
			.field("peer", self.inner.transport.peer())
			.field("ready", &self.is_ready())
			.field("pending", &self.pending_count())
			.field("destroyed", &self.is_destroyed())
			.finish()
	}
}

impl Inner {
	fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::SeqCst)
	}

	fn ensure_alive(&self) -> Result<()> {
		if self.is_destroyed() {
			return Err(Error::Destroyed("correlator has been destroyed".into()));
		}
		Ok(())
	}

	/// `{type}_{millis}_{seq}`; uniqueness among pending ids is checked by the caller.
	fn next_request_id(&self, kind: MessageType) -> String {
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default();
		let seq = self.last_seq.fetch_add(1, Ordering::Relaxed);
		format!("{}_{millis}_{seq:x}", kind.as_str())
	}

	async fn wait_ready(self: &Arc<Self>, timeout: Duration) -> Result<()> {
		self.ensure_alive()?;
		if self.readiness.wait(timeout).await {
			return Ok(());
		}
		self.ensure_alive()?;

		let timeout_ms = timeout.as_millis() as u64;
		tracing::warn!(timeout_ms, "Viewer not ready in time");
		if self.transport.is_open() {
			self.attempt_reconnect();
		}
		Err(Error::ReadyTimeout { timeout_ms })
	}

	async fn request(
		self: &Arc<Self>,
		kind: MessageType,
		data: Value,
		timeout: Duration,
		require_ready: bool,
	) -> Result<Value> {
		self.ensure_alive()?;

		if require_ready && !kind.bypasses_readiness() && !self.readiness.is_ready() {
			if let Err(e) = self.wait_ready(self.config.ready_timeout).await {
				if !self.transport.is_open() || self.is_destroyed() {
					return Err(e);
				}
				tracing::debug!(kind = %kind, error = %e, "Sending without readiness");
			}
		}

		// Bookkeeping first, so even an instant reply finds its entry.
		let (id, rx) = {
			let mut pending = self.pending.lock();
			let mut id = self.next_request_id(kind);
			while pending.contains(&id) {
				id = self.next_request_id(kind);
			}
			let rx = pending.insert(id.clone(), kind);
			(id, rx)
		};
		let guard = CancelGuard::new(id.clone(), Arc::downgrade(self));

		let timer = tokio::spawn(expire_after(Arc::downgrade(self), id.clone(), timeout));
		self.pending.lock().set_timer(&id, timer);

		let payload = serde_json::to_value(Envelope::request(kind, data, id.clone()))?;
		tracing::debug!(id = %id, kind = %kind, "Sending request");
		if let Err(e) = self.transport.post(payload) {
			tracing::error!(id = %id, error = %e, "Failed to post request");
			return Err(e);
		}

		ResponseFuture { rx, guard }.await
	}

	fn reject_all(&self, err: impl Fn(&str) -> Error) {
		let drained = self.pending.lock().drain();
		for (id, entry) in drained {
			entry.settle(Err(err(&id)));
		}
	}

	fn handle(self: &Arc<Self>, event: ChannelEvent) {
		match event {
			ChannelEvent::Message(packet) => self.dispatch(packet),
			ChannelEvent::Loaded => {
				tracing::debug!("Viewer context loaded, readiness reset");
				self.readiness.reset();
				// A probe in flight keeps running; the new context still gets every attempt.
				let mut state = self.reconnect.lock();
				if state.in_progress {
					state.refill();
				} else {
					state.restart();
				}
			}
		}
	}

	fn dispatch(self: &Arc<Self>, packet: Packet) {
		if &packet.source != self.transport.peer() {
			tracing::debug!(source = %packet.source, "Ignoring message from foreign context");
			return;
		}
		let Some(envelope) = Envelope::from_value(packet.payload) else {
			tracing::debug!("Ignoring message without a type");
			return;
		};

		if let Some(id) = envelope.request_id.clone() {
			let entry = self.pending.lock().take(&id);
			match entry {
				Some(entry) => {
					tracing::debug!(id = %id, kind = %entry.kind, error = envelope.is_error(), "Response received");
					let outcome = envelope.into_outcome().map_err(|e| Error::Remote {
						message: e.message,
						stack: e.stack,
					});
					entry.settle(outcome);
				}
				None => tracing::debug!(id = %id, kind = %envelope.kind, "Response for unknown request (ignored)"),
			}
			return;
		}

		if envelope.message_type() == Some(MessageType::Ready) {
			self.complete_ready(&envelope.data);
		} else {
			tracing::debug!(kind = %envelope.kind, "Event received");
			self.events.emit(&envelope.kind, &envelope.data);
		}
	}

	/// Single completion path for both real and synthesized ready signals.
	fn complete_ready(&self, data: &Value) {
		if self.readiness.mark_ready() {
			tracing::info!(peer = %self.transport.peer(), "Viewer ready");
			self.events.emit(MessageType::Ready.as_str(), data);
		} else {
			tracing::warn!("Duplicate ready signal ignored");
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(pump) = self.pump.get_mut().take() {
			pump.abort();
		}
		for (_, entry) in self.pending.get_mut().drain() {
			entry.settle(Err(Error::ChannelClosed));
		}
	}
}

async fn run_pump(inner: Weak<Inner>, mut inbound: mpsc::UnboundedReceiver<ChannelEvent>) {
	while let Some(event) = inbound.recv().await {
		let Some(inner) = inner.upgrade() else {
			break;
		};
		if inner.is_destroyed() {
			break;
		}
		inner.handle(event);
	}
	tracing::debug!("Correlator inbound stream ended");
}

async fn expire_after(inner: Weak<Inner>, id: String, timeout: Duration) {
	tokio::time::sleep(timeout).await;
	let Some(inner) = inner.upgrade() else {
		return;
	};
	let Some(entry) = inner.pending.lock().take(&id) else {
		return;
	};

	let kind = entry.kind;
	let timeout_ms = timeout.as_millis() as u64;
	tracing::warn!(id = %id, kind = %kind, timeout_ms, "Request timed out");
	entry.expire(Error::Timeout {
		kind: kind.as_str().to_string(),
		timeout_ms,
	});

	if !kind.bypasses_readiness() {
		inner.attempt_reconnect();
	}
}
