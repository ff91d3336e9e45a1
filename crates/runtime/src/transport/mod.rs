//! Envelope delivery between two execution contexts.
//!
//! A transport only moves opaque JSON payloads. Delivery is FIFO per
//! direction, with no backpressure and no retries; everything above that
//! (correlation, readiness, retry) lives in [`crate::correlator`].
//!
//! The inbound half of every transport is an unbounded receiver of
//! [`ChannelEvent`]s. Besides messages, it carries [`ChannelEvent::Loaded`],
//! which the embedding layer raises whenever the remote context (re)loads.

mod pipe;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

pub use pipe::{MAX_FRAME_LEN, PipeTransport, PipeTransportReceiver, read_frame, write_frame};

/// Identity of one execution context (host page or embedded viewer).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(Arc<str>);

impl ContextId {
	pub fn new(id: impl AsRef<str>) -> Self {
		Self(Arc::from(id.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ContextId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ContextId {
	fn from(s: &str) -> Self {
		Self::new(s)
	}
}

/// One delivered message with its declared source.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
	/// Context that posted the payload.
	pub source: ContextId,
	/// Origin label of the posting context, if the transport knows it.
	pub origin: Option<String>,
	pub payload: Value,
}

/// Item of the inbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
	Message(Packet),
	/// The remote context finished (re)loading.
	Loaded,
}

/// Outbound half of a transport.
pub trait Transport: Send + Sync {
	/// Returns the context this transport posts from.
	fn context(&self) -> &ContextId;

	/// Returns the context on the other end.
	fn peer(&self) -> &ContextId;

	/// Posts a payload to the peer. Never waits for delivery.
	fn post(&self, payload: Value) -> Result<()>;

	/// Returns `false` once the peer can no longer receive.
	fn is_open(&self) -> bool;
}

/// A transport split into its outbound handle and inbound stream.
pub struct TransportParts {
	pub sender: Arc<dyn Transport>,
	pub inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// In-process transport backed by unbounded channels.
///
/// Created in connected pairs by [`MemoryTransport::pair`].
pub struct MemoryTransport {
	context: ContextId,
	peer: ContextId,
	origin: Option<String>,
	peer_tx: mpsc::UnboundedSender<ChannelEvent>,
}

/// One end of a [`MemoryTransport`] pair.
pub struct MemoryEndpoint {
	pub transport: Arc<MemoryTransport>,
	pub inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl MemoryEndpoint {
	pub fn into_parts(self) -> TransportParts {
		TransportParts {
			sender: self.transport,
			inbound: self.inbound,
		}
	}
}

impl MemoryTransport {
	/// Creates a connected pair `(a, b)`.
	pub fn pair(a: ContextId, b: ContextId) -> (MemoryEndpoint, MemoryEndpoint) {
		Self::pair_with_origins(a, None, b, None)
	}

	/// Creates a connected pair whose packets carry origin labels.
	pub fn pair_with_origins(
		a: ContextId,
		a_origin: Option<String>,
		b: ContextId,
		b_origin: Option<String>,
	) -> (MemoryEndpoint, MemoryEndpoint) {
		let (a_tx, a_rx) = mpsc::unbounded_channel();
		let (b_tx, b_rx) = mpsc::unbounded_channel();

		let a_end = MemoryEndpoint {
			transport: Arc::new(MemoryTransport {
				context: a.clone(),
				peer: b.clone(),
				origin: a_origin,
				peer_tx: b_tx,
			}),
			inbound: a_rx,
		};
		let b_end = MemoryEndpoint {
			transport: Arc::new(MemoryTransport {
				context: b,
				peer: a,
				origin: b_origin,
				peer_tx: a_tx,
			}),
			inbound: b_rx,
		};
		(a_end, b_end)
	}

	/// Tells the peer that this context finished (re)loading.
	pub fn signal_loaded(&self) -> Result<()> {
		self.peer_tx.send(ChannelEvent::Loaded).map_err(|_| Error::ChannelClosed)
	}

	/// Delivers a payload to the peer as if it had been posted by `source`.
	///
	/// Used to model foreign contexts sharing the same message channel.
	pub fn post_as(&self, source: ContextId, payload: Value) -> Result<()> {
		self.peer_tx
			.send(ChannelEvent::Message(Packet {
				source,
				origin: self.origin.clone(),
				payload,
			}))
			.map_err(|_| Error::ChannelClosed)
	}
}

impl Transport for MemoryTransport {
	fn context(&self) -> &ContextId {
		&self.context
	}

	fn peer(&self) -> &ContextId {
		&self.peer
	}

	fn post(&self, payload: Value) -> Result<()> {
		self.post_as(self.context.clone(), payload)
	}

	fn is_open(&self) -> bool {
		!self.peer_tx.is_closed()
	}
}
