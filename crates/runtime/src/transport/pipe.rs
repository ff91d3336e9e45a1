//! Length-prefixed JSON framing over byte streams.
//!
//! Each frame is a 4-byte little-endian length followed by that many bytes of
//! UTF-8 JSON. Used when the viewer side runs in another process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{ChannelEvent, ContextId, Packet, Transport, TransportParts};
use crate::error::{Error, Result};

/// Frames larger than this are rejected rather than allocated.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Writes one frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &Value) -> Result<()> {
	let bytes = serde_json::to_vec(payload)?;
	let len = u32::try_from(bytes.len()).map_err(|_| Error::Transport(format!("Frame too large: {} bytes", bytes.len())))?;
	writer.write_all(&len.to_le_bytes()).await?;
	writer.write_all(&bytes).await?;
	writer.flush().await?;
	Ok(())
}

/// Reads one frame. Returns `Ok(None)` on EOF at a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Value>> {
	let mut len_buf = [0u8; 4];
	let mut filled = 0;
	while filled < len_buf.len() {
		let n = reader
			.read(&mut len_buf[filled..])
			.await
			.map_err(|e| Error::Transport(format!("Failed to read length prefix: {e}")))?;
		if n == 0 {
			if filled == 0 {
				return Ok(None);
			}
			return Err(Error::Transport(format!(
				"Failed to read length prefix: stream ended after {filled} bytes"
			)));
		}
		filled += n;
	}

	let len = u32::from_le_bytes(len_buf) as usize;
	if len > MAX_FRAME_LEN {
		return Err(Error::Transport(format!("Frame too large: {len} bytes")));
	}

	let mut buf = vec![0u8; len];
	reader
		.read_exact(&mut buf)
		.await
		.map_err(|e| Error::Transport(format!("Failed to read frame body: {e}")))?;
	Ok(Some(serde_json::from_slice(&buf)?))
}

/// Outbound half of a pipe transport.
///
/// Posting queues the payload for a writer task, so [`Transport::post`] stays
/// non-blocking like every other transport.
pub struct PipeTransport {
	context: ContextId,
	peer: ContextId,
	outbound_tx: mpsc::UnboundedSender<Value>,
	open: Arc<AtomicBool>,
}

/// Inbound half of a pipe transport; drive it with [`run`](Self::run).
pub struct PipeTransportReceiver<R> {
	reader: R,
	peer: ContextId,
	inbound_tx: mpsc::UnboundedSender<ChannelEvent>,
	open: Arc<AtomicBool>,
}

impl PipeTransport {
	/// Creates a pipe transport and starts its writer task.
	///
	/// Must be called within a Tokio runtime. The returned receiver still has
	/// to be driven, see [`PipeTransport::spawn`] for the all-in-one variant.
	pub fn new<W, R>(
		context: ContextId,
		peer: ContextId,
		writer: W,
		reader: R,
	) -> (Self, PipeTransportReceiver<R>, mpsc::UnboundedReceiver<ChannelEvent>)
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		let open = Arc::new(AtomicBool::new(true));

		let writer_open = Arc::clone(&open);
		tokio::spawn(async move {
			let mut writer = writer;
			while let Some(payload) = outbound_rx.recv().await {
				if let Err(e) = write_frame(&mut writer, &payload).await {
					tracing::error!(error = %e, "Pipe transport write error");
					writer_open.store(false, Ordering::SeqCst);
					break;
				}
			}
		});

		let transport = Self {
			context,
			peer: peer.clone(),
			outbound_tx,
			open: Arc::clone(&open),
		};
		let receiver = PipeTransportReceiver {
			reader,
			peer,
			inbound_tx,
			open,
		};
		(transport, receiver, inbound_rx)
	}

	/// Creates a pipe transport, spawns its reader, and returns the parts.
	pub fn spawn<W, R>(context: ContextId, peer: ContextId, writer: W, reader: R) -> TransportParts
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (transport, receiver, inbound) = Self::new(context, peer, writer, reader);
		tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::error!(error = %e, "Pipe transport read error");
			}
		});
		TransportParts {
			sender: Arc::new(transport),
			inbound,
		}
	}
}

impl<R: AsyncRead + Unpin> PipeTransportReceiver<R> {
	/// Reads frames until EOF or error, forwarding each as a message from the peer.
	///
	/// Returns `Ok(())` on clean EOF or when the inbound consumer is gone.
	pub async fn run(mut self) -> Result<()> {
		let result = loop {
			match read_frame(&mut self.reader).await {
				Ok(Some(payload)) => {
					let event = ChannelEvent::Message(Packet {
						source: self.peer.clone(),
						origin: None,
						payload,
					});
					if self.inbound_tx.send(event).is_err() {
						tracing::debug!("Pipe transport consumer dropped, stopping reader");
						break Ok(());
					}
				}
				Ok(None) => break Ok(()),
				Err(e) => break Err(e),
			}
		};
		self.open.store(false, Ordering::SeqCst);
		result
	}
}

impl Transport for PipeTransport {
	fn context(&self) -> &ContextId {
		&self.context
	}

	fn peer(&self) -> &ContextId {
		&self.peer
	}

	fn post(&self, payload: Value) -> Result<()> {
		if !self.is_open() {
			return Err(Error::ChannelClosed);
		}
		self.outbound_tx.send(payload).map_err(|_| Error::ChannelClosed)
	}

	fn is_open(&self) -> bool {
		self.open.load(Ordering::SeqCst) && !self.outbound_tx.is_closed()
	}
}
