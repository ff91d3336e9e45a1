use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

fn ids() -> (ContextId, ContextId) {
	(ContextId::new("host"), ContextId::new("viewer"))
}

async fn write_raw_frame<W: tokio::io::AsyncWrite + Unpin>(w: &mut W, value: &Value) {
	let json_bytes = serde_json::to_vec(value).unwrap();
	let length = json_bytes.len() as u32;
	w.write_all(&length.to_le_bytes()).await.unwrap();
	w.write_all(&json_bytes).await.unwrap();
	w.flush().await.unwrap();
}

fn message_payload(event: ChannelEvent) -> Value {
	match event {
		ChannelEvent::Message(packet) => packet.payload,
		other => panic!("expected message, got {other:?}"),
	}
}

#[test]
fn test_length_prefix_encoding() {
	let length: u32 = 1234;
	let bytes = length.to_le_bytes();

	assert_eq!(bytes[0], (length & 0xFF) as u8);
	assert_eq!(bytes[1], ((length >> 8) & 0xFF) as u8);
	assert_eq!(bytes[2], ((length >> 16) & 0xFF) as u8);
	assert_eq!(bytes[3], ((length >> 24) & 0xFF) as u8);
	assert_eq!(u32::from_le_bytes(bytes), length);
}

#[tokio::test]
async fn test_memory_pair_delivers_in_order_with_source() {
	let (host_id, viewer_id) = ids();
	let (host, mut viewer) = MemoryTransport::pair(host_id.clone(), viewer_id);

	for i in 0..3 {
		host.transport.post(json!({"seq": i})).unwrap();
	}

	for i in 0..3 {
		match viewer.inbound.recv().await.unwrap() {
			ChannelEvent::Message(packet) => {
				assert_eq!(packet.source, host_id);
				assert_eq!(packet.payload, json!({"seq": i}));
			}
			other => panic!("unexpected {other:?}"),
		}
	}
}

#[tokio::test]
async fn test_memory_pair_loaded_signal_and_close() {
	let (host_id, viewer_id) = ids();
	let (mut host, viewer) = MemoryTransport::pair(host_id, viewer_id);

	viewer.transport.signal_loaded().unwrap();
	assert_eq!(host.inbound.recv().await.unwrap(), ChannelEvent::Loaded);

	assert!(host.transport.is_open());
	drop(viewer);
	assert!(!host.transport.is_open());
	assert!(matches!(host.transport.post(json!({})), Err(Error::ChannelClosed)));
}

#[tokio::test]
async fn test_origin_label_is_carried() {
	let (host_id, viewer_id) = ids();
	let (host, mut viewer) =
		MemoryTransport::pair_with_origins(host_id, Some("https://app.example".into()), viewer_id, None);

	host.transport.post(json!({"type": "pdfjs.ping"})).unwrap();
	match viewer.inbound.recv().await.unwrap() {
		ChannelEvent::Message(packet) => assert_eq!(packet.origin.as_deref(), Some("https://app.example")),
		other => panic!("unexpected {other:?}"),
	}
}

#[tokio::test]
async fn test_send_message() {
	// Transport writes into one pipe, reads from another.
	let (mut peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, _peer_write) = tokio::io::duplex(1024);

	let (host_id, viewer_id) = ids();
	let (transport, _receiver, _rx) = PipeTransport::new(host_id, viewer_id, transport_write, transport_read);

	let test_message = json!({
		"type": "pdfjs.ping",
		"requestId": "pdfjs.ping_1_1",
		"data": {"foo": "bar"}
	});
	transport.post(test_message.clone()).unwrap();

	let mut len_buf = [0u8; 4];
	peer_read.read_exact(&mut len_buf).await.unwrap();
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	peer_read.read_exact(&mut msg_buf).await.unwrap();

	let received: Value = serde_json::from_slice(&msg_buf).unwrap();
	assert_eq!(received, test_message);
}

#[tokio::test]
async fn test_multiple_messages_in_sequence() {
	let (_peer_read, transport_write) = tokio::io::duplex(4096);
	let (transport_read, mut peer_write) = tokio::io::duplex(4096);

	let (host_id, viewer_id) = ids();
	let (_transport, receiver, mut rx) = PipeTransport::new(host_id, viewer_id.clone(), transport_write, transport_read);
	let read_task = tokio::spawn(receiver.run());

	let messages = vec![
		json!({"type": "pdfjs.interface.ready", "data": {"numPages": 3}}),
		json!({"type": "pdfjs.pageChanged", "data": {"pageNumber": 2}}),
		json!({"type": "pdfjs.pageChanged", "data": {"pageNumber": 3}}),
	];
	for msg in &messages {
		write_raw_frame(&mut peer_write, msg).await;
	}

	for expected in &messages {
		match rx.recv().await.unwrap() {
			ChannelEvent::Message(packet) => {
				assert_eq!(packet.source, viewer_id);
				assert_eq!(&packet.payload, expected);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	drop(peer_write);
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_large_message() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024 * 1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024 * 1024);

	let (host_id, viewer_id) = ids();
	let (_transport, receiver, mut rx) = PipeTransport::new(host_id, viewer_id, transport_write, transport_read);
	let read_task = tokio::spawn(receiver.run());

	let large_message = json!({
		"type": "pdfjs.getText",
		"requestId": "r1",
		"data": "x".repeat(100_000)
	});
	write_raw_frame(&mut peer_write, &large_message).await;

	assert_eq!(message_payload(rx.recv().await.unwrap()), large_message);

	drop(peer_write);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_malformed_length_prefix() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let (host_id, viewer_id) = ids();
	let (transport, receiver, _rx) = PipeTransport::new(host_id, viewer_id, transport_write, transport_read);

	// Only 2 of the 4 prefix bytes, then EOF
	peer_write.write_all(&[0x01, 0x02]).await.unwrap();
	peer_write.flush().await.unwrap();
	drop(peer_write);

	let result = receiver.run().await;
	assert!(result.unwrap_err().to_string().contains("Failed to read length prefix"));
	assert!(!transport.is_open());
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let (host_id, viewer_id) = ids();
	let (_transport, receiver, _rx) = PipeTransport::new(host_id, viewer_id, transport_write, transport_read);

	let bogus = (MAX_FRAME_LEN as u32) + 1;
	peer_write.write_all(&bogus.to_le_bytes()).await.unwrap();
	peer_write.flush().await.unwrap();

	let err = receiver.run().await.unwrap_err();
	assert!(err.to_string().contains("Frame too large"));
}

#[tokio::test]
async fn test_eof_closes_transport() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, peer_write) = tokio::io::duplex(1024);

	let (host_id, viewer_id) = ids();
	let parts = PipeTransport::spawn(host_id, viewer_id, transport_write, transport_read);
	assert!(parts.sender.is_open());

	drop(peer_write);
	let mut inbound = parts.inbound;
	assert!(inbound.recv().await.is_none());
	assert!(!parts.sender.is_open());
}

#[tokio::test]
async fn test_graceful_shutdown() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let (host_id, viewer_id) = ids();
	let (_transport, receiver, mut rx) = PipeTransport::new(host_id, viewer_id, transport_write, transport_read);
	let read_task = tokio::spawn(receiver.run());

	let message = json!({"type": "pdfjs.ping", "requestId": "p1"});
	write_raw_frame(&mut peer_write, &message).await;
	assert_eq!(message_payload(rx.recv().await.unwrap()), message);

	// Consumer gone: the next frame stops the reader cleanly
	drop(rx);
	write_raw_frame(&mut peer_write, &message).await;
	drop(peer_write);

	assert!(read_task.await.unwrap().is_ok());
}
