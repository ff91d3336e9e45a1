//! Engine event forwarding.

use std::sync::Arc;

use pdf_bridge_protocol::{AnnotationDeleted, Envelope, HighlightRemoved, MessageType, PageRendered, ReadyInfo};
use serde::Serialize;
use tokio::sync::broadcast;

use super::RouterInner;
use crate::engine::EngineEvent;

pub(super) async fn run(inner: Arc<RouterInner>, mut events: broadcast::Receiver<EngineEvent>) {
	loop {
		match events.recv().await {
			Ok(event) => inner.forward(event).await,
			Err(broadcast::error::RecvError::Lagged(n)) => {
				tracing::warn!(dropped = n, "Engine event receiver lagged");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

impl RouterInner {
	async fn forward(&self, event: EngineEvent) {
		match event {
			EngineEvent::DocumentLoaded => {
				let info = ReadyInfo {
					version: self.config.version.clone(),
					title: self
						.engine
						.document_info()
						.await
						.map(|info| info.title)
						.unwrap_or_default(),
					num_pages: self.engine.page_count().await,
				};
				self.emit(MessageType::Ready, &info);
			}
			EngineEvent::HighlightCreated(highlight) => self.emit(MessageType::HighlightCreated, &highlight),
			EngineEvent::HighlightRemoved { id, cancelled: true, .. } => {
				tracing::debug!(id = %id, "Highlight removal requested by host, not forwarded");
			}
			EngineEvent::HighlightRemoved { id, page, .. } => {
				self.emit(MessageType::HighlightRemoved, &HighlightRemoved { id, page });
			}
			EngineEvent::PageRendered { page_number, error } => {
				self.emit(MessageType::PageRendered, &PageRendered { page_number, error });
			}
			EngineEvent::PageChanged(page) => self.emit(MessageType::PageChanged, &page),
			EngineEvent::AnnotationAdded(annotation) => self.emit(MessageType::AnnotationAdded, &annotation),
			EngineEvent::AnnotationUpdated(annotation) => self.emit(MessageType::AnnotationUpdated, &annotation),
			EngineEvent::AnnotationDeleted(id) => {
				self.emit(MessageType::AnnotationDeleted, &AnnotationDeleted { id });
			}
		}
	}

	fn emit<T: Serialize>(&self, kind: MessageType, data: &T) {
		match serde_json::to_value(data) {
			Ok(data) => self.post(&Envelope::event(kind, data)),
			Err(e) => tracing::error!(kind = %kind, error = %e, "Failed to encode event"),
		}
	}
}
