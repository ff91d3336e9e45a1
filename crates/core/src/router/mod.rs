//! Viewer-side message router.
//!
//! Demultiplexes inbound envelopes to [`DocumentEngine`] operations and replies
//! when the envelope carries a correlation id. Engine events are forwarded to
//! the host independently, once each.

mod forward;


use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pdf_bridge_protocol::{
	AnnotationParams, AnnotationsParams, ClearedHighlights, DEFAULT_HIGHLIGHT_COLOR, DeleteAnnotationParams, Envelope,
	ErrorPayload, FindParams, GoToPageParams, HighlightIdParams, HighlightParams, MessageType, NavigateParams,
	OperationStatus, PageText, PageTextParams, Pong, RotateParams, TextHighlightResult, ZoomParams,
};
use pdf_bridge_runtime::{ChannelEvent, ContextId, Transport, TransportParts};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{DocumentEngine, EngineError, EngineResult};

/// Router settings.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
	/// When set, envelopes from any other origin are dropped. Envelopes without
	/// an origin label are dropped too.
	pub allowed_origins: Option<Vec<String>>,
	/// Reported in the ready event.
	pub version: Option<String>,
}

impl RouterConfig {
	fn origin_allowed(&self, origin: Option<&str>) -> bool {
		match (&self.allowed_origins, origin) {
			(None, _) => true,
			(Some(allowed), Some(origin)) => allowed.iter().any(|a| a == origin),
			(Some(_), None) => false,
		}
	}
}

struct RouterInner {
	engine: Arc<dyn DocumentEngine>,
	transport: Arc<dyn Transport>,
	config: RouterConfig,
}

/// A running router. Dropping it stops both of its tasks.
pub struct Router {
	inner: Arc<RouterInner>,
	tasks: Vec<JoinHandle<()>>,
}

impl Router {
	/// Starts serving `parts` against `engine`.
	///
	/// The engine event subscription is taken before this returns, so a
	/// following [`DocumentEngine::open`] is always announced.
	pub fn spawn(parts: TransportParts, engine: Arc<dyn DocumentEngine>, config: RouterConfig) -> Self {
		let TransportParts { sender, inbound } = parts;
		let inner = Arc::new(RouterInner {
			engine,
			transport: sender,
			config,
		});

		let engine_events = inner.engine.events();
		let forwarder = tokio::spawn(forward::run(Arc::clone(&inner), engine_events));
		let serve = tokio::spawn(serve(Arc::clone(&inner), inbound));

		tracing::debug!(context = %inner.transport.context(), "Router started");
		Self {
			inner,
			tasks: vec![serve, forwarder],
		}
	}

	pub fn context(&self) -> &ContextId {
		self.inner.transport.context()
	}

	/// Runs one operation directly, bypassing the transport.
	pub async fn process(&self, kind: &str, data: Value) -> EngineResult<Value> {
		self.inner.process(kind, data).await
	}

	/// Waits until the inbound stream ends, then stops.
	pub async fn closed(mut self) {
		if self.tasks.is_empty() {
			return;
		}
		let serve = self.tasks.remove(0);
		let _ = serve.await;
	}

	/// Stops serving. Equivalent to dropping the router.
	pub fn shutdown(self) {}
}

impl Drop for Router {
	fn drop(&mut self) {
		for task in self.tasks.drain(..) {
			task.abort();
		}
		tracing::debug!(context = %self.inner.transport.context(), "Router stopped");
	}
}

async fn serve(inner: Arc<RouterInner>, mut inbound: mpsc::UnboundedReceiver<ChannelEvent>) {
	while let Some(event) = inbound.recv().await {
		let ChannelEvent::Message(packet) = event else {
			continue;
		};
		if &packet.source == inner.transport.context() {
			continue;
		}
		if !inner.config.origin_allowed(packet.origin.as_deref()) {
			tracing::warn!(origin = ?packet.origin, "Dropping message from disallowed origin");
			continue;
		}
		let Some(envelope) = Envelope::from_value(packet.payload) else {
			tracing::debug!("Dropping message without a type");
			continue;
		};
		inner.respond(envelope).await;
	}
	tracing::debug!("Router inbound stream ended");
}

/// Builds the error body: the message plus the source chain, one cause per line.
fn error_payload(err: &EngineError) -> ErrorPayload {
	let mut causes = Vec::new();
	let mut source = std::error::Error::source(err);
	while let Some(cause) = source {
		causes.push(format!("caused by: {cause}"));
		source = cause.source();
	}
	ErrorPayload {
		message: err.to_string(),
		stack: (!causes.is_empty()).then(|| causes.join("\n")),
	}
}

fn params<T: DeserializeOwned>(kind: MessageType, data: Value) -> EngineResult<T> {
	serde_json::from_value(data).map_err(|source| EngineError::InvalidParams {
		kind: kind.to_string(),
		source,
	})
}

fn to_value<T: Serialize>(value: T) -> EngineResult<Value> {
	Ok(serde_json::to_value(value)?)
}

/// Turns a soft failure into `{success: false, error}` instead of an error reply.
fn soft(result: EngineResult<OperationStatus>) -> EngineResult<Value> {
	to_value(result.unwrap_or_else(|e| OperationStatus::failed(e.to_string())))
}

impl RouterInner {
	async fn respond(&self, envelope: Envelope) {
		let Envelope {
			kind, data, request_id, ..
		} = envelope;
		let outcome = self.process(&kind, data).await;

		let Some(id) = request_id else {
			if let Err(e) = outcome {
				tracing::debug!(kind = %kind, error = %e, "Uncorrelated message failed");
			}
			return;
		};

		let reply = match outcome {
			Ok(value) => Envelope::reply(&kind, value, id),
			Err(e) => {
				tracing::warn!(kind = %kind, error = %e, "Operation failed");
				Envelope::error_reply(&kind, error_payload(&e), id)
			}
		};
		self.post(&reply);
	}

	fn post(&self, envelope: &Envelope) {
		let payload = match serde_json::to_value(envelope) {
			Ok(payload) => payload,
			Err(e) => {
				tracing::error!(kind = %envelope.kind, error = %e, "Failed to encode envelope");
				return;
			}
		};
		if let Err(e) = self.transport.post(payload) {
			tracing::error!(kind = %envelope.kind, error = %e, "Failed to deliver envelope");
		}
	}

	async fn process(&self, kind: &str, data: Value) -> EngineResult<Value> {
		let kind: MessageType = kind.parse()?;
		let engine = &self.engine;

		match kind {
			MessageType::Ping => {
				let timestamp = SystemTime::now()
					.duration_since(UNIX_EPOCH)
					.map(|d| d.as_millis() as u64)
					.unwrap_or_default();
				to_value(Pong { pong: true, timestamp })
			}
			MessageType::CheckReady => Ok(Value::Bool(true)),
			MessageType::GetDocumentInfo => to_value(engine.document_info().await?),
			MessageType::GetDocumentOutline => to_value(engine.outline().await?),
			MessageType::GetCurrentPage => to_value(engine.current_page().await),
			MessageType::GetPageCount => to_value(engine.page_count().await),
			MessageType::GoToPage => {
				let p: GoToPageParams = params(kind, data)?;
				engine.go_to_page(p.page_number).await?;
				to_value(OperationStatus::ok().with("page", p.page_number))
			}
			MessageType::NavigateTo => {
				let p: NavigateParams = params(kind, data)?;
				soft(engine.navigate_to(&p.dest).await.map(|()| OperationStatus::ok()))
			}
			MessageType::GetAllText => self.all_text().await,
			MessageType::GetPageText => {
				let p: PageTextParams = params(kind, data)?;
				let text = engine.page_text(p.page).await?;
				to_value(PageText { page: p.page, text })
			}
			MessageType::FindText => {
				let p: FindParams = params(kind, data)?;
				to_value(engine.find(&p.text, p.options).await?)
			}
			MessageType::SetTextHighlight => {
				let p: HighlightParams = params(kind, data)?;
				let color = p.options.color.as_deref().unwrap_or(DEFAULT_HIGHLIGHT_COLOR);
				let highlight = engine.highlight_text(&p.text, color).await?;
				to_value(TextHighlightResult {
					success: true,
					id: highlight.id,
					text: highlight.text,
					page: highlight.page,
					color: color.to_string(),
				})
			}
			MessageType::ClearTextHighlight => {
				engine.clear_search_highlight().await?;
				to_value(OperationStatus::ok())
			}
			MessageType::GetHighlights => to_value(engine.highlights().await?),
			MessageType::ClearHighlights => self.clear_highlights().await,
			MessageType::ClearHighlight => {
				let p: HighlightIdParams = params(kind, data)?;
				let status = match engine.remove_highlight(&p.id, true).await {
					Ok(true) => OperationStatus::ok().with("id", p.id),
					Ok(false) => OperationStatus::failed(format!("Highlight not found: {}", p.id)),
					Err(e) => OperationStatus::failed(e.to_string()),
				};
				to_value(status)
			}
			MessageType::GetAnnotations => {
				let p: AnnotationsParams = params(kind, data)?;
				to_value(engine.annotations(p.page_number).await?)
			}
			MessageType::AddAnnotation => {
				let p: AnnotationParams = params(kind, data)?;
				to_value(engine.add_annotation(p.annotation).await?)
			}
			MessageType::UpdateAnnotation => {
				let p: AnnotationParams = params(kind, data)?;
				to_value(engine.update_annotation(p.annotation).await?)
			}
			MessageType::DeleteAnnotation => {
				let p: DeleteAnnotationParams = params(kind, data)?;
				engine.delete_annotation(&p.annotation_id).await?;
				to_value(OperationStatus::ok().with("id", p.annotation_id))
			}
			MessageType::SetZoom => {
				let p: ZoomParams = params(kind, data)?;
				let echo = serde_json::to_value(&p.scale)?;
				soft(engine.set_zoom(&p.scale).await.map(|()| OperationStatus::ok().with("scale", echo)))
			}
			MessageType::RotatePages => {
				let p: RotateParams = params(kind, data)?;
				soft(engine
					.rotate(p.rotation)
					.await
					.map(|()| OperationStatus::ok().with("rotation", p.rotation)))
			}
			MessageType::Download => soft(engine.download().await.map(|()| OperationStatus::ok())),
			MessageType::Print => soft(engine.print().await.map(|()| OperationStatus::ok())),
			MessageType::Ready
			| MessageType::HighlightCreated
			| MessageType::HighlightRemoved
			| MessageType::PageRendered
			| MessageType::PageChanged
			| MessageType::AnnotationAdded
			| MessageType::AnnotationUpdated
			| MessageType::AnnotationDeleted => Err(EngineError::NotARequest(kind.to_string())),
		}
	}

	/// Text of every page; a page whose text cannot be read comes back empty.
	async fn all_text(&self) -> EngineResult<Value> {
		let count = self.engine.page_count().await;
		let mut pages = Vec::with_capacity(count as usize);
		for page in 1..=count {
			let text = match self.engine.page_text(page).await {
				Ok(text) => text,
				Err(e) => {
					tracing::warn!(page, error = %e, "Text extraction failed, using empty text");
					String::new()
				}
			};
			pages.push(PageText { page, text });
		}
		to_value(pages)
	}

	async fn clear_highlights(&self) -> EngineResult<Value> {
		let highlights = self.engine.highlights().await?;
		let mut cleared_count = 0;
		for highlight in highlights {
			match self.engine.remove_highlight(&highlight.id, true).await {
				Ok(true) => cleared_count += 1,
				Ok(false) => {}
				Err(e) => tracing::warn!(id = %highlight.id, error = %e, "Failed to clear highlight"),
			}
		}
		to_value(ClearedHighlights {
			success: true,
			cleared_count,
		})
	}
}
