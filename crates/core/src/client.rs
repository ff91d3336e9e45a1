//! Typed request surface over a [`Correlator`].

use std::time::Duration;

use pdf_bridge_protocol::{
	Annotation, AnnotationParams, AnnotationsParams, ClearedHighlights, DeleteAnnotationParams, DocumentInfo,
	FindOptions, FindParams, FindResult, GoToPageParams, Highlight, HighlightIdParams, HighlightOptions,
	HighlightParams, MessageType, NavigateParams, OperationStatus, OutlineItem, PageText, PageTextParams, Pong,
	RotateParams, TextHighlightResult, ZoomParams, ZoomScale,
};
use pdf_bridge_runtime::{Correlator, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Typed operations on a loaded viewer.
///
/// Every call waits for readiness first (except [`ping`](Self::ping) and
/// [`check_ready`](Self::check_ready)) and is bounded by the correlator's
/// request timeout.
#[derive(Clone)]
pub struct ViewerClient {
	correlator: Correlator,
}

impl ViewerClient {
	pub fn new(correlator: Correlator) -> Self {
		Self { correlator }
	}

	pub fn correlator(&self) -> &Correlator {
		&self.correlator
	}

	/// Sends `kind` with `params` and decodes the reply as `R`.
	pub async fn call<P: Serialize, R: DeserializeOwned>(&self, kind: MessageType, params: P) -> Result<R> {
		let data = serde_json::to_value(params)?;
		let reply = self.correlator.request(kind, data).await?;
		serde_json::from_value(reply).map_err(Into::into)
	}

	/// Sends a request without parameters.
	pub async fn call_no_params<R: DeserializeOwned>(&self, kind: MessageType) -> Result<R> {
		self.call(kind, Value::Null).await
	}

	/// Sends a request with an explicit deadline.
	pub async fn call_with_timeout<P: Serialize, R: DeserializeOwned>(
		&self,
		kind: MessageType,
		params: P,
		timeout: Duration,
	) -> Result<R> {
		let data = serde_json::to_value(params)?;
		let reply = self.correlator.send_request(kind, data, timeout, true).await?;
		serde_json::from_value(reply).map_err(Into::into)
	}

	pub async fn document_info(&self) -> Result<DocumentInfo> {
		self.call_no_params(MessageType::GetDocumentInfo).await
	}

	pub async fn document_outline(&self) -> Result<Vec<OutlineItem>> {
		self.call_no_params(MessageType::GetDocumentOutline).await
	}

	pub async fn current_page(&self) -> Result<u32> {
		self.call_no_params(MessageType::GetCurrentPage).await
	}

	pub async fn page_count(&self) -> Result<u32> {
		self.call_no_params(MessageType::GetPageCount).await
	}

	pub async fn go_to_page(&self, page_number: u32) -> Result<OperationStatus> {
		self.call(MessageType::GoToPage, GoToPageParams { page_number }).await
	}

	/// Navigates to a named or explicit destination.
	pub async fn navigate_to(&self, dest: Value) -> Result<OperationStatus> {
		self.call(MessageType::NavigateTo, NavigateParams { dest }).await
	}

	pub async fn all_text(&self) -> Result<Vec<PageText>> {
		self.call_no_params(MessageType::GetAllText).await
	}

	pub async fn page_text(&self, page: u32) -> Result<String> {
		let reply: PageText = self.call(MessageType::GetPageText, PageTextParams { page }).await?;
		Ok(reply.text)
	}

	pub async fn find_text(&self, text: &str, options: FindOptions) -> Result<FindResult> {
		let params = FindParams {
			text: text.to_string(),
			options,
		};
		self.call(MessageType::FindText, params).await
	}

	/// Highlights `text`; `color` defaults to yellow on the viewer side.
	pub async fn set_text_highlight(&self, text: &str, color: Option<&str>) -> Result<TextHighlightResult> {
		let params = HighlightParams {
			text: text.to_string(),
			options: HighlightOptions {
				color: color.map(str::to_string),
			},
		};
		self.call(MessageType::SetTextHighlight, params).await
	}

	pub async fn clear_text_highlight(&self) -> Result<OperationStatus> {
		self.call_no_params(MessageType::ClearTextHighlight).await
	}

	pub async fn highlights(&self) -> Result<Vec<Highlight>> {
		self.call_no_params(MessageType::GetHighlights).await
	}

	pub async fn clear_highlights(&self) -> Result<ClearedHighlights> {
		self.call_no_params(MessageType::ClearHighlights).await
	}

	pub async fn clear_highlight(&self, id: &str) -> Result<OperationStatus> {
		self.call(MessageType::ClearHighlight, HighlightIdParams { id: id.to_string() })
			.await
	}

	pub async fn annotations(&self, page_number: u32) -> Result<Vec<Annotation>> {
		self.call(MessageType::GetAnnotations, AnnotationsParams { page_number })
			.await
	}

	pub async fn add_annotation(&self, annotation: Annotation) -> Result<Annotation> {
		self.call(MessageType::AddAnnotation, AnnotationParams { annotation })
			.await
	}

	pub async fn update_annotation(&self, annotation: Annotation) -> Result<Annotation> {
		self.call(MessageType::UpdateAnnotation, AnnotationParams { annotation })
			.await
	}

	pub async fn delete_annotation(&self, annotation_id: &str) -> Result<OperationStatus> {
		let params = DeleteAnnotationParams {
			annotation_id: annotation_id.to_string(),
		};
		self.call(MessageType::DeleteAnnotation, params).await
	}

	pub async fn set_zoom(&self, scale: ZoomScale) -> Result<OperationStatus> {
		self.call(MessageType::SetZoom, ZoomParams { scale }).await
	}

	pub async fn rotate_pages(&self, rotation: i32) -> Result<OperationStatus> {
		self.call(MessageType::RotatePages, RotateParams { rotation }).await
	}

	pub async fn download(&self) -> Result<OperationStatus> {
		self.call_no_params(MessageType::Download).await
	}

	pub async fn print(&self) -> Result<OperationStatus> {
		self.call_no_params(MessageType::Print).await
	}

	/// Liveness probe; does not wait for readiness.
	pub async fn ping(&self) -> Result<Pong> {
		self.correlator.ping().await
	}

	/// Asks the viewer whether it is ready; does not wait for readiness.
	pub async fn check_ready(&self) -> Result<bool> {
		let timeout = self.correlator.config().probe_timeout;
		let reply = self
			.correlator
			.send_request(MessageType::CheckReady, Value::Null, timeout, false)
			.await?;
		Ok(reply.as_bool().unwrap_or(false))
	}
}

impl std::fmt::Debug for ViewerClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ViewerClient")
			.field("peer", self.correlator.peer())
			.finish()
	}
}
