//! The document engine seam.
//!
//! The router never touches document internals. Everything it needs goes
//! through [`DocumentEngine`], and everything the engine wants to announce
//! comes back as [`EngineEvent`]s on a broadcast channel.

mod memory;

use async_trait::async_trait;
use pdf_bridge_protocol::{
	Annotation, DocumentInfo, FindOptions, FindResult, Highlight, OutlineItem, UnknownMessageType, ZoomScale,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::{DocumentFixture, FixturePage, MemoryDocument};

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Faults raised by an engine operation or by request decoding.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("No document loaded")]
	NoDocument,

	#[error("Invalid page number: {0}")]
	InvalidPage(u32),

	#[error("No document loaded or empty search text")]
	EmptyQuery,

	#[error("Annotation not found: {0}")]
	AnnotationNotFound(String),

	#[error("Invalid zoom value: {0}")]
	InvalidZoom(String),

	#[error("Rotation must be a multiple of 90, got {0}")]
	InvalidRotation(i32),

	#[error("Cannot resolve destination: {0}")]
	InvalidDestination(String),

	#[error("Failed to load document: {0}")]
	Load(String),

	#[error("{0} is an event and cannot be requested")]
	NotARequest(String),

	#[error("Invalid parameters for {kind}")]
	InvalidParams {
		kind: String,
		#[source]
		source: serde_json::Error,
	},

	#[error(transparent)]
	UnknownType(#[from] UnknownMessageType),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

/// Something happened inside the engine that the host may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
	DocumentLoaded,
	HighlightCreated(Highlight),
	HighlightRemoved {
		id: String,
		page: u32,
		/// Set when the removal was requested through the bridge itself.
		cancelled: bool,
	},
	PageRendered {
		page_number: u32,
		error: Option<String>,
	},
	PageChanged(u32),
	AnnotationAdded(Annotation),
	AnnotationUpdated(Annotation),
	AnnotationDeleted(String),
}

/// Page, text, search, highlight, and annotation operations of a loaded document.
///
/// Pages are 1-based everywhere except [`Annotation::page_index`].
#[async_trait]
pub trait DocumentEngine: Send + Sync {
	/// Subscribes to engine events. Subscribe before [`open`](Self::open) to see the load.
	fn events(&self) -> broadcast::Receiver<EngineEvent>;

	/// (Re)opens the document and announces [`EngineEvent::DocumentLoaded`].
	async fn open(&self) -> EngineResult<()>;

	async fn document_info(&self) -> EngineResult<DocumentInfo>;

	async fn outline(&self) -> EngineResult<Vec<OutlineItem>>;

	/// Current page, 1 when nothing is loaded.
	async fn current_page(&self) -> u32;

	/// Page count, 0 when nothing is loaded.
	async fn page_count(&self) -> u32;

	async fn go_to_page(&self, page: u32) -> EngineResult<()>;

	async fn navigate_to(&self, dest: &Value) -> EngineResult<()>;

	async fn page_text(&self, page: u32) -> EngineResult<String>;

	async fn find(&self, query: &str, options: FindOptions) -> EngineResult<FindResult>;

	/// Highlights `text` on the current page and announces the new highlight.
	async fn highlight_text(&self, text: &str, color: &str) -> EngineResult<Highlight>;

	/// Closes the search bar highlight.
	async fn clear_search_highlight(&self) -> EngineResult<()>;

	async fn highlights(&self) -> EngineResult<Vec<Highlight>>;

	/// Removes one highlight. Returns `false` if the id is unknown.
	///
	/// `cancel_event` is carried on the resulting [`EngineEvent::HighlightRemoved`].
	async fn remove_highlight(&self, id: &str, cancel_event: bool) -> EngineResult<bool>;

	async fn annotations(&self, page: u32) -> EngineResult<Vec<Annotation>>;

	async fn add_annotation(&self, annotation: Annotation) -> EngineResult<Annotation>;

	async fn update_annotation(&self, annotation: Annotation) -> EngineResult<Annotation>;

	async fn delete_annotation(&self, id: &str) -> EngineResult<()>;

	async fn set_zoom(&self, scale: &ZoomScale) -> EngineResult<()>;

	/// Rotates every page by `delta` degrees.
	async fn rotate(&self, delta: i32) -> EngineResult<()>;

	async fn download(&self) -> EngineResult<()>;

	async fn print(&self) -> EngineResult<()>;
}
