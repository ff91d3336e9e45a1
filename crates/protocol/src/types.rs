//! Typed payloads for requests, replies, and events.
//!
//! Field names follow the camelCase wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default highlight color when a request does not specify one.
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFFF00";

/// Payload of the ready event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyInfo {
	#[serde(default)]
	pub version: Option<String>,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub num_pages: u32,
}

/// Reply to a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
	pub pong: bool,
	/// Milliseconds since the Unix epoch on the viewer side.
	pub timestamp: u64,
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentInfo {
	pub title: String,
	pub author: String,
	pub subject: String,
	pub keywords: String,
	pub creator: String,
	pub producer: String,
	pub creation_date: String,
	pub modification_date: String,
	pub page_count: u32,
}

/// Node of the document outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineItem {
	pub title: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dest: Option<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub items: Vec<OutlineItem>,
}

/// Parameters of `go-to-page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoToPageParams {
	pub page_number: u32,
}

/// Parameters of `get-page-text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTextParams {
	pub page: u32,
}

/// Text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
	pub page: u32,
	pub text: String,
}

/// Search direction for `find-text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindDirection {
	#[default]
	Forward,
	Backward,
}

/// Options of `find-text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindOptions {
	pub direction: FindDirection,
	pub case_sensitive: bool,
	pub whole_word: bool,
}

/// Parameters of `find-text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindParams {
	pub text: String,
	#[serde(default)]
	pub options: FindOptions,
}

/// Reply to `find-text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
	pub found: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page: Option<u32>,
	pub matches_count: u32,
}

/// Options of `set-text-highlight`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

/// Parameters of `set-text-highlight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightParams {
	pub text: String,
	#[serde(default)]
	pub options: HighlightOptions,
}

/// A highlight as stored by the document engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
	pub id: String,
	pub page: u32,
	#[serde(default)]
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

/// Reply to `set-text-highlight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextHighlightResult {
	pub success: bool,
	pub id: String,
	pub text: String,
	pub page: u32,
	pub color: String,
}

/// Parameters of `clear-highlight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightIdParams {
	pub id: String,
}

/// Reply to `clear-highlights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedHighlights {
	pub success: bool,
	pub cleared_count: u32,
}

/// Payload of the `highlight-removed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRemoved {
	pub id: String,
	pub page: u32,
}

/// Generic acknowledgement used by most mutating operations.
///
/// Operations that fail softly report `success: false` with an `error` text
/// instead of an error reply; the extra fields carry operation-specific echoes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, Value>,
}

impl OperationStatus {
	pub fn ok() -> Self {
		Self {
			success: true,
			error: None,
			extra: serde_json::Map::new(),
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			success: false,
			error: Some(error.into()),
			extra: serde_json::Map::new(),
		}
	}

	/// Adds an echoed field, e.g. `page` or `scale`.
	pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.extra.insert(key.to_string(), value.into());
		self
	}
}

/// An annotation on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
	#[serde(default)]
	pub id: String,
	#[serde(rename = "type", default)]
	pub subtype: String,
	#[serde(default)]
	pub rect: Vec<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contents: Option<String>,
	#[serde(default)]
	pub page_index: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<Vec<u8>>,
}

/// Parameters of `get-annotations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationsParams {
	pub page_number: u32,
}

/// Parameters of `add-annotation` and `update-annotation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationParams {
	pub annotation: Annotation,
}

/// Parameters of `delete-annotation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAnnotationParams {
	pub annotation_id: String,
}

/// Payload of the `annotation-deleted` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDeleted {
	pub id: String,
}

/// Zoom target of `set-zoom`: a numeric scale or a named mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoomScale {
	Factor(f64),
	/// `"in"`, `"out"`, `"auto"`, `"page-fit"`, `"page-width"`, ...
	Named(String),
}

/// Parameters of `set-zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomParams {
	pub scale: ZoomScale,
}

/// Parameters of `rotate-pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateParams {
	/// Rotation delta in degrees, a multiple of 90.
	pub rotation: i32,
}

/// Parameters of `navigate-to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateParams {
	pub dest: Value,
}

/// Payload of the `page-rendered` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRendered {
	pub page_number: u32,
	#[serde(default)]
	pub error: Option<String>,
}
