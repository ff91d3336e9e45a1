//! The message catalog.
//!
//! All types live under the `pdfjs.` namespace. Requests and their replies
//! share a type string; unsolicited events flow from the viewer to the host
//! only and never carry a correlation id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Every envelope type understood by either side of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
	/// Viewer announces it is operational (event).
	Ready,
	/// Asks whether the viewer is ready; answered with a boolean.
	CheckReady,
	/// Liveness probe.
	Ping,

	GetDocumentInfo,
	GetDocumentOutline,
	GetCurrentPage,
	GetPageCount,
	GoToPage,
	NavigateTo,

	GetAllText,
	GetPageText,
	FindText,
	SetTextHighlight,
	ClearTextHighlight,

	GetHighlights,
	ClearHighlights,
	ClearHighlight,

	GetAnnotations,
	AddAnnotation,
	UpdateAnnotation,
	DeleteAnnotation,

	SetZoom,
	RotatePages,

	Download,
	Print,

	HighlightCreated,
	HighlightRemoved,
	PageRendered,
	PageChanged,
	AnnotationAdded,
	AnnotationUpdated,
	AnnotationDeleted,
}

impl MessageType {
	/// All catalog entries in declaration order.
	pub const ALL: [MessageType; 32] = [
		Self::Ready,
		Self::CheckReady,
		Self::Ping,
		Self::GetDocumentInfo,
		Self::GetDocumentOutline,
		Self::GetCurrentPage,
		Self::GetPageCount,
		Self::GoToPage,
		Self::NavigateTo,
		Self::GetAllText,
		Self::GetPageText,
		Self::FindText,
		Self::SetTextHighlight,
		Self::ClearTextHighlight,
		Self::GetHighlights,
		Self::ClearHighlights,
		Self::ClearHighlight,
		Self::GetAnnotations,
		Self::AddAnnotation,
		Self::UpdateAnnotation,
		Self::DeleteAnnotation,
		Self::SetZoom,
		Self::RotatePages,
		Self::Download,
		Self::Print,
		Self::HighlightCreated,
		Self::HighlightRemoved,
		Self::PageRendered,
		Self::PageChanged,
		Self::AnnotationAdded,
		Self::AnnotationUpdated,
		Self::AnnotationDeleted,
	];

	/// Returns the namespaced wire string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ready => "pdfjs.interface.ready",
			Self::CheckReady => "pdfjs.check.ready",
			Self::Ping => "pdfjs.ping",
			Self::GetDocumentInfo => "pdfjs.getDocumentInfo",
			Self::GetDocumentOutline => "pdfjs.getDocumentOutline",
			Self::GetCurrentPage => "pdfjs.getCurrentPage",
			Self::GetPageCount => "pdfjs.getPageCount",
			Self::GoToPage => "pdfjs.goToPage",
			Self::NavigateTo => "pdfjs.navigateTo",
			Self::GetAllText => "pdfjs.getText",
			Self::GetPageText => "pdfjs.getPageText",
			Self::FindText => "pdfjs.findText",
			Self::SetTextHighlight => "pdfjs.setTextHighlight",
			Self::ClearTextHighlight => "pdfjs.clearTextHighlight",
			Self::GetHighlights => "pdfjs.getHighlights",
			Self::ClearHighlights => "pdfjs.clearHighlights",
			Self::ClearHighlight => "pdfjs.clearHighlight",
			Self::GetAnnotations => "pdfjs.getAnnotations",
			Self::AddAnnotation => "pdfjs.addAnnotation",
			Self::UpdateAnnotation => "pdfjs.updateAnnotation",
			Self::DeleteAnnotation => "pdfjs.deleteAnnotation",
			Self::SetZoom => "pdfjs.setZoom",
			Self::RotatePages => "pdfjs.rotatePages",
			Self::Download => "pdfjs.downloadPdf",
			Self::Print => "pdfjs.printPdf",
			Self::HighlightCreated => "pdfjs.highlightCreated",
			Self::HighlightRemoved => "pdfjs.highlightRemoved",
			Self::PageRendered => "pdfjs.pageRendered",
			Self::PageChanged => "pdfjs.pageChanged",
			Self::AnnotationAdded => "pdfjs.annotationAdded",
			Self::AnnotationUpdated => "pdfjs.annotationUpdated",
			Self::AnnotationDeleted => "pdfjs.annotationDeleted",
		}
	}

	/// Returns `true` for viewer-to-host notifications that are never requested.
	pub const fn is_event(self) -> bool {
		matches!(
			self,
			Self::Ready
				| Self::HighlightCreated
				| Self::HighlightRemoved
				| Self::PageRendered
				| Self::PageChanged
				| Self::AnnotationAdded
				| Self::AnnotationUpdated
				| Self::AnnotationDeleted
		)
	}

	/// Returns `true` for requests that must not wait for readiness.
	///
	/// These are also the types whose timeouts never start a reconnection
	/// episode, since the episode itself is driven by them.
	pub const fn bypasses_readiness(self) -> bool {
		matches!(self, Self::Ping | Self::CheckReady)
	}

	/// Iterates over the request half of the catalog.
	pub fn requests() -> impl Iterator<Item = MessageType> {
		Self::ALL.into_iter().filter(|t| !t.is_event())
	}

	/// Iterates over the event half of the catalog.
	pub fn events() -> impl Iterator<Item = MessageType> {
		Self::ALL.into_iter().filter(|t| t.is_event())
	}
}

impl fmt::Display for MessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when a type string is not part of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageType(pub String);

impl fmt::Display for UnknownMessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown message type: {}", self.0)
	}
}

impl std::error::Error for UnknownMessageType {}

impl FromStr for MessageType {
	type Err = UnknownMessageType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| UnknownMessageType(s.to_string()))
	}
}

impl Serialize for MessageType {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for MessageType {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_strings_are_unique_and_parse_back() {
		let mut seen = std::collections::HashSet::new();
		for t in MessageType::ALL {
			assert!(seen.insert(t.as_str()), "duplicate wire string {}", t);
			assert_eq!(t.as_str().parse::<MessageType>().unwrap(), t);
		}
	}

	#[test]
	fn bypass_types_are_probe_and_ready_check() {
		let bypass: Vec<_> = MessageType::ALL.into_iter().filter(|t| t.bypasses_readiness()).collect();
		assert_eq!(bypass, vec![MessageType::CheckReady, MessageType::Ping]);
	}

	#[test]
	fn catalog_splits_into_requests_and_events() {
		assert_eq!(MessageType::events().count(), 8);
		assert_eq!(MessageType::requests().count(), 24);
		assert!(MessageType::requests().all(|t| !t.is_event()));
	}

	#[test]
	fn unknown_type_is_rejected() {
		let err = "pdfjs.bogus".parse::<MessageType>().unwrap_err();
		assert_eq!(err.to_string(), "Unknown message type: pdfjs.bogus");
	}
}
