//! The envelope exchanged across the boundary.
//!
//! ```text
//! { "type": "pdfjs.goToPage", "data": {"pageNumber": 3}, "requestId": "pdfjs.goToPage_..." }
//! { "type": "pdfjs.goToPage", "data": {"success": true, "page": 3}, "requestId": "...", "status": "ok" }
//! { "type": "pdfjs.goToPage.error", "data": {"message": "..."}, "requestId": "...", "status": "error" }
//! ```
//!
//! Error replies keep the `.error` suffix on the type for peers that only look
//! at the type string, but [`Status`] is what both sides of this crate use to
//! tell success from failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message_type::MessageType;

/// Suffix appended to the request type on error replies.
pub const ERROR_SUFFIX: &str = ".error";

/// Outcome tag carried by every envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	#[default]
	Ok,
	Error,
}

impl Status {
	fn is_ok(&self) -> bool {
		matches!(self, Status::Ok)
	}
}

/// Body of an error reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// One message unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
	/// Namespaced type string. Kept as a string so unknown types survive decoding.
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub data: Value,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	#[serde(default, skip_serializing_if = "Status::is_ok")]
	pub status: Status,
}

impl Envelope {
	/// Builds a request envelope.
	pub fn request(kind: MessageType, data: Value, request_id: impl Into<String>) -> Self {
		Self {
			kind: kind.as_str().to_string(),
			data,
			request_id: Some(request_id.into()),
			status: Status::Ok,
		}
	}

	/// Builds an unsolicited event envelope.
	pub fn event(kind: MessageType, data: Value) -> Self {
		Self {
			kind: kind.as_str().to_string(),
			data,
			request_id: None,
			status: Status::Ok,
		}
	}

	/// Builds a success reply to a request of type `kind`.
	pub fn reply(kind: &str, data: Value, request_id: impl Into<String>) -> Self {
		Self {
			kind: kind.to_string(),
			data,
			request_id: Some(request_id.into()),
			status: Status::Ok,
		}
	}

	/// Builds an error reply to a request of type `kind`.
	pub fn error_reply(kind: &str, error: ErrorPayload, request_id: impl Into<String>) -> Self {
		Self {
			kind: format!("{kind}{ERROR_SUFFIX}"),
			data: serde_json::to_value(error).unwrap_or(Value::Null),
			request_id: Some(request_id.into()),
			status: Status::Error,
		}
	}

	/// Parses the type string against the catalog.
	pub fn message_type(&self) -> Option<MessageType> {
		self.kind.parse().ok()
	}

	/// Returns `true` if this envelope is an error reply.
	pub fn is_error(&self) -> bool {
		self.status == Status::Error
	}

	/// Splits the envelope into its tagged outcome.
	///
	/// Error bodies that do not decode as [`ErrorPayload`] are reported with a
	/// generic message rather than being treated as success.
	pub fn into_outcome(self) -> Result<Value, ErrorPayload> {
		match self.status {
			Status::Ok => Ok(self.data),
			Status::Error => Err(serde_json::from_value(self.data).unwrap_or_else(|_| ErrorPayload {
				message: "Unknown error".to_string(),
				stack: None,
			})),
		}
	}

	/// Decodes an envelope from a raw JSON value.
	///
	/// Returns `None` for values without a non-empty string `type`.
	pub fn from_value(value: Value) -> Option<Self> {
		let kind = value.get("type")?.as_str()?;
		if kind.is_empty() {
			return None;
		}
		serde_json::from_value(value).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn request_serializes_with_camel_case_id() {
		let env = Envelope::request(MessageType::GoToPage, json!({"pageNumber": 3}), "abc");
		let value = serde_json::to_value(&env).unwrap();
		assert_eq!(value, json!({"type": "pdfjs.goToPage", "data": {"pageNumber": 3}, "requestId": "abc"}));
	}

	#[test]
	fn error_reply_is_tagged_and_suffixed() {
		let env = Envelope::error_reply(
			"pdfjs.goToPage",
			ErrorPayload {
				message: "Invalid page number: 99".into(),
				stack: None,
			},
			"abc",
		);
		assert_eq!(env.kind, "pdfjs.goToPage.error");
		assert!(env.is_error());
		let err = env.into_outcome().unwrap_err();
		assert_eq!(err.message, "Invalid page number: 99");
	}

	#[test]
	fn status_decides_outcome_not_the_suffix() {
		let env: Envelope = serde_json::from_value(json!({
			"type": "pdfjs.getText.error",
			"data": [1, 2],
			"requestId": "x"
		}))
		.unwrap();
		assert_eq!(env.into_outcome().unwrap(), json!([1, 2]));
	}

	#[test]
	fn from_value_requires_a_type() {
		assert!(Envelope::from_value(json!({"data": 1})).is_none());
		assert!(Envelope::from_value(json!({"type": ""})).is_none());
		assert!(Envelope::from_value(json!({"type": 7})).is_none());
		let env = Envelope::from_value(json!({"type": "pdfjs.ping"})).unwrap();
		assert_eq!(env.message_type(), Some(MessageType::Ping));
		assert_eq!(env.data, Value::Null);
	}
}
