//! Error types for the viewer bridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the embedded viewer.
#[derive(Debug, Error)]
pub enum Error {
	/// Invalid container, context, or argument supplied at a call site.
	#[error("Invalid argument: {0}")]
	Validation(String),

	/// No matching response arrived within the request deadline.
	#[error("Request timed out after {timeout_ms}ms: {kind}")]
	Timeout { kind: String, timeout_ms: u64 },

	/// The ready handshake did not complete in time.
	#[error("Viewer did not become ready within {timeout_ms}ms")]
	ReadyTimeout { timeout_ms: u64 },

	/// A `load()` did not reach readiness in time.
	#[error("Viewer load timed out after {timeout_ms}ms")]
	LoadTimeout { timeout_ms: u64 },

	/// The remote operation raised a fault and replied with an error envelope.
	#[error("Remote error: {message}")]
	Remote {
		/// Human-readable error message
		message: String,
		/// Error chain from the viewer side (if available)
		stack: Option<String>,
	},

	/// A reconnection episode ran out of attempts.
	#[error("Connection lost after {attempts} reconnection attempts")]
	ConnectionLost { attempts: u32 },

	/// Operation attempted on, or cancelled by, a torn-down instance.
	#[error("Destroyed: {0}")]
	Destroyed(String),

	/// Request cancelled by a reset or a superseding call.
	#[error("Cancelled: {0}")]
	Cancelled(String),

	/// Transport-level failure.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Malformed or unexpected protocol traffic.
	#[error("Protocol error: {0}")]
	Protocol(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the remote stack trace if this is a Remote error with one.
	pub fn stack_trace(&self) -> Option<&str> {
		match self {
			Error::Remote { stack, .. } => stack.as_deref(),
			_ => None,
		}
	}

	/// Returns true for any of the deadline-related errors.
	pub fn is_timeout(&self) -> bool {
		matches!(
			self,
			Error::Timeout { .. } | Error::ReadyTimeout { .. } | Error::LoadTimeout { .. }
		)
	}

	/// Returns true if the request was cancelled by reset, supersession, or teardown.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled(_) | Error::Destroyed(_))
	}

	/// Returns true if this error came from the viewer side.
	pub fn is_remote(&self) -> bool {
		matches!(self, Error::Remote { .. })
	}
}
