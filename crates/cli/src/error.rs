use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("unknown method: {0}")]
	UnknownMethod(String),

	#[error("invalid params: {0}")]
	InvalidParams(String),

	#[error("failed to read {path}")]
	ReadFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid viewer options in {path}: {message}")]
	Config { path: PathBuf, message: String },

	#[error("invalid document fixture {path}: {message}")]
	Document { path: PathBuf, message: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Bridge(#[from] pdf_bridge::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn to_command_error(&self) -> CommandError {
		let (code, message, details) = match self {
			CliError::UnknownMethod(method) => (
				ErrorCode::UnknownMethod,
				format!("Unknown method: {method}. Run `pdfb methods` for the list."),
				Some(json!({ "method": method })),
			),
			CliError::InvalidParams(msg) => (ErrorCode::InvalidInput, format!("Invalid params: {msg}"), None),
			CliError::ReadFile { path, source } => (
				ErrorCode::IoError,
				format!("Failed to read {}: {source}", path.display()),
				Some(json!({ "path": path })),
			),
			CliError::Config { path, message } => (
				ErrorCode::InvalidInput,
				format!("Invalid viewer options in {}: {message}", path.display()),
				Some(json!({ "path": path })),
			),
			CliError::Document { path, message } => (
				ErrorCode::DocumentError,
				format!("Invalid document fixture {}: {message}", path.display()),
				Some(json!({ "path": path })),
			),
			CliError::Io(e) => (ErrorCode::IoError, e.to_string(), None),
			CliError::Json(e) => (ErrorCode::InvalidInput, e.to_string(), None),
			CliError::Bridge(e) => return bridge_error(e),
			CliError::Anyhow(e) => (ErrorCode::InternalError, format!("{e:#}"), None),
		};

		CommandError { code, message, details }
	}
}

fn bridge_error(error: &pdf_bridge::Error) -> CommandError {
	use pdf_bridge::Error;

	let (code, details) = match error {
		Error::Validation(_) => (ErrorCode::InvalidInput, None),
		Error::Timeout { kind, timeout_ms } => (
			ErrorCode::Timeout,
			Some(json!({ "kind": kind, "timeoutMs": timeout_ms })),
		),
		Error::ReadyTimeout { timeout_ms } | Error::LoadTimeout { timeout_ms } => {
			(ErrorCode::Timeout, Some(json!({ "timeoutMs": timeout_ms })))
		}
		Error::Remote { stack, .. } => (
			ErrorCode::RemoteError,
			stack.as_ref().map(|stack| json!({ "stack": stack })),
		),
		Error::ConnectionLost { attempts } => (ErrorCode::ConnectionLost, Some(json!({ "attempts": attempts }))),
		Error::Destroyed(_) | Error::Cancelled(_) => (ErrorCode::Aborted, None),
		Error::Io(_) => (ErrorCode::IoError, None),
		_ => (ErrorCode::InternalError, None),
	};

	CommandError {
		code,
		message: error.to_string(),
		details,
	}
}
