//! Structured output envelope for every `pdfb` command.
//!
//! ## Output Contract
//!
//! Every command produces a result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "call",
//!   "inputs": { "method": "getPageCount", "document": "report.json" },
//!   "data": 12,
//!   "timings": { "durationMs": 14 }
//! }
//! ```
//!
//! On failure:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "call",
//!   "error": {
//!     "code": "REMOTE_ERROR",
//!     "message": "Remote error: Invalid page number: 40",
//!     "details": { "stack": "..." }
//!   }
//! }
//! ```


use std::io::{self, Write};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Current schema version for command output.
///
/// Increment this when making breaking changes to the output structure.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Pretty-printed JSON
	#[default]
	Json,
	/// Newline-delimited JSON (one envelope per line)
	Ndjson,
	/// Human-readable text
	Text,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			"text" => Ok(OutputFormat::Text),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	/// Whether the command succeeded
	pub ok: bool,

	/// Command name (e.g., "methods", "call")
	pub command: String,

	/// Inputs used for this command (for traceability)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inputs: Option<CommandInputs>,

	/// Command-specific result data (only present on success)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Error information (only present on failure)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

/// Inputs that were used for the command
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub document: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub params: Option<serde_json::Value>,
}

/// Error information for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Human-readable error message
	pub message: String,

	/// Additional error details (remote stack, timeout, ...)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Invalid input provided
	InvalidInput,
	/// Method name not in the delegation table
	UnknownMethod,
	/// Request, readiness or load deadline passed
	Timeout,
	/// The viewer answered with an error envelope
	RemoteError,
	/// Channel could not be re-established
	ConnectionLost,
	/// Viewer was destroyed or the request cancelled
	Aborted,
	/// Document fixture could not be read
	DocumentError,
	/// File I/O error
	IoError,
	/// Unknown/internal error
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::UnknownMethod => write!(f, "UNKNOWN_METHOD"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::RemoteError => write!(f, "REMOTE_ERROR"),
			ErrorCode::ConnectionLost => write!(f, "CONNECTION_LOST"),
			ErrorCode::Aborted => write!(f, "ABORTED"),
			ErrorCode::DocumentError => write!(f, "DOCUMENT_ERROR"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	/// Total duration in milliseconds
	pub duration_ms: u64,

	/// Time until the viewer reported ready (if a viewer was loaded)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub load_ms: Option<u64>,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
			load_ms: None,
		}
	}
}

/// Builder for [`CommandResult`]; timing starts when the builder is created.
pub struct ResultBuilder<T: Serialize> {
	schema_version: Option<u32>,
	command: String,
	inputs: Option<CommandInputs>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
	load_ms: Option<u64>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			schema_version: Some(SCHEMA_VERSION),
			command: command.into(),
			inputs: None,
			data: None,
			error: None,
			start_time: Instant::now(),
			load_ms: None,
		}
	}

	pub fn inputs(mut self, inputs: CommandInputs) -> Self {
		self.inputs = Some(inputs);
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
			details: None,
		});
		self
	}

	pub fn command_error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	/// Records how long the viewer took to become ready.
	pub fn load_time(mut self, elapsed: Duration) -> Self {
		self.load_ms = Some(elapsed.as_millis() as u64);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		let mut timings = Timings::from(self.start_time.elapsed());
		timings.load_ms = self.load_ms;

		CommandResult {
			schema_version: self.schema_version,
			ok,
			command: self.command,
			inputs: self.inputs,
			data: self.data,
			error: self.error,
			timings: Some(timings),
		}
	}
}

/// Print a command result in the requested format
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			print_result_text(result);
		}
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			match serde_json::to_value(data) {
				Ok(serde_json::Value::String(text)) => {
					let _ = writeln!(stdout, "{text}");
				}
				Ok(value) => {
					if let Ok(json) = serde_json::to_string_pretty(&value) {
						let _ = writeln!(stdout, "{json}");
					}
				}
				Err(_) => {}
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
		if let Some(ref details) = error.details {
			if let Ok(json) = serde_json::to_string_pretty(details) {
				let _ = writeln!(stdout, "Details: {json}");
			}
		}
	}
}

/// Print an error message to stderr (for human consumption)
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}
