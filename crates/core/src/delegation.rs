//! Host-facing method names and the operations they delegate to.
//!
//! The table is declared once and checked on first use: method names are
//! unique, aliases point at declared methods, and every request type of the
//! catalog is reachable through at least one name.

use std::collections::HashSet;
use std::sync::LazyLock;

use pdf_bridge_protocol::MessageType;
use thiserror::Error;

/// What a method name stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
	/// Sent across the boundary as this request type.
	Request(MessageType),
	/// Another name for a declared method.
	Alias(&'static str),
	/// Runs a manual reconnection episode on the host side.
	Reconnect,
}

/// One declared method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delegate {
	pub method: &'static str,
	pub target: Target,
	/// Field name a bare (non-object) argument is wrapped into, e.g. `goToPage(3)`
	/// becomes `{"pageNumber": 3}`.
	pub arg: Option<&'static str>,
}

/// A method name after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Request {
		kind: MessageType,
		arg: Option<&'static str>,
	},
	Reconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
	#[error("Method declared twice: {0}")]
	Duplicate(&'static str),

	#[error("Alias {alias} points at undeclared method {target}")]
	DanglingAlias {
		alias: &'static str,
		target: &'static str,
	},

	#[error("No method reaches {0}")]
	Unreachable(MessageType),
}

const fn request(method: &'static str, kind: MessageType) -> Delegate {
	Delegate {
		method,
		target: Target::Request(kind),
		arg: None,
	}
}

const fn request_with(method: &'static str, kind: MessageType, arg: &'static str) -> Delegate {
	Delegate {
		method,
		target: Target::Request(kind),
		arg: Some(arg),
	}
}

const fn alias(method: &'static str, of: &'static str) -> Delegate {
	Delegate {
		method,
		target: Target::Alias(of),
		arg: None,
	}
}

/// Declared host methods, in the order they are listed.
pub const DELEGATES: &[Delegate] = &[
	request("getHighlights", MessageType::GetHighlights),
	request("clearHighlights", MessageType::ClearHighlights),
	request_with("clearHighlight", MessageType::ClearHighlight, "id"),
	request("getAllText", MessageType::GetAllText),
	request_with("getPageText", MessageType::GetPageText, "page"),
	request("getCurrentPage", MessageType::GetCurrentPage),
	request("getPageCount", MessageType::GetPageCount),
	request_with("goToPage", MessageType::GoToPage, "pageNumber"),
	request_with("setTextHighlight", MessageType::SetTextHighlight, "text"),
	request("clearTextHighlight", MessageType::ClearTextHighlight),
	request_with("findText", MessageType::FindText, "text"),
	request("getDocumentInfo", MessageType::GetDocumentInfo),
	request("getDocumentOutline", MessageType::GetDocumentOutline),
	request_with("getAnnotations", MessageType::GetAnnotations, "pageNumber"),
	request_with("addAnnotation", MessageType::AddAnnotation, "annotation"),
	request_with("updateAnnotation", MessageType::UpdateAnnotation, "annotation"),
	request_with("deleteAnnotation", MessageType::DeleteAnnotation, "annotationId"),
	request_with("setZoom", MessageType::SetZoom, "scale"),
	request_with("rotatePages", MessageType::RotatePages, "rotation"),
	request("downloadPdf", MessageType::Download),
	request("printPdf", MessageType::Print),
	request("ping", MessageType::Ping),
	request("checkReady", MessageType::CheckReady),
	request_with("navigateTo", MessageType::NavigateTo, "dest"),
	Delegate {
		method: "reconnect",
		target: Target::Reconnect,
		arg: None,
	},
	alias("clearHighlightById", "clearHighlight"),
	alias("clearAllHighlights", "clearHighlights"),
	alias("highlightText", "setTextHighlight"),
];

static TABLE: LazyLock<Result<(), DelegationError>> = LazyLock::new(|| validate(DELEGATES));

/// Checks a delegation table for consistency.
pub fn validate(delegates: &[Delegate]) -> Result<(), DelegationError> {
	let mut names = HashSet::new();
	for delegate in delegates {
		if !names.insert(delegate.method) {
			return Err(DelegationError::Duplicate(delegate.method));
		}
	}

	for delegate in delegates {
		if let Target::Alias(target) = delegate.target {
			let resolves = delegates
				.iter()
				.any(|d| d.method == target && !matches!(d.target, Target::Alias(_)));
			if !resolves {
				return Err(DelegationError::DanglingAlias {
					alias: delegate.method,
					target,
				});
			}
		}
	}

	for kind in MessageType::requests() {
		let reachable = delegates.iter().any(|d| d.target == Target::Request(kind));
		if !reachable {
			return Err(DelegationError::Unreachable(kind));
		}
	}
	Ok(())
}

/// Resolves a host method name, following aliases.
///
/// Returns `Ok(None)` for names that are not declared.
pub fn resolve(method: &str) -> Result<Option<Operation>, DelegationError> {
	if let Err(e) = &*TABLE {
		return Err(e.clone());
	}
	Ok(find(DELEGATES, method))
}

fn find(delegates: &[Delegate], method: &str) -> Option<Operation> {
	let delegate = delegates.iter().find(|d| d.method == method)?;
	match delegate.target {
		Target::Request(kind) => Some(Operation::Request {
			kind,
			arg: delegate.arg,
		}),
		Target::Reconnect => Some(Operation::Reconnect),
		Target::Alias(of) => find(delegates, of),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn declared_table_is_consistent() {
		assert_eq!(validate(DELEGATES), Ok(()));
	}

	#[test]
	fn aliases_resolve_to_their_targets() {
		assert_eq!(resolve("clearHighlightById").unwrap(), resolve("clearHighlight").unwrap());
		assert_eq!(
			resolve("highlightText").unwrap(),
			Some(Operation::Request {
				kind: MessageType::SetTextHighlight,
				arg: Some("text"),
			})
		);
		assert_eq!(resolve("reconnect").unwrap(), Some(Operation::Reconnect));
		assert_eq!(resolve("explode").unwrap(), None);
	}

	#[test]
	fn duplicates_are_rejected() {
		let table = [
			request("ping", MessageType::Ping),
			request("ping", MessageType::CheckReady),
		];
		assert_eq!(validate(&table), Err(DelegationError::Duplicate("ping")));
	}

	#[test]
	fn dangling_and_chained_aliases_are_rejected() {
		let mut table = DELEGATES.to_vec();
		table.push(alias("zap", "nothing"));
		assert_eq!(
			validate(&table),
			Err(DelegationError::DanglingAlias {
				alias: "zap",
				target: "nothing",
			})
		);

		let mut table = DELEGATES.to_vec();
		table.push(alias("wipe", "clearAllHighlights"));
		assert!(matches!(validate(&table), Err(DelegationError::DanglingAlias { alias: "wipe", .. })));
	}

	#[test]
	fn every_request_type_needs_a_name() {
		let table: Vec<_> = DELEGATES
			.iter()
			.copied()
			.filter(|d| d.target != Target::Request(MessageType::Print))
			.collect();
		assert_eq!(validate(&table), Err(DelegationError::Unreachable(MessageType::Print)));
	}
}
