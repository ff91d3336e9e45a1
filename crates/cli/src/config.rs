//! Options and document files given on the command line.

use std::path::Path;

use pdf_bridge::{MemoryDocument, ViewerOptionsPatch};

use crate::error::{CliError, Result};

fn read(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
		path: path.to_path_buf(),
		source,
	})
}

/// Reads a viewer options file (camelCase keys, unknown keys ignored).
pub fn load_options(path: &Path) -> Result<ViewerOptionsPatch> {
	let text = read(path)?;
	serde_json::from_str(&text).map_err(|e| CliError::Config {
		path: path.to_path_buf(),
		message: e.to_string(),
	})
}

/// Options from `path`, or no overrides at all.
pub fn load_options_or_default(path: Option<&Path>) -> Result<ViewerOptionsPatch> {
	match path {
		Some(path) => load_options(path),
		None => Ok(ViewerOptionsPatch::default()),
	}
}

pub fn load_document(path: &Path) -> Result<MemoryDocument> {
	let text = read(path)?;
	let document = MemoryDocument::from_json(&text).map_err(|e| CliError::Document {
		path: path.to_path_buf(),
		message: e.to_string(),
	})?;
	tracing::debug!(path = %path.display(), "Document fixture loaded");
	Ok(document)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use tempfile::NamedTempFile;

	use super::*;

	fn file(contents: &str) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn options_file_is_a_patch() {
		let options = file(r#"{ "width": "640px", "enableDownload": false, "timeout": 2500 }"#);

		let patch = load_options(options.path()).unwrap();

		assert_eq!(patch.width.as_deref(), Some("640px"));
		assert_eq!(patch.enable_download, Some(false));
		assert_eq!(patch.timeout, Some(2500));
		assert!(patch.height.is_none());
	}

	#[test]
	fn malformed_options_name_the_file() {
		let options = file(r#"{ "width": 640 "#);

		let err = load_options(options.path()).unwrap_err();

		assert!(matches!(err, CliError::Config { .. }));
		assert!(err.to_string().contains(&options.path().display().to_string()));
	}

	#[test]
	fn missing_options_file_is_a_read_error() {
		let dir = tempfile::tempdir().unwrap();

		let err = load_options(&dir.path().join("absent.json")).unwrap_err();

		assert!(matches!(err, CliError::ReadFile { .. }));
	}

	#[test]
	fn no_options_file_means_no_overrides() {
		assert!(load_options_or_default(None).unwrap().is_empty());
	}

	#[test]
	fn document_fixture_is_parsed() {
		let fixture = file(r#"{ "title": "Notes", "pages": [{ "text": "one" }, { "text": "two" }] }"#);

		assert!(load_document(fixture.path()).is_ok());

		let broken = file("[1, 2");
		assert!(matches!(load_document(broken.path()), Err(CliError::Document { .. })));
	}
}
