//! Viewer locator construction.

use pdf_bridge_runtime::{Error, Result};
use url::Url;

use super::options::{Theme, ViewerOptions};

/// Resolves `reference` to an absolute document locator.
///
/// `http`/`https` references are used as given; anything else is resolved
/// against the configured base.
fn document_url(base: &Url, reference: &str) -> Result<Url> {
	match Url::parse(reference) {
		Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
		_ => base
			.join(reference)
			.map_err(|e| Error::Validation(format!("invalid document reference {reference:?}: {e}"))),
	}
}

/// Builds the locator the embedded context navigates to for `document`.
///
/// Every query value is percent-encoded exactly once.
pub fn build_viewer_url(options: &ViewerOptions, document: &str) -> Result<Url> {
	if document.trim().is_empty() {
		return Err(Error::Validation("document reference is empty".into()));
	}
	let base = Url::parse(&options.base_url)
		.map_err(|e| Error::Validation(format!("invalid base url {:?}: {e}", options.base_url)))?;
	let mut url = base
		.join(&options.viewer_path)
		.map_err(|e| Error::Validation(format!("invalid viewer path {:?}: {e}", options.viewer_path)))?;
	let file = document_url(&base, document)?;

	{
		let mut query = url.query_pairs_mut();
		query.append_pair("file", file.as_str());

		let toggles = [
			("download", options.enable_download),
			("print", options.enable_print),
			("annotations", options.enable_annotations),
			("textSelection", options.enable_text_selection),
			("zoomControls", options.enable_zoom),
			("search", options.enable_search),
			("navigation", options.enable_navigation),
		];
		for (name, enabled) in toggles {
			if !enabled {
				query.append_pair(name, "false");
			}
		}

		if let Some(page) = options.initial_page {
			query.append_pair("page", &page.to_string());
		}
		if let Some(zoom) = &options.initial_zoom {
			query.append_pair("zoom", zoom);
		}
		if let Some(locale) = &options.locale {
			query.append_pair("locale", locale);
		}

		let flags = [
			("enableXfa", options.enable_xfa),
			("disableRange", options.disable_range),
			("postMessageTransfers", options.post_message_transfers),
			("debugger", options.debugger),
		];
		for (name, on) in flags {
			if on {
				query.append_pair(name, "true");
			}
		}

		if options.theme != Theme::Light {
			query.append_pair("theme", options.theme.as_str());
		}
	}
	Ok(url)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::viewer::options::ViewerOptionsPatch;

	fn pairs(url: &Url) -> Vec<(String, String)> {
		url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
	}

	fn get<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
		pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	#[test]
	fn default_locator_carries_file_and_flags() {
		let url = build_viewer_url(&ViewerOptions::default(), "docs/report.pdf").unwrap();
		assert_eq!(url.path(), "/web/viewer.html");

		let pairs = pairs(&url);
		assert_eq!(get(&pairs, "file"), Some("http://localhost/docs/report.pdf"));
		assert_eq!(get(&pairs, "enableXfa"), Some("true"));
		assert_eq!(get(&pairs, "disableRange"), Some("true"));
		assert_eq!(get(&pairs, "postMessageTransfers"), Some("true"));
		assert_eq!(get(&pairs, "debugger"), None);
		assert_eq!(get(&pairs, "download"), None);
		assert_eq!(get(&pairs, "theme"), None);
	}

	#[test]
	fn absolute_documents_are_kept_and_encoded_once() {
		let doc = "https://cdn.example.com/files/a b.pdf?sig=x&y=1";
		let url = build_viewer_url(&ViewerOptions::default(), doc).unwrap();

		let file = get(&pairs(&url), "file").map(str::to_string).unwrap();
		assert_eq!(file, Url::parse(doc).unwrap().as_str());
		assert!(!url.as_str().contains("%2525"), "double encoded: {url}");
	}

	#[test]
	fn options_become_query_parameters() {
		let options = ViewerOptions::with(ViewerOptionsPatch {
			enable_download: Some(false),
			enable_print: Some(false),
			initial_page: Some(5),
			initial_zoom: Some("page-fit".into()),
			locale: Some("de-DE".into()),
			debugger: Some(true),
			theme: Some(Theme::Dark),
			..Default::default()
		});
		let url = build_viewer_url(&options, "report.pdf").unwrap();
		let pairs = pairs(&url);

		assert_eq!(get(&pairs, "download"), Some("false"));
		assert_eq!(get(&pairs, "print"), Some("false"));
		assert_eq!(get(&pairs, "page"), Some("5"));
		assert_eq!(get(&pairs, "zoom"), Some("page-fit"));
		assert_eq!(get(&pairs, "locale"), Some("de-DE"));
		assert_eq!(get(&pairs, "debugger"), Some("true"));
		assert_eq!(get(&pairs, "theme"), Some("dark"));
	}

	#[test]
	fn viewer_path_resolves_against_base() {
		let options = ViewerOptions::with(ViewerOptionsPatch {
			base_url: Some("https://app.test/static/".into()),
			viewer_path: Some("pdfjs/web/viewer.html".into()),
			..Default::default()
		});
		let url = build_viewer_url(&options, "/files/x.pdf").unwrap();
		assert_eq!(url.host_str(), Some("app.test"));
		assert_eq!(url.path(), "/static/pdfjs/web/viewer.html");
		assert_eq!(get(&pairs(&url), "file"), Some("https://app.test/files/x.pdf"));
	}

	#[test]
	fn bad_inputs_are_validation_errors() {
		assert!(matches!(
			build_viewer_url(&ViewerOptions::default(), "  "),
			Err(Error::Validation(_))
		));
		let options = ViewerOptions::with(ViewerOptionsPatch {
			base_url: Some("not a url".into()),
			..Default::default()
		});
		assert!(matches!(build_viewer_url(&options, "a.pdf"), Err(Error::Validation(_))));
	}
}
