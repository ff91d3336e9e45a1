//! Viewer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Color scheme requested from the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Light,
	Dark,
	Auto,
}

impl Theme {
	pub fn as_str(self) -> &'static str {
		match self {
			Theme::Light => "light",
			Theme::Dark => "dark",
			Theme::Auto => "auto",
		}
	}
}

/// Effective options of one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerOptions {
	/// Element id of the frame; derived from the container when absent.
	pub id: Option<String>,
	pub width: String,
	pub height: String,
	pub style: String,
	pub allowfullscreen: bool,

	pub enable_download: bool,
	pub enable_print: bool,
	pub enable_annotations: bool,
	pub enable_text_selection: bool,
	pub enable_zoom: bool,
	pub enable_search: bool,
	pub enable_navigation: bool,

	/// Viewer page, relative to `base_url`.
	pub viewer_path: String,
	/// Base that relative viewer paths and document references resolve against.
	pub base_url: String,
	pub initial_page: Option<u32>,
	pub initial_zoom: Option<String>,
	pub locale: Option<String>,

	pub enable_xfa: bool,
	pub disable_range: bool,
	pub post_message_transfers: bool,
	pub debugger: bool,

	/// Load timeout in milliseconds.
	pub timeout: u64,
	pub theme: Theme,
}

impl Default for ViewerOptions {
	fn default() -> Self {
		Self {
			id: None,
			width: "100%".into(),
			height: "100%".into(),
			style: "border: none;".into(),
			allowfullscreen: true,
			enable_download: true,
			enable_print: true,
			enable_annotations: true,
			enable_text_selection: true,
			enable_zoom: true,
			enable_search: true,
			enable_navigation: true,
			viewer_path: "web/viewer.html".into(),
			base_url: "http://localhost/".into(),
			initial_page: None,
			initial_zoom: None,
			locale: None,
			enable_xfa: true,
			disable_range: true,
			post_message_transfers: true,
			debugger: false,
			timeout: 10_000,
			theme: Theme::Light,
		}
	}
}

/// Caller-supplied overrides. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerOptionsPatch {
	pub id: Option<String>,
	pub width: Option<String>,
	pub height: Option<String>,
	pub style: Option<String>,
	pub allowfullscreen: Option<bool>,
	pub enable_download: Option<bool>,
	pub enable_print: Option<bool>,
	pub enable_annotations: Option<bool>,
	pub enable_text_selection: Option<bool>,
	pub enable_zoom: Option<bool>,
	pub enable_search: Option<bool>,
	pub enable_navigation: Option<bool>,
	pub viewer_path: Option<String>,
	pub base_url: Option<String>,
	pub initial_page: Option<u32>,
	pub initial_zoom: Option<String>,
	pub locale: Option<String>,
	pub enable_xfa: Option<bool>,
	pub disable_range: Option<bool>,
	pub post_message_transfers: Option<bool>,
	pub debugger: Option<bool>,
	pub timeout: Option<u64>,
	pub theme: Option<Theme>,
}

impl ViewerOptionsPatch {
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	/// Returns `true` if the patch touches anything the frame element renders.
	pub fn touches_frame(&self) -> bool {
		self.width.is_some() || self.height.is_some() || self.style.is_some() || self.allowfullscreen.is_some()
	}
}

macro_rules! apply_fields {
	($target:expr, $patch:expr; plain: $($plain:ident),*; optional: $($opt:ident),*) => {
		$(if let Some(value) = $patch.$plain { $target.$plain = value; })*
		$(if let Some(value) = $patch.$opt { $target.$opt = Some(value); })*
	};
}

impl ViewerOptions {
	/// Shallow override: every field set in `patch` replaces the current one.
	pub fn apply(&mut self, patch: ViewerOptionsPatch) {
		apply_fields!(self, patch;
			plain: width, height, style, allowfullscreen, enable_download, enable_print,
				enable_annotations, enable_text_selection, enable_zoom, enable_search,
				enable_navigation, viewer_path, base_url, enable_xfa, disable_range,
				post_message_transfers, debugger, timeout, theme;
			optional: id, initial_page, initial_zoom, locale
		);
	}

	/// Defaults with `patch` applied.
	pub fn with(patch: ViewerOptionsPatch) -> Self {
		let mut options = Self::default();
		options.apply(patch);
		options
	}

	pub fn load_timeout(&self) -> Duration {
		Duration::from_millis(self.timeout)
	}

	/// Attributes of the frame element hosting the viewer.
	pub fn frame_attributes(&self, container: &str) -> FrameAttributes {
		FrameAttributes {
			id: self.id.clone().unwrap_or_else(|| format!("{container}-viewer")),
			width: self.width.clone(),
			height: self.height.clone(),
			style: self.style.clone(),
			allowfullscreen: self.allowfullscreen,
		}
	}
}

/// Element-level presentation of the embedded context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameAttributes {
	pub id: String,
	pub width: String,
	pub height: String,
	pub style: String,
	pub allowfullscreen: bool,
}
