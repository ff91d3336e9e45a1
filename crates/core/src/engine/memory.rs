//! In-memory document engine built from a JSON fixture.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pdf_bridge_protocol::{
	Annotation, DocumentInfo, FindDirection, FindOptions, FindResult, Highlight, OutlineItem, ZoomScale,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{DocumentEngine, EngineError, EngineEvent, EngineResult};

const EVENT_CAPACITY: usize = 256;
const ZOOM_STEP: f64 = 1.1;
const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 10.0;
const NAMED_SCALES: &[&str] = &["auto", "page-actual", "page-fit", "page-width"];

/// Serialized form of a [`MemoryDocument`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentFixture {
	pub title: String,
	pub author: String,
	pub subject: String,
	pub keywords: String,
	pub creator: String,
	pub producer: String,
	pub creation_date: String,
	pub modification_date: String,
	pub pages: Vec<FixturePage>,
	pub outline: Vec<OutlineItem>,
	/// Named destinations mapped to 1-based pages.
	pub destinations: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixturePage {
	pub text: String,
	pub annotations: Vec<Annotation>,
}

#[derive(Debug)]
struct State {
	loaded: bool,
	current_page: u32,
	scale: f64,
	scale_mode: Option<String>,
	rotation: i32,
	search_open: bool,
	highlights: IndexMap<String, Highlight>,
	annotations: Vec<Annotation>,
	broken_pages: HashSet<u32>,
	downloads: u32,
	prints: u32,
}

/// A fully in-memory [`DocumentEngine`].
///
/// Besides the trait operations it exposes hooks that simulate user actions
/// (removing a highlight by hand, a page finishing rendering) so the event path
/// can be exercised without a real renderer.
pub struct MemoryDocument {
	fixture: DocumentFixture,
	state: Mutex<State>,
	events: broadcast::Sender<EngineEvent>,
	next_id: AtomicU64,
}

impl MemoryDocument {
	pub fn new(fixture: DocumentFixture) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		let annotations = fixture
			.pages
			.iter()
			.enumerate()
			.flat_map(|(index, page)| {
				page.annotations.iter().cloned().map(move |mut a| {
					a.page_index = index as u32;
					a
				})
			})
			.collect();
		Self {
			fixture,
			state: Mutex::new(State {
				loaded: false,
				current_page: 1,
				scale: 1.0,
				scale_mode: None,
				rotation: 0,
				search_open: false,
				highlights: IndexMap::new(),
				annotations,
				broken_pages: HashSet::new(),
				downloads: 0,
				prints: 0,
			}),
			events,
			next_id: AtomicU64::new(1),
		}
	}

	/// Parses a fixture from JSON text.
	pub fn from_json(json: &str) -> EngineResult<Self> {
		let fixture: DocumentFixture = serde_json::from_str(json).map_err(|e| EngineError::Load(e.to_string()))?;
		Ok(Self::new(fixture))
	}

	/// Plain document with one page per text.
	pub fn with_pages<I, S>(title: &str, pages: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::new(DocumentFixture {
			title: title.to_string(),
			pages: pages
				.into_iter()
				.map(|text| FixturePage {
					text: text.into(),
					annotations: Vec::new(),
				})
				.collect(),
			..Default::default()
		})
	}

	pub fn scale(&self) -> f64 {
		self.state.lock().scale
	}

	pub fn rotation(&self) -> i32 {
		self.state.lock().rotation
	}

	pub fn downloads(&self) -> u32 {
		self.state.lock().downloads
	}

	pub fn prints(&self) -> u32 {
		self.state.lock().prints
	}

	pub fn is_search_open(&self) -> bool {
		self.state.lock().search_open
	}

	/// Makes text extraction of `page` fail from now on.
	pub fn break_page(&self, page: u32) {
		self.state.lock().broken_pages.insert(page);
	}

	/// Simulates the user deleting a highlight in the viewer UI.
	pub fn user_remove_highlight(&self, id: &str) -> bool {
		self.remove(id, false)
	}

	/// Simulates a page finishing (or failing) rendering.
	pub fn render_page(&self, page_number: u32, error: Option<String>) {
		self.emit(EngineEvent::PageRendered { page_number, error });
	}

	fn page_total(&self) -> u32 {
		self.fixture.pages.len() as u32
	}

	fn emit(&self, event: EngineEvent) {
		// No subscribers is fine.
		let _ = self.events.send(event);
	}

	fn next_id(&self, prefix: &str) -> String {
		let millis = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default();
		format!("{prefix}_{millis}_{}", self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	fn require_loaded(&self) -> EngineResult<()> {
		if self.state.lock().loaded {
			Ok(())
		} else {
			Err(EngineError::NoDocument)
		}
	}

	fn check_page(&self, page: u32) -> EngineResult<()> {
		self.require_loaded()?;
		if page < 1 || page > self.page_total() {
			return Err(EngineError::InvalidPage(page));
		}
		Ok(())
	}

	fn remove(&self, id: &str, cancelled: bool) -> bool {
		let removed = self.state.lock().highlights.shift_remove(id);
		match removed {
			Some(h) => {
				self.emit(EngineEvent::HighlightRemoved {
					id: h.id,
					page: h.page,
					cancelled,
				});
				true
			}
			None => false,
		}
	}

	fn set_page(&self, page: u32) {
		let changed = {
			let mut state = self.state.lock();
			let changed = state.current_page != page;
			state.current_page = page;
			changed
		};
		if changed {
			self.emit(EngineEvent::PageChanged(page));
		}
	}
}

/// Counts non-overlapping matches of `needle` in `haystack`.
fn count_matches(haystack: &str, needle: &str, options: &FindOptions) -> u32 {
	let (haystack, needle) = if options.case_sensitive {
		(haystack.to_string(), needle.to_string())
	} else {
		(haystack.to_lowercase(), needle.to_lowercase())
	};
	haystack
		.match_indices(needle.as_str())
		.filter(|(start, matched)| {
			if !options.whole_word {
				return true;
			}
			let before = haystack[..*start].chars().next_back();
			let after = haystack[start + matched.len()..].chars().next();
			!before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
		})
		.count() as u32
}

#[async_trait]
impl DocumentEngine for MemoryDocument {
	fn events(&self) -> broadcast::Receiver<EngineEvent> {
		self.events.subscribe()
	}

	async fn open(&self) -> EngineResult<()> {
		if self.fixture.pages.is_empty() {
			return Err(EngineError::Load("document has no pages".into()));
		}
		{
			let mut state = self.state.lock();
			state.loaded = true;
			state.current_page = 1;
			state.search_open = false;
		}
		tracing::debug!(title = %self.fixture.title, pages = self.page_total(), "Document opened");
		self.emit(EngineEvent::DocumentLoaded);
		Ok(())
	}

	async fn document_info(&self) -> EngineResult<DocumentInfo> {
		self.require_loaded()?;
		let f = &self.fixture;
		Ok(DocumentInfo {
			title: f.title.clone(),
			author: f.author.clone(),
			subject: f.subject.clone(),
			keywords: f.keywords.clone(),
			creator: f.creator.clone(),
			producer: f.producer.clone(),
			creation_date: f.creation_date.clone(),
			modification_date: f.modification_date.clone(),
			page_count: self.page_total(),
		})
	}

	async fn outline(&self) -> EngineResult<Vec<OutlineItem>> {
		self.require_loaded()?;
		Ok(self.fixture.outline.clone())
	}

	async fn current_page(&self) -> u32 {
		let state = self.state.lock();
		if state.loaded { state.current_page } else { 1 }
	}

	async fn page_count(&self) -> u32 {
		if self.state.lock().loaded { self.page_total() } else { 0 }
	}

	async fn go_to_page(&self, page: u32) -> EngineResult<()> {
		self.check_page(page)?;
		self.set_page(page);
		Ok(())
	}

	async fn navigate_to(&self, dest: &Value) -> EngineResult<()> {
		self.require_loaded()?;
		let page = match dest {
			Value::Number(n) => n.as_u64().map(|n| n as u32),
			Value::String(name) => self.fixture.destinations.get(name).copied(),
			// Explicit destination: [pageIndex, ...]
			Value::Array(parts) => parts.first().and_then(Value::as_u64).map(|i| i as u32 + 1),
			_ => None,
		}
		.ok_or_else(|| EngineError::InvalidDestination(dest.to_string()))?;
		self.check_page(page)?;
		self.set_page(page);
		Ok(())
	}

	async fn page_text(&self, page: u32) -> EngineResult<String> {
		self.check_page(page)?;
		if self.state.lock().broken_pages.contains(&page) {
			return Err(EngineError::Load(format!("text layer of page {page} is unreadable")));
		}
		Ok(self.fixture.pages[page as usize - 1].text.clone())
	}

	async fn find(&self, query: &str, options: FindOptions) -> EngineResult<FindResult> {
		self.require_loaded()?;
		if query.is_empty() {
			return Err(EngineError::EmptyQuery);
		}

		let counts: Vec<u32> = self
			.fixture
			.pages
			.iter()
			.map(|p| count_matches(&p.text, query, &options))
			.collect();
		let matches_count = counts.iter().sum();

		let total = counts.len();
		let start = self.state.lock().current_page as usize - 1;
		let order: Vec<usize> = match options.direction {
			FindDirection::Forward => (0..total).map(|i| (start + i) % total).collect(),
			FindDirection::Backward => (0..total).map(|i| (start + total - i) % total).collect(),
		};
		let page = order.into_iter().find(|&i| counts[i] > 0).map(|i| i as u32 + 1);

		Ok(FindResult {
			found: matches_count > 0,
			page,
			matches_count,
		})
	}

	async fn highlight_text(&self, text: &str, color: &str) -> EngineResult<Highlight> {
		self.require_loaded()?;
		if text.is_empty() {
			return Err(EngineError::EmptyQuery);
		}
		let highlight = Highlight {
			id: self.next_id("highlight"),
			page: self.state.lock().current_page,
			text: text.to_string(),
			color: Some(color.to_string()),
		};
		{
			let mut state = self.state.lock();
			state.search_open = true;
			state.highlights.insert(highlight.id.clone(), highlight.clone());
		}
		self.emit(EngineEvent::HighlightCreated(highlight.clone()));
		Ok(highlight)
	}

	async fn clear_search_highlight(&self) -> EngineResult<()> {
		self.state.lock().search_open = false;
		Ok(())
	}

	async fn highlights(&self) -> EngineResult<Vec<Highlight>> {
		let state = self.state.lock();
		if !state.loaded {
			return Ok(Vec::new());
		}
		Ok(state.highlights.values().cloned().collect())
	}

	async fn remove_highlight(&self, id: &str, cancel_event: bool) -> EngineResult<bool> {
		self.require_loaded()?;
		Ok(self.remove(id, cancel_event))
	}

	async fn annotations(&self, page: u32) -> EngineResult<Vec<Annotation>> {
		self.check_page(page)?;
		let index = page - 1;
		Ok(self
			.state
			.lock()
			.annotations
			.iter()
			.filter(|a| a.page_index == index)
			.cloned()
			.collect())
	}

	async fn add_annotation(&self, mut annotation: Annotation) -> EngineResult<Annotation> {
		self.check_page(annotation.page_index + 1)?;
		if annotation.id.is_empty() {
			annotation.id = self.next_id("annotation");
		}
		self.state.lock().annotations.push(annotation.clone());
		self.emit(EngineEvent::AnnotationAdded(annotation.clone()));
		Ok(annotation)
	}

	async fn update_annotation(&self, annotation: Annotation) -> EngineResult<Annotation> {
		self.check_page(annotation.page_index + 1)?;
		{
			let mut state = self.state.lock();
			let slot = state
				.annotations
				.iter_mut()
				.find(|a| a.id == annotation.id)
				.ok_or_else(|| EngineError::AnnotationNotFound(annotation.id.clone()))?;
			*slot = annotation.clone();
		}
		self.emit(EngineEvent::AnnotationUpdated(annotation.clone()));
		Ok(annotation)
	}

	async fn delete_annotation(&self, id: &str) -> EngineResult<()> {
		self.require_loaded()?;
		{
			let mut state = self.state.lock();
			let before = state.annotations.len();
			state.annotations.retain(|a| a.id != id);
			if state.annotations.len() == before {
				return Err(EngineError::AnnotationNotFound(id.to_string()));
			}
		}
		self.emit(EngineEvent::AnnotationDeleted(id.to_string()));
		Ok(())
	}

	async fn set_zoom(&self, scale: &ZoomScale) -> EngineResult<()> {
		self.require_loaded()?;
		let mut state = self.state.lock();
		match scale {
			ZoomScale::Factor(f) if *f > 0.0 && f.is_finite() => {
				state.scale = f.clamp(MIN_SCALE, MAX_SCALE);
				state.scale_mode = None;
			}
			ZoomScale::Factor(f) => return Err(EngineError::InvalidZoom(f.to_string())),
			ZoomScale::Named(name) if name == "in" => {
				state.scale = (state.scale * ZOOM_STEP).min(MAX_SCALE);
				state.scale_mode = None;
			}
			ZoomScale::Named(name) if name == "out" => {
				state.scale = (state.scale / ZOOM_STEP).max(MIN_SCALE);
				state.scale_mode = None;
			}
			ZoomScale::Named(name) if NAMED_SCALES.contains(&name.as_str()) => {
				if name == "page-actual" {
					state.scale = 1.0;
				}
				state.scale_mode = Some(name.clone());
			}
			ZoomScale::Named(name) => return Err(EngineError::InvalidZoom(name.clone())),
		}
		Ok(())
	}

	async fn rotate(&self, delta: i32) -> EngineResult<()> {
		self.require_loaded()?;
		if delta % 90 != 0 {
			return Err(EngineError::InvalidRotation(delta));
		}
		let mut state = self.state.lock();
		state.rotation = (state.rotation + delta).rem_euclid(360);
		Ok(())
	}

	async fn download(&self) -> EngineResult<()> {
		self.require_loaded()?;
		self.state.lock().downloads += 1;
		Ok(())
	}

	async fn print(&self) -> EngineResult<()> {
		self.require_loaded()?;
		self.state.lock().prints += 1;
		Ok(())
	}
}
