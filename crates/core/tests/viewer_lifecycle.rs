// Viewer Lifecycle Integration Tests
//
// Drives a host-side Viewer against an in-process router over the loopback
// embedding: load, readiness, timeouts, options, registry, and teardown.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use common::{MISSING, fast_config, quick, report, setup};
use parking_lot::Mutex;
use pdf_bridge::protocol::MessageType;
use pdf_bridge::{
	ContextFactory, EmbeddedContext, Error, FrameAttributes, Result, Viewer, ViewerOptionsPatch, ViewerRegistry,
};
use pdf_bridge_runtime::TransportParts;
use url::Url;

#[tokio::test]
async fn test_load_resolves_on_ready() {
	let (registry, factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();

	let ready_events = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&ready_events);
	viewer.on(MessageType::Ready.as_str(), move |data| {
		assert_eq!(data["numPages"], 12);
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(())
	});

	viewer.load("report.pdf").await.unwrap();

	assert!(viewer.is_ready());
	assert_eq!(ready_events.load(Ordering::SeqCst), 1);

	let frame = factory.frame("reader-viewer").expect("frame created");
	assert_eq!(frame.container, "reader");
	assert_eq!(frame.navigations, 1);
	let url = frame.url.expect("navigated");
	assert!(
		url.query_pairs()
			.any(|(k, v)| k == "file" && v == "http://localhost/report.pdf")
	);
}

#[tokio::test]
async fn test_page_count_after_load() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();
	viewer.load("report.pdf").await.unwrap();

	let client = viewer.client().unwrap();
	assert_eq!(client.page_count().await.unwrap(), 12);
	assert_eq!(client.current_page().await.unwrap(), 1);
}

#[tokio::test]
async fn test_request_issued_before_ready_waits_for_it() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();

	let loading = {
		let viewer = Arc::clone(&viewer);
		tokio::spawn(async move { viewer.load("report.pdf").await })
	};
	// The correlator exists as soon as navigation has started.
	let client = loop {
		match viewer.client() {
			Ok(client) => break client,
			Err(_) => tokio::task::yield_now().await,
		}
	};

	assert_eq!(client.page_count().await.unwrap(), 12);
	loading.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_load_timeout_names_duration() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", quick(150)).unwrap();

	let err = viewer.load(MISSING).await.unwrap_err();

	assert!(matches!(err, Error::LoadTimeout { timeout_ms: 150 }), "got {err:?}");
	assert_eq!(err.to_string(), "Viewer load timed out after 150ms");
	assert!(!viewer.is_ready());
}

#[tokio::test]
async fn test_newer_load_supersedes_pending_one() {
	let (registry, factory) = setup(report());
	let viewer = registry.get_or_create("reader", quick(2_000)).unwrap();

	let first = {
		let viewer = Arc::clone(&viewer);
		tokio::spawn(async move { viewer.load(MISSING).await })
	};
	tokio::time::sleep(Duration::from_millis(30)).await;

	viewer.load("report.pdf").await.unwrap();
	let err = first.await.unwrap().unwrap_err();

	assert!(err.is_cancelled(), "got {err:?}");
	assert_eq!(factory.frame("reader-viewer").unwrap().navigations, 2);
}

#[tokio::test]
async fn test_reload_becomes_ready_again() {
	let engine = report();
	let (registry, factory) = setup(Arc::clone(&engine));
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();

	assert!(matches!(viewer.reload().await, Err(Error::Validation(_))));

	viewer.load("report.pdf").await.unwrap();
	viewer.client().unwrap().go_to_page(7).await.unwrap();

	viewer.reload().await.unwrap();

	assert!(viewer.is_ready());
	assert_eq!(factory.frame("reader-viewer").unwrap().navigations, 2);
	// Reopening the document starts over on the first page.
	assert_eq!(viewer.client().unwrap().current_page().await.unwrap(), 1);
}

#[tokio::test]
async fn test_registry_returns_existing_instance_with_new_options() {
	let (registry, factory) = setup(report());
	let first = registry
		.get_or_create(
			"reader",
			ViewerOptionsPatch {
				width: Some("800px".into()),
				..Default::default()
			},
		)
		.unwrap();
	first.load("report.pdf").await.unwrap();

	let second = registry
		.get_or_create(
			"reader",
			ViewerOptionsPatch {
				width: Some("640px".into()),
				..Default::default()
			},
		)
		.unwrap();

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(registry.len(), 1);
	assert_eq!(second.options().width, "640px");
	assert_eq!(factory.frame("reader-viewer").unwrap().attributes.width, "640px");
	assert_eq!(factory.frame_count(), 1);
}

#[tokio::test]
async fn test_empty_container_is_rejected() {
	let (registry, _factory) = setup(report());

	let err = registry.get_or_create("  ", ViewerOptionsPatch::default()).unwrap_err();

	assert!(matches!(err, Error::Validation(_)));
	assert!(registry.is_empty());
}

#[tokio::test]
async fn test_client_requires_load() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();

	assert!(matches!(viewer.client(), Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_update_options_reaches_live_frame() {
	let (registry, factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();
	viewer.load("report.pdf").await.unwrap();

	viewer
		.update_options(ViewerOptionsPatch {
			height: Some("480px".into()),
			style: Some("border: 1px solid;".into()),
			..Default::default()
		})
		.unwrap();

	let attributes = factory.frame("reader-viewer").unwrap().attributes;
	assert_eq!(attributes.height, "480px");
	assert_eq!(attributes.style, "border: 1px solid;");
	assert_eq!(attributes.width, "100%");
}

#[tokio::test]
async fn test_destroy_rejects_pending_work() {
	let (registry, factory) = setup(report());
	let viewer = registry.get_or_create("reader", quick(5_000)).unwrap();

	let loading = {
		let viewer = Arc::clone(&viewer);
		tokio::spawn(async move { viewer.load(MISSING).await })
	};
	tokio::time::sleep(Duration::from_millis(30)).await;
	let client = viewer.client().unwrap();
	let request = tokio::spawn(async move { client.page_count().await });
	tokio::time::sleep(Duration::from_millis(30)).await;

	viewer.destroy(true);

	let load_err = loading.await.unwrap().unwrap_err();
	assert!(matches!(load_err, Error::Destroyed(_)), "got {load_err:?}");
	let request_err = request.await.unwrap().unwrap_err();
	assert!(matches!(request_err, Error::Destroyed(_)), "got {request_err:?}");

	assert!(viewer.is_destroyed());
	assert!(matches!(viewer.client(), Err(Error::Destroyed(_))));
	assert!(matches!(viewer.load("report.pdf").await, Err(Error::Destroyed(_))));
	assert!(registry.get("reader").is_none());

	let frame = factory.frame("reader-viewer").unwrap();
	assert!(frame.blanked && frame.removed);
}

#[tokio::test]
async fn test_destroy_is_idempotent_and_can_keep_registration() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();
	viewer.load("report.pdf").await.unwrap();

	viewer.destroy(false);
	viewer.destroy(false);
	assert_eq!(registry.len(), 1);

	// A destroyed registration is replaced, not revived.
	let fresh = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();
	assert!(!Arc::ptr_eq(&viewer, &fresh));
	fresh.load("report.pdf").await.unwrap();
	assert_eq!(fresh.client().unwrap().page_count().await.unwrap(), 12);
}

#[tokio::test]
async fn test_registry_remove_destroys_viewer() {
	let (registry, _factory) = setup(report());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();

	assert!(registry.remove("reader"));
	assert!(!registry.remove("reader"));
	assert!(viewer.is_destroyed());
}

type ViewerSlot = Arc<OnceLock<Weak<Viewer>>>;

/// Wraps the loopback embedding and reads the viewer back while navigating.
struct ReadBackFactory {
	inner: Arc<dyn ContextFactory>,
	viewer: ViewerSlot,
	seen: Arc<Mutex<Vec<String>>>,
}

struct ReadBackFrame {
	inner: Box<dyn EmbeddedContext>,
	viewer: ViewerSlot,
	seen: Arc<Mutex<Vec<String>>>,
}

impl ContextFactory for ReadBackFactory {
	fn create(&self, container: &str, attributes: &FrameAttributes) -> Result<Box<dyn EmbeddedContext>> {
		Ok(Box::new(ReadBackFrame {
			inner: self.inner.create(container, attributes)?,
			viewer: Arc::clone(&self.viewer),
			seen: Arc::clone(&self.seen),
		}))
	}
}

impl EmbeddedContext for ReadBackFrame {
	fn id(&self) -> &str {
		self.inner.id()
	}

	fn attach(&mut self) -> Result<TransportParts> {
		self.inner.attach()
	}

	fn apply(&mut self, attributes: &FrameAttributes) {
		self.inner.apply(attributes);
	}

	fn navigate(&mut self, url: &Url) -> Result<()> {
		if let Some(viewer) = self.viewer.get().and_then(Weak::upgrade) {
			let document = viewer.document().unwrap_or_default();
			self.seen.lock().push(format!("{} {document}", viewer.options().width));
		}
		self.inner.navigate(url)
	}

	fn blank(&mut self) {
		self.inner.blank();
	}

	fn remove(&mut self) {
		self.inner.remove();
	}

	fn current_url(&self) -> Option<&Url> {
		self.inner.current_url()
	}
}

#[tokio::test]
async fn test_embedding_can_read_viewer_during_navigation() {
	let (_registry, loopback) = setup(report());
	let slot: ViewerSlot = Arc::new(OnceLock::new());
	let seen = Arc::new(Mutex::new(Vec::new()));
	let factory = ReadBackFactory {
		inner: Arc::new(loopback),
		viewer: Arc::clone(&slot),
		seen: Arc::clone(&seen),
	};
	let registry = ViewerRegistry::with_config(Arc::new(factory), fast_config());
	let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default()).unwrap();
	slot.set(Arc::downgrade(&viewer)).unwrap();

	let loaded = tokio::time::timeout(Duration::from_secs(2), viewer.load("report.pdf")).await;

	assert!(matches!(loaded, Ok(Ok(()))), "got {loaded:?}");
	assert_eq!(*seen.lock(), vec!["100% report.pdf".to_string()]);
	assert_eq!(viewer.client().unwrap().page_count().await.unwrap(), 12);
}
