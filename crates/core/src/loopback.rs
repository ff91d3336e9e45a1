//! In-process embedding: every frame is served by a [`Router`] in the same process.
//!
//! Each navigation starts a fresh router over a fresh engine, the way a real
//! embedded context reloads its document. The host end of the channel stays
//! the same across navigations and sees a load signal for each one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use pdf_bridge_runtime::{
	ChannelEvent, ContextId, Error, MemoryEndpoint, MemoryTransport, Result, Transport, TransportParts,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::engine::{DocumentEngine, EngineError};
use crate::router::{Router, RouterConfig};
use crate::viewer::{ContextFactory, EmbeddedContext, FrameAttributes};

/// Opens the engine for a document reference taken from the viewer locator.
pub type EngineProvider = Arc<dyn Fn(&str) -> std::result::Result<Arc<dyn DocumentEngine>, EngineError> + Send + Sync>;

/// What a loopback frame has been asked to do, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
	pub container: String,
	pub attributes: FrameAttributes,
	pub url: Option<Url>,
	pub navigations: u32,
	pub blanked: bool,
	pub removed: bool,
}

/// [`ContextFactory`] backed by in-process routers.
#[derive(Clone)]
pub struct LoopbackFactory {
	provider: EngineProvider,
	router_config: RouterConfig,
	records: Arc<DashMap<String, FrameRecord>>,
}

impl LoopbackFactory {
	pub fn new(provider: EngineProvider) -> Self {
		Self {
			provider,
			router_config: RouterConfig::default(),
			records: Arc::new(DashMap::new()),
		}
	}

	/// Serves every document with the same engine instance.
	pub fn with_engine(engine: Arc<dyn DocumentEngine>) -> Self {
		Self::new(Arc::new(move |_: &str| Ok::<_, EngineError>(Arc::clone(&engine))))
	}

	pub fn router_config(mut self, config: RouterConfig) -> Self {
		self.router_config = config;
		self
	}

	/// Snapshot of the frame with element id `id`.
	pub fn frame(&self, id: &str) -> Option<FrameRecord> {
		self.records.get(id).map(|r| r.value().clone())
	}

	pub fn frame_count(&self) -> usize {
		self.records.len()
	}
}

impl ContextFactory for LoopbackFactory {
	fn create(&self, container: &str, attributes: &FrameAttributes) -> Result<Box<dyn EmbeddedContext>> {
		let id = attributes.id.clone();
		self.records.insert(
			id.clone(),
			FrameRecord {
				container: container.to_string(),
				attributes: attributes.clone(),
				url: None,
				navigations: 0,
				blanked: false,
				removed: false,
			},
		);
		tracing::debug!(container, frame = %id, "Loopback frame created");
		Ok(Box::new(LoopbackFrame::new(id, self.clone())))
	}
}

type Inbox = Arc<Mutex<Option<mpsc::UnboundedSender<ChannelEvent>>>>;

struct LoopbackFrame {
	id: String,
	factory: LoopbackFactory,
	host_end: Option<MemoryEndpoint>,
	viewer: Arc<MemoryTransport>,
	inbox: Inbox,
	router: Arc<Mutex<Option<Router>>>,
	generation: Arc<AtomicU64>,
	relay: JoinHandle<()>,
	loading: Option<JoinHandle<()>>,
	url: Option<Url>,
}

impl LoopbackFrame {
	fn new(id: String, factory: LoopbackFactory) -> Self {
		let (host_end, viewer_end) = MemoryTransport::pair(ContextId::new(format!("host:{id}")), ContextId::new(&id));
		let MemoryEndpoint {
			transport: viewer,
			mut inbound,
		} = viewer_end;

		let inbox: Inbox = Arc::new(Mutex::new(None));
		let relay_inbox = Arc::clone(&inbox);
		// Messages posted while no document is loaded are lost, as they would be
		// for a real frame.
		let relay = tokio::spawn(async move {
			while let Some(event) = inbound.recv().await {
				if let Some(tx) = relay_inbox.lock().as_ref() {
					let _ = tx.send(event);
				}
			}
		});

		Self {
			id,
			factory,
			host_end: Some(host_end),
			viewer,
			inbox,
			router: Arc::new(Mutex::new(None)),
			generation: Arc::new(AtomicU64::new(0)),
			relay,
			loading: None,
			url: None,
		}
	}

	fn unload(&mut self) -> u64 {
		let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
		if let Some(task) = self.loading.take() {
			task.abort();
		}
		*self.inbox.lock() = None;
		self.router.lock().take();
		generation
	}

	fn record(&self, update: impl FnOnce(&mut FrameRecord)) {
		if let Some(mut record) = self.factory.records.get_mut(&self.id) {
			update(&mut record);
		}
	}
}

fn document_reference(url: &Url) -> Option<String> {
	url.query_pairs()
		.find(|(key, _)| key == "file")
		.map(|(_, value)| value.into_owned())
}

impl EmbeddedContext for LoopbackFrame {
	fn id(&self) -> &str {
		&self.id
	}

	fn attach(&mut self) -> Result<TransportParts> {
		self.host_end
			.take()
			.map(MemoryEndpoint::into_parts)
			.ok_or_else(|| Error::Protocol(format!("channel of frame {} is already attached", self.id)))
	}

	fn apply(&mut self, attributes: &FrameAttributes) {
		self.record(|r| r.attributes = attributes.clone());
	}

	fn navigate(&mut self, url: &Url) -> Result<()> {
		let document = document_reference(url)
			.ok_or_else(|| Error::Validation(format!("viewer locator has no document: {url}")))?;
		let generation = self.unload();
		self.url = Some(url.clone());
		self.record(|r| {
			r.url = Some(url.clone());
			r.navigations += 1;
			r.blanked = false;
		});

		let provider = Arc::clone(&self.factory.provider);
		let config = self.factory.router_config.clone();
		let viewer = Arc::clone(&self.viewer);
		let inbox = Arc::clone(&self.inbox);
		let router_slot = Arc::clone(&self.router);
		let current = Arc::clone(&self.generation);
		let frame = self.id.clone();

		self.loading = Some(tokio::spawn(async move {
			let engine = match provider(&document) {
				Ok(engine) => engine,
				Err(e) => {
					tracing::error!(frame = %frame, document = %document, error = %e, "Failed to open document");
					return;
				}
			};
			if let Err(e) = viewer.signal_loaded() {
				tracing::debug!(frame = %frame, error = %e, "Host end is gone");
				return;
			}

			let (tx, rx) = mpsc::unbounded_channel();
			let parts = TransportParts {
				sender: Arc::clone(&viewer) as Arc<dyn Transport>,
				inbound: rx,
			};
			let router = Router::spawn(parts, Arc::clone(&engine), config);
			{
				let mut slot = router_slot.lock();
				if current.load(Ordering::Acquire) != generation {
					return;
				}
				*inbox.lock() = Some(tx);
				*slot = Some(router);
			}

			if let Err(e) = engine.open().await {
				tracing::error!(frame = %frame, error = %e, "Document failed to open");
			}
		}));
		Ok(())
	}

	fn blank(&mut self) {
		self.unload();
		self.url = Url::parse("about:blank").ok();
		self.record(|r| {
			r.url = None;
			r.blanked = true;
		});
	}

	fn remove(&mut self) {
		self.unload();
		self.relay.abort();
		self.record(|r| r.removed = true);
		tracing::debug!(frame = %self.id, "Loopback frame removed");
	}

	fn current_url(&self) -> Option<&Url> {
		self.url.as_ref()
	}
}

impl Drop for LoopbackFrame {
	fn drop(&mut self) {
		self.unload();
		self.relay.abort();
	}
}
