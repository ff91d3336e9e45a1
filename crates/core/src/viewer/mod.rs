//! Host-side facade over one embedded viewer.
//!
//! A [`Viewer`] owns the embedded element, the correlator talking to it, and
//! the facade-level event bus. Instances are handed out by [`ViewerRegistry`],
//! which keeps at most one live viewer per container.

mod embed;
mod locator;
mod options;
mod registry;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pdf_bridge_protocol::MessageType;
use pdf_bridge_runtime::{
	Correlator, CorrelatorConfig, Error, EventBus, ListenerId, RECONNECT_EXHAUSTED, RECONNECT_SUCCESS,
	ReconnectOutcome, Result,
};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use embed::{ContextFactory, EmbeddedContext};
pub use locator::build_viewer_url;
pub use options::{FrameAttributes, Theme, ViewerOptions, ViewerOptionsPatch};
pub use registry::ViewerRegistry;

use crate::client::ViewerClient;
use crate::delegation::{self, Operation};
use registry::RegistryInner;

/// An outstanding `load()` waiting for the ready event.
struct LoadWaiter {
	seq: u64,
	tx: oneshot::Sender<Result<()>>,
	timer: JoinHandle<()>,
}

impl LoadWaiter {
	fn finish(self, result: Result<()>) {
		self.timer.abort();
		// The caller may have stopped waiting.
		let _ = self.tx.send(result);
	}
}

struct ViewerState {
	options: ViewerOptions,
	correlator: Option<Correlator>,
	document: Option<String>,
	load: Option<LoadWaiter>,
}

/// One embedded viewer bound to a container.
pub struct Viewer {
	container: String,
	registry: Weak<RegistryInner>,
	factory: Arc<dyn ContextFactory>,
	correlator_config: CorrelatorConfig,
	state: Mutex<ViewerState>,
	/// Separate from `state` so embedding code never runs under the state lock.
	frame: Mutex<Option<Box<dyn EmbeddedContext>>>,
	events: EventBus,
	ready: AtomicBool,
	destroyed: AtomicBool,
	load_seq: AtomicU64,
}

impl Viewer {
	pub(crate) fn new(
		container: &str,
		options: ViewerOptions,
		factory: Arc<dyn ContextFactory>,
		correlator_config: CorrelatorConfig,
		registry: Weak<RegistryInner>,
	) -> Self {
		Self {
			container: container.to_string(),
			registry,
			factory,
			correlator_config,
			state: Mutex::new(ViewerState {
				options,
				correlator: None,
				document: None,
				load: None,
			}),
			frame: Mutex::new(None),
			events: EventBus::new(),
			ready: AtomicBool::new(false),
			destroyed: AtomicBool::new(false),
			load_seq: AtomicU64::new(0),
		}
	}

	pub fn container(&self) -> &str {
		&self.container
	}

	pub fn options(&self) -> ViewerOptions {
		self.state.lock().options.clone()
	}

	/// Document reference of the most recent load.
	pub fn document(&self) -> Option<String> {
		self.state.lock().document.clone()
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::Acquire)
	}

	/// `true` between the ready event of the current load and the next reload.
	pub fn is_ready(&self) -> bool {
		if !self.ready.load(Ordering::Acquire) {
			return false;
		}
		self.state.lock().correlator.as_ref().is_some_and(Correlator::is_ready)
	}

	fn ensure_alive(&self) -> Result<()> {
		if self.is_destroyed() {
			return Err(Error::Destroyed(format!("viewer for {} was destroyed", self.container)));
		}
		Ok(())
	}

	/// Loads `document` and waits for the viewer to report ready.
	///
	/// Any earlier load still waiting is cancelled. Fails with
	/// [`Error::LoadTimeout`] when the ready event does not arrive within the
	/// configured timeout.
	pub async fn load(self: &Arc<Self>, document: &str) -> Result<()> {
		self.ensure_alive()?;
		let seq = self.load_seq.fetch_add(1, Ordering::AcqRel) + 1;
		self.ready.store(false, Ordering::Release);

		let (url, attributes, timeout_ms) = {
			let state = self.state.lock();
			(
				build_viewer_url(&state.options, document)?,
				state.options.frame_attributes(&self.container),
				state.options.timeout,
			)
		};

		let rx = {
			let mut frame = self.frame.lock();
			// destroy() takes the frame under this lock after raising its flag.
			self.ensure_alive()?;
			if frame.is_none() {
				*frame = Some(self.factory.create(&self.container, &attributes)?);
			}
			let Some(context) = frame.as_mut() else {
				return Err(Error::Protocol("embedded context vanished during load".into()));
			};

			// Wired before navigating so the ready event cannot slip past.
			let needs_correlator = self.state.lock().correlator.is_none();
			if needs_correlator {
				let correlator = Correlator::new(context.attach()?, self.correlator_config.clone());
				self.wire(&correlator);
				self.state.lock().correlator = Some(correlator);
			}

			let rx = {
				let mut state = self.state.lock();
				if let Some(previous) = state.load.take() {
					tracing::debug!(container = %self.container, "Superseding pending load");
					previous.finish(Err(Error::Cancelled("superseded by a newer load".into())));
				}

				let (tx, rx) = oneshot::channel();
				let weak = Arc::downgrade(self);
				let timer = tokio::spawn(async move {
					tokio::time::sleep(std::time::Duration::from_millis(timeout_ms)).await;
					if let Some(viewer) = weak.upgrade() {
						viewer.expire_load(seq, timeout_ms);
					}
				});
				state.load = Some(LoadWaiter { seq, tx, timer });
				state.document = Some(document.to_string());
				rx
			};

			if let Err(e) = context.navigate(&url) {
				let waiter = self.state.lock().load.take_if(|w| w.seq == seq);
				if let Some(waiter) = waiter {
					waiter.timer.abort();
				}
				return Err(e);
			}
			tracing::debug!(container = %self.container, url = %url, "Navigation started");
			rx
		};

		rx.await
			.unwrap_or_else(|_| Err(Error::Destroyed(format!("viewer for {} was destroyed", self.container))))
	}

	/// Loads the most recent document again.
	pub async fn reload(self: &Arc<Self>) -> Result<()> {
		let document = self
			.document()
			.ok_or_else(|| Error::Validation("no document has been loaded".into()))?;
		self.load(&document).await
	}

	/// Forwards correlator notifications to the facade bus and hooks the
	/// ready event up to the pending load.
	fn wire(self: &Arc<Self>, correlator: &Correlator) {
		let bus = correlator.events();

		let weak = Arc::downgrade(self);
		bus.on(MessageType::Ready.as_str(), move |_| {
			if let Some(viewer) = weak.upgrade() {
				viewer.on_ready();
			}
			Ok(())
		});

		let names = MessageType::events()
			.map(MessageType::as_str)
			.chain([RECONNECT_SUCCESS, RECONNECT_EXHAUSTED]);
		for name in names {
			let events = self.events.clone();
			bus.on(name, move |data| {
				events.emit(name, data);
				Ok(())
			});
		}
	}

	fn on_ready(&self) {
		self.ready.store(true, Ordering::Release);
		let waiter = self.state.lock().load.take();
		if let Some(waiter) = waiter {
			tracing::debug!(container = %self.container, seq = waiter.seq, "Load completed");
			waiter.finish(Ok(()));
		}
	}

	fn expire_load(&self, seq: u64, timeout_ms: u64) {
		let waiter = {
			let mut state = self.state.lock();
			let current = state.load.as_ref().is_some_and(|w| w.seq == seq);
			if current { state.load.take() } else { None }
		};
		if let Some(waiter) = waiter {
			tracing::warn!(container = %self.container, timeout_ms, "Viewer load timed out");
			let _ = waiter.tx.send(Err(Error::LoadTimeout { timeout_ms }));
		}
	}

	/// Applies option overrides. Presentation changes reach a live frame immediately.
	pub fn update_options(&self, patch: ViewerOptionsPatch) -> Result<()> {
		self.ensure_alive()?;
		if patch.is_empty() {
			return Ok(());
		}
		let touches_frame = patch.touches_frame();
		let attributes = {
			let mut state = self.state.lock();
			state.options.apply(patch);
			state.options.frame_attributes(&self.container)
		};
		if touches_frame {
			if let Some(frame) = self.frame.lock().as_mut() {
				frame.apply(&attributes);
			}
		}
		Ok(())
	}

	/// Typed operations. Requires a prior [`load`](Self::load).
	pub fn client(&self) -> Result<ViewerClient> {
		self.ensure_alive()?;
		self.state
			.lock()
			.correlator
			.clone()
			.map(ViewerClient::new)
			.ok_or_else(|| Error::Validation("viewer has not been loaded".into()))
	}

	/// Runs a host method by name through the delegation table.
	///
	/// A bare argument is wrapped into the method's parameter object, so
	/// `invoke("goToPage", json!(3))` and `invoke("goToPage", json!({"pageNumber": 3}))`
	/// are equivalent.
	pub async fn invoke(&self, method: &str, params: Value) -> Result<Value> {
		let operation = delegation::resolve(method)
			.map_err(|e| Error::Protocol(e.to_string()))?
			.ok_or_else(|| Error::Validation(format!("Unknown method: {method}")))?;
		let client = self.client()?;
		let correlator = client.correlator();

		match operation {
			Operation::Reconnect => {
				let outcome = match correlator.reconnect().await? {
					ReconnectOutcome::AlreadyReady => "already_ready",
					ReconnectOutcome::Busy => "busy",
					ReconnectOutcome::Reconnected => "reconnected",
				};
				Ok(json!({ "success": true, "outcome": outcome }))
			}
			Operation::Request { kind, arg } => {
				let data = wrap_argument(params, arg);
				let timeout = correlator.config().request_timeout;
				correlator
					.send_request(kind, data, timeout, !kind.bypasses_readiness())
					.await
			}
		}
	}

	/// Subscribes to a facade-level event.
	pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
	where
		F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
	{
		self.events.on(event, listener)
	}

	/// Removes one listener, or every listener of `event` when `id` is `None`.
	pub fn off(&self, event: &str, id: Option<ListenerId>) {
		self.events.off(event, id);
	}

	/// Tears the viewer down. Idempotent.
	///
	/// Pending requests and a pending load fail with [`Error::Destroyed`]. With
	/// `remove_from_registry` the container becomes free for a new viewer.
	pub fn destroy(&self, remove_from_registry: bool) {
		if self.destroyed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.ready.store(false, Ordering::Release);
		self.events.clear();

		let (correlator, waiter) = {
			let mut state = self.state.lock();
			(state.correlator.take(), state.load.take())
		};
		let frame = self.frame.lock().take();
		if let Some(correlator) = correlator {
			correlator.destroy();
		}
		if let Some(waiter) = waiter {
			waiter.finish(Err(Error::Destroyed("viewer destroyed during load".into())));
		}
		if let Some(mut frame) = frame {
			frame.blank();
			frame.remove();
		}

		if remove_from_registry {
			if let Some(registry) = self.registry.upgrade() {
				registry.forget(&self.container, self);
			}
		}
		tracing::debug!(container = %self.container, "Viewer destroyed");
	}
}

impl std::fmt::Debug for Viewer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Viewer")
			.field("container", &self.container)
			.field("ready", &self.ready.load(Ordering::Relaxed))
			.field("destroyed", &self.is_destroyed())
			.finish_non_exhaustive()
	}
}

fn wrap_argument(params: Value, arg: Option<&str>) -> Value {
	match (params, arg) {
		(Value::Null, _) => Value::Null,
		(Value::Object(map), Some(name)) if map.contains_key(name) => Value::Object(map),
		(params, Some(name)) => json!({ name: params }),
		(params, None) => params,
	}
}
