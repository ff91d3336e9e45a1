//! Local publish/subscribe keyed by event-type string.
//!
//! Emission is synchronous and in registration order. The registry lock is
//! released before any listener runs, so listeners may subscribe, unsubscribe,
//! or emit from inside a callback. A listener that fails or panics is logged and
//! skipped; the rest still see the event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

/// Emitted once per reconnection episode when a liveness probe succeeds.
pub const RECONNECT_SUCCESS: &str = "reconnect_success";

/// Emitted once per episode when the attempt limit is reached.
pub const RECONNECT_EXHAUSTED: &str = "reconnect_attempts_exhausted";

/// Registration handle returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A subscribed callback.
pub type ListenerFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
	next_id: AtomicU64,
	listeners: Mutex<IndexMap<String, Vec<(ListenerId, ListenerFn)>>>,
}

/// Cheaply cloneable handle to a shared listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
	inner: Arc<Registry>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes `listener` to `event`.
	///
	/// The same closure may be registered more than once; each registration
	/// gets its own id and is invoked separately.
	pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
	where
		F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
	{
		self.on_arc(event, Arc::new(listener))
	}

	/// Subscribes an already shared listener.
	pub fn on_arc(&self, event: impl Into<String>, listener: ListenerFn) -> ListenerId {
		let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
		self.inner
			.listeners
			.lock()
			.entry(event.into())
			.or_default()
			.push((id, listener));
		id
	}

	/// Unsubscribes one listener, or every listener of `event` when `id` is `None`.
	///
	/// Removing something that is not registered is a no-op.
	pub fn off(&self, event: &str, id: Option<ListenerId>) {
		let mut listeners = self.inner.listeners.lock();
		match id {
			None => {
				listeners.shift_remove(event);
			}
			Some(id) => {
				if let Some(list) = listeners.get_mut(event) {
					list.retain(|(lid, _)| *lid != id);
					if list.is_empty() {
						listeners.shift_remove(event);
					}
				}
			}
		}
	}

	/// Invokes every listener of `event` with `data`.
	///
	/// Returns the number of listeners invoked.
	pub fn emit(&self, event: &str, data: &Value) -> usize {
		let snapshot: Vec<(ListenerId, ListenerFn)> = match self.inner.listeners.lock().get(event) {
			Some(list) => list.clone(),
			None => return 0,
		};

		for (id, listener) in &snapshot {
			match catch_unwind(AssertUnwindSafe(|| listener(data))) {
				Ok(Ok(())) => {}
				Ok(Err(e)) => {
					tracing::error!(error = %e, listener_id = id.0, event, "Event listener failed");
				}
				Err(_) => {
					tracing::error!(listener_id = id.0, event, "Event listener panicked");
				}
			}
		}
		snapshot.len()
	}

	pub fn has_listeners(&self, event: &str) -> bool {
		self.inner.listeners.lock().get(event).is_some_and(|l| !l.is_empty())
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.inner.listeners.lock().get(event).map_or(0, Vec::len)
	}

	/// Event types with at least one listener, in first-subscription order.
	pub fn event_types(&self) -> Vec<String> {
		self.inner.listeners.lock().keys().cloned().collect()
	}

	/// Drops every registration.
	pub fn clear(&self) {
		self.inner.listeners.lock().clear();
	}
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventBus").field("event_types", &self.event_types()).finish()
	}
}
