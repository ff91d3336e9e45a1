//! One viewer per container.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use pdf_bridge_runtime::{CorrelatorConfig, Error, Result};

use super::Viewer;
use super::embed::ContextFactory;
use super::options::{ViewerOptions, ViewerOptionsPatch};

pub(crate) struct RegistryInner {
	viewers: DashMap<String, Arc<Viewer>>,
	factory: Arc<dyn ContextFactory>,
	correlator_config: CorrelatorConfig,
}

impl RegistryInner {
	/// Drops `viewer` from the registry if it is still the one registered for `container`.
	pub(crate) fn forget(&self, container: &str, viewer: &Viewer) {
		self.viewers
			.remove_if(container, |_, registered| std::ptr::eq(Arc::as_ptr(registered), viewer));
	}
}

/// Hands out viewers, at most one live instance per container id.
#[derive(Clone)]
pub struct ViewerRegistry {
	inner: Arc<RegistryInner>,
}

impl ViewerRegistry {
	pub fn new(factory: Arc<dyn ContextFactory>) -> Self {
		Self::with_config(factory, CorrelatorConfig::default())
	}

	/// Registry whose viewers use `correlator_config` for their channel.
	pub fn with_config(factory: Arc<dyn ContextFactory>, correlator_config: CorrelatorConfig) -> Self {
		Self {
			inner: Arc::new(RegistryInner {
				viewers: DashMap::new(),
				factory,
				correlator_config,
			}),
		}
	}

	/// Returns the viewer of `container`, creating it on first use.
	///
	/// An existing viewer gets `patch` applied instead of being replaced.
	pub fn get_or_create(&self, container: &str, patch: ViewerOptionsPatch) -> Result<Arc<Viewer>> {
		if container.trim().is_empty() {
			return Err(Error::Validation("container id must not be empty".into()));
		}

		let (viewer, created) = match self.inner.viewers.entry(container.to_string()) {
			Entry::Occupied(mut entry) if entry.get().is_destroyed() => {
				let viewer = self.build(container, patch.clone());
				entry.insert(Arc::clone(&viewer));
				(viewer, true)
			}
			Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
			Entry::Vacant(entry) => {
				let viewer = self.build(container, patch.clone());
				entry.insert(Arc::clone(&viewer));
				(viewer, true)
			}
		};

		if created {
			tracing::debug!(container, "Viewer created");
		} else {
			viewer.update_options(patch)?;
		}
		Ok(viewer)
	}

	fn build(&self, container: &str, patch: ViewerOptionsPatch) -> Arc<Viewer> {
		Arc::new(Viewer::new(
			container,
			ViewerOptions::with(patch),
			Arc::clone(&self.inner.factory),
			self.inner.correlator_config.clone(),
			Arc::downgrade(&self.inner),
		))
	}

	pub fn get(&self, container: &str) -> Option<Arc<Viewer>> {
		self.inner.viewers.get(container).map(|entry| Arc::clone(entry.value()))
	}

	/// Removes and destroys the viewer of `container`.
	pub fn remove(&self, container: &str) -> bool {
		match self.inner.viewers.remove(container) {
			Some((_, viewer)) => {
				viewer.destroy(false);
				true
			}
			None => false,
		}
	}

	pub fn len(&self) -> usize {
		self.inner.viewers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.viewers.is_empty()
	}

	pub fn containers(&self) -> Vec<String> {
		self.inner.viewers.iter().map(|entry| entry.key().clone()).collect()
	}
}

impl std::fmt::Debug for ViewerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ViewerRegistry")
			.field("viewers", &self.len())
			.finish()
	}
}
