// Shared fixtures for the viewer integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pdf_bridge::{
	CorrelatorConfig, DocumentEngine, EngineError, LoopbackFactory, MemoryDocument, ViewerOptionsPatch, ViewerRegistry,
};

/// Document references containing this marker fail to open.
pub const MISSING: &str = "missing.pdf";

pub fn fast_config() -> CorrelatorConfig {
	CorrelatorConfig {
		request_timeout: Duration::from_secs(1),
		ready_timeout: Duration::from_secs(1),
		probe_timeout: Duration::from_millis(100),
		max_reconnect_attempts: 3,
		reconnect_delay: Duration::from_millis(20),
		reconnect_timeout: Duration::from_secs(1),
	}
}

/// Twelve pages, page `n` reads "page n of the report".
pub fn report() -> Arc<MemoryDocument> {
	Arc::new(MemoryDocument::with_pages(
		"Quarterly report",
		(1..=12).map(|n| format!("page {n} of the report")),
	))
}

/// Load timeout short enough for failure tests.
pub fn quick(timeout_ms: u64) -> ViewerOptionsPatch {
	ViewerOptionsPatch {
		timeout: Some(timeout_ms),
		..Default::default()
	}
}

/// A registry whose frames serve `engine`, except for [`MISSING`] documents.
pub fn setup(engine: Arc<MemoryDocument>) -> (ViewerRegistry, LoopbackFactory) {
	let factory = LoopbackFactory::new(Arc::new(move |document: &str| {
		if document.contains(MISSING) {
			return Err(EngineError::Load(format!("{document} does not exist")));
		}
		Ok(Arc::clone(&engine) as Arc<dyn DocumentEngine>)
	}));
	let registry = ViewerRegistry::with_config(Arc::new(factory.clone()), fast_config());
	(registry, factory)
}
