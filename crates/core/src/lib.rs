//! pdf-bridge - drive an embedded document viewer from the host side
//!
//! The viewer lives in an isolated context that can only be reached by posting
//! JSON envelopes. This crate provides both halves of the conversation:
//!
//! - **Viewer facade**: [`Viewer`] and [`ViewerRegistry`] create the embedded
//!   context, build its locator, wait for readiness, and tear it down
//! - **Typed client**: [`ViewerClient`] wraps every catalog request
//! - **Delegation**: host method names (`goToPage`, `highlightText`, ...)
//!   resolved through a declared table for [`Viewer::invoke`]
//! - **Router**: the viewer-side dispatcher over a [`DocumentEngine`]
//! - **Loopback**: an in-process embedding that serves each frame with a router
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pdf_bridge::{LoopbackFactory, MemoryDocument, ViewerOptionsPatch, ViewerRegistry};
//!
//! let engine = Arc::new(MemoryDocument::with_pages("Report", ["first page", "second page"]));
//! let registry = ViewerRegistry::new(Arc::new(LoopbackFactory::with_engine(engine)));
//! let viewer = registry.get_or_create("reader", ViewerOptionsPatch::default())?;
//! viewer.load("report.pdf").await?;
//! let pages = viewer.client()?.page_count().await?;
//! ```

pub mod client;
pub mod delegation;
pub mod engine;
pub mod loopback;
pub mod router;
pub mod viewer;

pub use client::ViewerClient;
pub use engine::{DocumentEngine, DocumentFixture, EngineError, EngineEvent, EngineResult, FixturePage, MemoryDocument};
pub use loopback::{EngineProvider, FrameRecord, LoopbackFactory};
pub use router::{Router, RouterConfig};
pub use viewer::{
	ContextFactory, EmbeddedContext, FrameAttributes, Theme, Viewer, ViewerOptions, ViewerOptionsPatch, ViewerRegistry,
	build_viewer_url,
};

pub use pdf_bridge_protocol as protocol;
pub use pdf_bridge_runtime::{
	Correlator, CorrelatorConfig, Error, ListenerId, RECONNECT_EXHAUSTED, RECONNECT_SUCCESS, ReconnectOutcome, Result,
};
