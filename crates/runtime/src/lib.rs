//! Viewer bridge runtime - transport, correlation, readiness, and reconnection
//!
//! This crate provides the host-side protocol machinery for driving a document
//! viewer that lives in an isolated embedded context:
//!
//! - **Transport**: One-way envelope delivery in each direction (in-memory or pipe)
//! - **Event bus**: Local synchronous pub/sub with per-listener failure isolation
//! - **Correlator**: Correlation ids, pending-request bookkeeping, timeouts
//! - **Readiness**: The ready handshake with idempotent single-fire completion
//! - **Reconnection**: Bounded liveness-probe retries after a suspected outage
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  pdf-bridge  │  Facade, router, typed operations
//! └──────┬───────┘
//!        │ sends requests, listens for events
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Corr.  │  │  Request/response correlation + readiness + reconnect
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Bus    │  │  Listener registry
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  Memory/pipe transport
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod correlator;
pub mod error;
pub mod events;
pub mod transport;

pub use correlator::{Correlator, CorrelatorConfig, ReconnectOutcome, ReconnectSnapshot};
pub use error::{Error, Result};
pub use events::{EventBus, ListenerFn, ListenerId, RECONNECT_EXHAUSTED, RECONNECT_SUCCESS};
pub use transport::{
	ChannelEvent, ContextId, MemoryEndpoint, MemoryTransport, Packet, PipeTransport, PipeTransportReceiver, Transport,
	TransportParts,
};
