//! Wire types shared by the host side and the embedded viewer side.
//!
//! Every unit crossing the boundary is an [`Envelope`]. Its `type` is one of
//! the namespaced strings of the [`MessageType`] catalog, and replies carry an
//! explicit [`Status`] tag instead of relying on the `.error` suffix alone.
//!
//! # Main Types
//!
//! - [`Envelope`] - One message unit, request, reply, or unsolicited event
//! - [`MessageType`] - The closed catalog of request and event types
//! - [`ErrorPayload`] - Body of an error reply
//! - [`types`] - Typed payloads for each operation

pub mod envelope;
pub mod message_type;
pub mod types;

pub use envelope::{ERROR_SUFFIX, Envelope, ErrorPayload, Status};
pub use message_type::{MessageType, UnknownMessageType};
pub use types::*;
