//! The embedded-context seam.
//!
//! A [`ContextFactory`] creates the element that hosts the viewer inside a
//! container; the resulting [`EmbeddedContext`] owns navigation and the
//! message channel into it.

use pdf_bridge_runtime::{Result, TransportParts};
use url::Url;

use super::options::FrameAttributes;

/// One embedded viewer element.
///
/// The viewer calls into its context without holding its state lock, so an
/// implementation may read the viewer back, such as its options.
/// It must not call `load`, `update_options`, or `destroy` on the same viewer.
pub trait EmbeddedContext: Send {
	/// Identity of the context on the message channel.
	fn id(&self) -> &str;

	/// Host side of the message channel into this context.
	///
	/// Called once per correlator. The channel stays valid across navigations
	/// and reports each completed navigation as a load signal.
	fn attach(&mut self) -> Result<TransportParts>;

	/// Applies presentation changes to the live element.
	fn apply(&mut self, attributes: &FrameAttributes);

	/// Starts loading `url`. Returns once navigation has begun.
	fn navigate(&mut self, url: &Url) -> Result<()>;

	/// Replaces the content with a blank document, releasing the viewer.
	fn blank(&mut self);

	/// Detaches the element from its container.
	fn remove(&mut self);

	fn current_url(&self) -> Option<&Url>;
}

/// Creates embedded contexts inside containers.
pub trait ContextFactory: Send + Sync {
	fn create(&self, container: &str, attributes: &FrameAttributes) -> Result<Box<dyn EmbeddedContext>>;
}
