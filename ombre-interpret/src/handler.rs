//! The one-way diagnostic channel between the parser and its host.

/// A feature the core may report as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Feature {
    /// A shading pattern could not be decoded; output was degraded to a
    /// dummy shading.
    ShadingPattern,
}

/// An event sent through the diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// A feature of the document is not supported.
    UnsupportedFeature(Feature),
}

/// A one-way diagnostic channel from the parser to the host.
///
/// Implementations must not block; events carry no response.
pub trait Handler {
    /// Send an event to the host.
    fn send(&self, event: Event);
}

/// A handler that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl Handler for NoopHandler {
    fn send(&self, _: Event) {}
}
