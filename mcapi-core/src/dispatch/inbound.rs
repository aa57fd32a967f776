//! Sources for the raw body of the incoming webhook request.

/// Where [`super::WebhookDispatcher::receive`] reads the request body from
/// when it is not handed one and has nothing cached.
pub trait InboundBody: Send {
    fn read_body(&mut self) -> Option<String>;
}

impl<F> InboundBody for F
where
    F: FnMut() -> Option<String> + Send,
{
    fn read_body(&mut self) -> Option<String> {
        self()
    }
}

/// A body that was already read by the host's HTTP layer.
#[derive(Debug, Clone)]
pub(super) struct Buffered(pub String);

impl InboundBody for Buffered {
    fn read_body(&mut self) -> Option<String> {
        Some(self.0.clone())
    }
}
