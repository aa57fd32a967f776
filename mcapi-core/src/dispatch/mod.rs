//! Webhook event dispatch.
//!
//! A [`WebhookDispatcher`] belongs to one incoming webhook request: the host
//! creates it when the request arrives, lets interested code
//! [`subscribe`](WebhookDispatcher::subscribe), and drops it when the request
//! is done. Callbacks are one-shot. Once an event is dispatched, every
//! callback registered for its type has been consumed and the type is
//! unsubscribed again.
//!
//! The last raw body is cached, so a subscriber that registers after the
//! body was received still gets it: subscribing replays the cached body.

mod inbound;

pub use inbound::InboundBody;

use std::collections::HashMap;

use mcapi_sdk::objects::{EventType, Payload, WebhookEvent};
use mcapi_sdk::webhook::{WebhookError, parse_webhook};
use tracing::{debug, info, warn};

use inbound::Buffered;

/// A one-shot subscriber, called with the event's `data` mapping.
pub type Callback = Box<dyn FnOnce(&Payload) + Send>;

#[derive(Default)]
pub struct WebhookDispatcher {
    subscriptions: HashMap<EventType, Vec<Callback>>,
    last_received: Option<String>,
    inbound: Option<Box<dyn InboundBody>>,
}

impl WebhookDispatcher {
    /// A dispatcher with no inbound body source; bodies must be passed to
    /// [`receive`](Self::receive).
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher for a request whose body the host has already read.
    pub fn for_body(body: impl Into<String>) -> Self {
        Self::with_inbound(Buffered(body.into()))
    }

    pub fn with_inbound(source: impl InboundBody + 'static) -> Self {
        Self {
            inbound: Some(Box::new(source)),
            ..Self::default()
        }
    }

    /// Register `callback` for the next delivery of `event`, then try to
    /// deliver from the cached or inbound body right away.
    pub fn subscribe<F>(&mut self, event: impl Into<EventType>, callback: F)
    where
        F: FnOnce(&Payload) + Send + 'static,
    {
        let event = event.into();
        debug!(event = %event, "webhook subscription added");
        self.subscriptions
            .entry(event)
            .or_default()
            .push(Box::new(callback));

        if let Err(e) = self.receive(None) {
            debug!(error = %e, "no webhook to replay on subscribe");
        }
    }

    /// Decode a webhook body and dispatch it to the subscribers of its type.
    ///
    /// Without `raw`, the cached body is replayed, or the inbound source is
    /// read if nothing is cached yet. Any non-empty body is cached, valid or
    /// not. Returns the decoded event even when nobody was subscribed.
    pub fn receive(&mut self, raw: Option<&str>) -> Result<WebhookEvent, WebhookError> {
        let input = match raw {
            Some(raw) => raw.to_owned(),
            None => match &self.last_received {
                Some(cached) => cached.clone(),
                None => self
                    .inbound
                    .as_mut()
                    .and_then(|source| source.read_body())
                    .unwrap_or_default(),
            },
        };
        if input.is_empty() {
            return Err(WebhookError::Empty);
        }

        let parsed = parse_webhook(&input);
        self.last_received = Some(input);
        let event = parsed.inspect_err(|e| warn!(error = %e, "ignoring webhook body"))?;

        self.dispatch(&event);
        Ok(event)
    }

    fn dispatch(&mut self, event: &WebhookEvent) {
        let Some(callbacks) = self.subscriptions.remove(&event.event_type) else {
            debug!(event = %event.event_type, "webhook received with no subscribers");
            return;
        };
        info!(
            event = %event.event_type,
            subscribers = callbacks.len(),
            "dispatching webhook"
        );
        for callback in callbacks {
            callback(&event.data);
        }
    }

    /// Callbacks still waiting for `event`.
    pub fn subscriber_count(&self, event: impl Into<EventType>) -> usize {
        self.subscriptions
            .get(&event.into())
            .map_or(0, Vec::len)
    }

    pub fn last_received_payload(&self) -> Option<&str> {
        self.last_received.as_deref()
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscriptions: HashMap<&str, usize> = self
            .subscriptions
            .iter()
            .map(|(event, callbacks)| (event.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("WebhookDispatcher")
            .field("subscriptions", &subscriptions)
            .field("last_received", &self.last_received)
            .field("has_inbound", &self.inbound.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::sync::Arc;

    type Seen = Arc<Mutex<Vec<Value>>>;

    fn recorder(seen: &Seen) -> impl FnOnce(&Payload) + Send + 'static {
        let seen = Arc::clone(seen);
        move |data: &Payload| seen.lock().push(Value::Object(data.clone()))
    }

    #[test]
    fn test_subscriber_invoked_once() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher.subscribe("subscribe", recorder(&seen));

        let event = dispatcher
            .receive(Some("type=subscribe&data[email]=a@b.com"))
            .unwrap();

        assert_eq!(event.event_type, EventType::Subscribe);
        assert_eq!(*seen.lock(), vec![json!({"email": "a@b.com"})]);
        assert_eq!(dispatcher.subscriber_count("subscribe"), 0);

        let replay = dispatcher.receive(None).unwrap();
        assert_eq!(replay.event_type, EventType::Subscribe);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_unsubscribed_event_is_returned_without_dispatch() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher.subscribe("subscribe", recorder(&seen));

        let event = dispatcher
            .receive(Some("type=unsubscribe&data[email]=x@y.com"))
            .unwrap();

        assert_eq!(event.event_type, EventType::Unsubscribe);
        assert_eq!(event.data_str("email"), Some("x@y.com"));
        assert!(seen.lock().is_empty());
        assert_eq!(dispatcher.subscriber_count("subscribe"), 1);
    }

    #[test]
    fn test_malformed_body_is_not_dispatched() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher.subscribe("subscribe", recorder(&seen));

        let result = dispatcher.receive(Some("not-a-valid-payload"));

        assert!(matches!(result, Err(WebhookError::Malformed(_))));
        assert!(seen.lock().is_empty());
        assert_eq!(
            dispatcher.last_received_payload(),
            Some("not-a-valid-payload")
        );
    }

    #[test]
    fn test_wire_name_subscription_matches_typed_event() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher.subscribe(String::from("upemail"), recorder(&seen));

        let event = dispatcher
            .receive(Some("type=upemail&data[new_email]=n%40b.com"))
            .unwrap();

        assert_eq!(event.event_type, EventType::EmailChanged);
        assert_eq!(*seen.lock(), vec![json!({"new_email": "n@b.com"})]);
        assert_eq!(dispatcher.subscriber_count(EventType::EmailChanged), 0);
    }

    #[test]
    fn test_callbacks_run_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = WebhookDispatcher::new();
        for n in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.subscribe(EventType::Profile, move |_: &Payload| order.lock().push(n));
        }
        assert_eq!(dispatcher.subscriber_count("profile"), 3);

        dispatcher.receive(Some("type=profile&data[id]=1")).unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_late_subscriber_gets_cached_body() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher
            .receive(Some("type=cleaned&data[email]=gone@example.com&data[reason]=hard"))
            .unwrap();

        dispatcher.subscribe("cleaned", recorder(&seen));

        assert_eq!(
            *seen.lock(),
            vec![json!({"email": "gone@example.com", "reason": "hard"})]
        );
        assert_eq!(dispatcher.subscriber_count("cleaned"), 0);
    }

    #[test]
    fn test_resubscribe_replays_cached_body() {
        let seen = Seen::default();
        let mut dispatcher = WebhookDispatcher::new();
        dispatcher.receive(Some("type=upemail&data[new_email]=n@example.com")).unwrap();
        dispatcher.subscribe("upemail", recorder(&seen));
        dispatcher.subscribe(EventType::EmailChanged, recorder(&seen));

        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_inbound_body_read_on_subscribe() {
        let seen = Seen::default();
        let reads = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&reads);
        let mut dispatcher = WebhookDispatcher::with_inbound(move || {
            *counter.lock() += 1;
            Some("type=campaign&data[id]=5aa2102003&data[subject]=Test".to_string())
        });

        dispatcher.subscribe("campaign", recorder(&seen));
        dispatcher.receive(None).unwrap();

        assert_eq!(*seen.lock(), vec![json!({"id": "5aa2102003", "subject": "Test"})]);
        assert_eq!(*reads.lock(), 1);
    }

    #[test]
    fn test_for_body_and_empty_input() {
        let mut empty = WebhookDispatcher::new();
        assert_eq!(empty.receive(None), Err(WebhookError::Empty));
        assert_eq!(empty.receive(Some("")), Err(WebhookError::Empty));
        assert_eq!(empty.last_received_payload(), None);

        let mut dispatcher = WebhookDispatcher::for_body("type=subscribe&data[email]=a@b.com");
        let event = dispatcher.receive(None).unwrap();
        assert_eq!(event.data_str("email"), Some("a@b.com"));
    }
}
