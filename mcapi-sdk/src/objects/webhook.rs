//! Inbound webhook objects.
//!
//! See <https://mailchimp.com/developer/marketing/guides/sync-audience-data-webhooks/>.

use super::Payload;

/// The `type` field of an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Subscribe,
    Unsubscribe,
    Profile,
    /// `upemail`: a subscriber changed their email address.
    EmailChanged,
    Cleaned,
    Campaign,
    /// Any type not listed above. Built only through `From`, so a known
    /// name can never end up here.
    Other(UnknownEvent),
}

/// Name of an event type outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownEvent(String);

impl UnknownEvent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Subscribe => "subscribe",
            EventType::Unsubscribe => "unsubscribe",
            EventType::Profile => "profile",
            EventType::EmailChanged => "upemail",
            EventType::Cleaned => "cleaned",
            EventType::Campaign => "campaign",
            EventType::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "subscribe" => EventType::Subscribe,
            "unsubscribe" => EventType::Unsubscribe,
            "profile" => EventType::Profile,
            "upemail" => EventType::EmailChanged,
            "cleaned" => EventType::Cleaned,
            "campaign" => EventType::Campaign,
            other => EventType::Other(UnknownEvent(other.to_owned())),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from(value.as_str())
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_type: EventType,
    /// `fired_at`, as sent (`YYYY-MM-DD HH:MM:SS`, no zone).
    pub fired_at: Option<String>,
    /// The nested `data` mapping handed to subscribers.
    pub data: Payload,
    /// Every decoded field, including `type` and `data`.
    pub fields: Payload,
}

impl WebhookEvent {
    /// Look up a top-level string field of `data`, e.g. `email`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}
