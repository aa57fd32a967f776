//! Webhook payload parsing.
//!
//! Mailchimp posts webhooks as form-encoded bodies. A usable delivery decodes
//! to a mapping with a string `type` and, optionally, a nested `data`
//! mapping.

use serde_json::Value;

use crate::form::parse_nested;
use crate::objects::{EventType, Payload, WebhookEvent};

/// Why an inbound body did not yield a [`WebhookEvent`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    /// No body was supplied and none was available from the request.
    #[error("empty webhook body")]
    Empty,

    /// The body decoded, but not into a webhook shape.
    #[error("malformed webhook body: {0}")]
    Malformed(&'static str),
}

/// Decode a raw form body into a [`WebhookEvent`].
pub fn parse_webhook(raw: &str) -> Result<WebhookEvent, WebhookError> {
    if raw.is_empty() {
        return Err(WebhookError::Empty);
    }
    let fields = parse_nested(raw);

    let event_type = match fields.get("type") {
        Some(Value::String(name)) if !name.is_empty() => EventType::from(name.as_str()),
        Some(_) => return Err(WebhookError::Malformed("`type` is not a string")),
        None => return Err(WebhookError::Malformed("missing `type`")),
    };
    let data = match fields.get("data") {
        Some(Value::Object(data)) => data.clone(),
        Some(_) => return Err(WebhookError::Malformed("`data` is not a mapping")),
        None => Payload::new(),
    };
    let fired_at = fields
        .get("fired_at")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(WebhookEvent {
        event_type,
        fired_at,
        data,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_subscribe_event() {
        let event = parse_webhook(
            "type=subscribe&fired_at=2009-03-26+21%3A35%3A57&data[id]=8a25ff1d98\
             &data[list_id]=a6b5da1054&data[email]=api%40mailchimp.com\
             &data[merges][FNAME]=Mailchimp&data[merges][INTERESTS]=Group1%2CGroup2",
        )
        .unwrap();
        assert_eq!(event.event_type, EventType::Subscribe);
        assert_eq!(event.fired_at.as_deref(), Some("2009-03-26 21:35:57"));
        assert_eq!(event.data_str("email"), Some("api@mailchimp.com"));
        assert_eq!(
            event.data.get("merges"),
            Some(&json!({"FNAME": "Mailchimp", "INTERESTS": "Group1,Group2"}))
        );
        assert_eq!(event.fields.get("type"), Some(&json!("subscribe")));
    }

    #[test]
    fn test_missing_data_is_empty_mapping() {
        let event = parse_webhook("type=campaign").unwrap();
        assert_eq!(event.event_type, EventType::Campaign);
        assert!(event.data.is_empty());
        assert_eq!(event.fired_at, None);
    }

    #[test]
    fn test_malformed_bodies() {
        assert_eq!(parse_webhook(""), Err(WebhookError::Empty));
        assert!(matches!(
            parse_webhook("not-a-valid-payload"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            parse_webhook("type[x]=1&data[email]=a"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            parse_webhook("type=subscribe&data=plain"),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            parse_webhook("type="),
            Err(WebhookError::Malformed(_))
        ));
    }
}
