//! reqwest-backed [`ApiClient`] for the Mailchimp API.
//!
//! Gated behind the `client` cargo feature.

mod exchange;

pub use exchange::{RequestRecord, ResponseRecord};

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ApiClient, ApiResponse, ClientError, DEFAULT_TIMEOUT};
use crate::config::{ClientConfig, endpoint_for_key};
use crate::form::encode_nested;
use crate::objects::{Payload, Verb};
use exchange::Exchange;

const MEDIA_TYPE: &str = "application/vnd.api+json";

/// HTTP client for the Mailchimp Marketing API.
///
/// Every request authenticates with HTTP Basic auth (`user:<api_key>`). The
/// outcome of the most recent call is kept for introspection through
/// [`success`](Self::success), [`last_error`](Self::last_error),
/// [`last_request`](Self::last_request) and
/// [`last_response`](Self::last_response).
pub struct MailchimpClient {
    http: Client,
    api_key: String,
    endpoint: Url,
    default_timeout: Duration,
    exchange: Mutex<Exchange>,
}

impl MailchimpClient {
    /// Create a client whose endpoint is derived from the key's datacenter
    /// suffix (`…-us6` → `https://us6.api.mailchimp.com/3.0`).
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        let endpoint = endpoint_for_key(&api_key)?;
        Ok(Self::with_endpoint(api_key, endpoint))
    }

    /// Create a client for an explicit API root.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            endpoint,
            default_timeout: DEFAULT_TIMEOUT,
            exchange: Mutex::new(Exchange::default()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let endpoint = config.resolve_endpoint()?;
        let http = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;
        let mut client = Self::with_endpoint(config.api_key.clone(), endpoint).with_http_client(http);
        client.default_timeout = config.timeout();
        Ok(client)
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn api_endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Timeout to pass when the caller has no preference.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn subscriber_hash(&self, email: &str) -> String {
        crate::subscriber::subscriber_hash(email)
    }

    /// Whether the last request got a 2xx answer.
    pub fn success(&self) -> bool {
        self.exchange.lock().success
    }

    /// Transport error message, or `"<status>: <detail>"` for a failed API
    /// call.
    pub fn last_error(&self) -> Option<String> {
        self.exchange.lock().error.clone()
    }

    pub fn last_request(&self) -> Option<RequestRecord> {
        self.exchange.lock().request.clone()
    }

    pub fn last_response(&self) -> Option<ResponseRecord> {
        self.exchange.lock().response.clone()
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        let root = self.endpoint.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/{}", path.trim_start_matches('/')))?)
    }

    fn record_error(&self, message: String) {
        self.exchange.lock().error = Some(message);
    }
}

impl std::fmt::Debug for MailchimpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailchimpClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ApiClient for MailchimpClient {
    async fn request(
        &self,
        verb: Verb,
        path: &str,
        args: Option<&Payload>,
        timeout: Duration,
    ) -> Result<ApiResponse, ClientError> {
        self.exchange.lock().reset();

        let mut url = self.url_for(path)?;
        let mut body = None;
        match args.filter(|a| !a.is_empty()) {
            Some(args) if verb == Verb::Get => append_query(&mut url, args),
            Some(args) => body = Some(serde_json::to_string(args)?),
            None => {}
        }

        let mut builder = self
            .http
            .request(method_for(verb), url.clone())
            .basic_auth("user", Some(&self.api_key))
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .timeout(timeout);
        if let Some(body) = &body {
            builder = builder.body(body.clone());
        }

        self.exchange.lock().request = Some(RequestRecord {
            verb,
            url: url.clone(),
            timeout,
            body,
        });

        debug!(%verb, %url, "sending API request");
        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%verb, %url, error = %e, "API request failed");
                self.record_error(e.to_string());
                return Err(e.into());
            }
        };

        let status = resp.status();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    value.to_str().unwrap_or_default().to_owned(),
                )
            })
            .collect();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(%verb, %url, error = %e, "failed to read API response body");
                self.record_error(e.to_string());
                return Err(e.into());
            }
        };

        let response = ApiResponse::new(status.as_u16(), decode_body(&text));
        debug!(%verb, %url, status = response.status, "received API response");

        let mut exchange = self.exchange.lock();
        exchange.success = response.is_success();
        if !exchange.success {
            let message = response
                .problem()
                .map(|problem| problem.to_string())
                .unwrap_or_else(|| format!("{}: unknown error", response.status));
            warn!(%verb, %url, error = %message, "API returned an error");
            exchange.error = Some(message);
        }
        exchange.response = Some(ResponseRecord {
            status: response.status,
            headers,
            body: text,
        });
        drop(exchange);

        Ok(response)
    }
}

fn method_for(verb: Verb) -> Method {
    match verb {
        Verb::Get => Method::GET,
        Verb::Post => Method::POST,
        Verb::Put => Method::PUT,
        Verb::Patch => Method::PATCH,
        Verb::Delete => Method::DELETE,
    }
}

fn append_query(url: &mut Url, args: &Payload) {
    let encoded = encode_nested(args);
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|e| {
        debug!(error = %e, "API response body is not JSON");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MailchimpClient {
        let endpoint = Url::parse(&format!("{}/3.0", server.uri())).unwrap();
        MailchimpClient::with_endpoint("key-us1", endpoint)
    }

    #[test]
    fn test_endpoint_from_api_key() {
        let client = MailchimpClient::new("0123456789abcdef-us6").unwrap();
        assert_eq!(
            client.api_endpoint().as_str(),
            "https://us6.api.mailchimp.com/3.0"
        );
        assert!(matches!(
            MailchimpClient::new("no_datacenter"),
            Err(ClientError::Config(ConfigError::InvalidApiKey))
        ));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = MailchimpClient::new("topsecret-us6").unwrap();
        assert!(!format!("{client:?}").contains("topsecret"));
    }

    #[tokio::test]
    async fn test_get_sends_args_as_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/3.0/lists"))
            .and(query_param("count", "10"))
            .and(header("accept", MEDIA_TYPE))
            .and(basic_auth("user", "key-us1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_items": 2})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let args = json!({"count": 10});
        let response = client
            .get("lists", args.as_object(), DEFAULT_TIMEOUT)
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.get("total_items"), Some(&json!(2)));
        assert!(client.success());
        assert_eq!(client.last_error(), None);

        let request = client.last_request().unwrap();
        assert_eq!(request.verb, Verb::Get);
        assert_eq!(request.url.query(), Some("count=10"));
        assert_eq!(request.body, None);
        assert_eq!(request.timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_post_failure_is_returned_as_data() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/3.0/lists/abc/members"))
            .and(body_json(json!({"email_address": "a@b.com"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "https://mailchimp.com/developer/marketing/docs/errors/",
                "title": "Member Exists",
                "status": 400,
                "detail": "a@b.com is already a list member.",
                "instance": "f3a1"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let body = json!({"email_address": "a@b.com"});
        let response = client
            .post("lists/abc/members", body.as_object(), DEFAULT_TIMEOUT)
            .await
            .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.problem().unwrap().title, "Member Exists");
        assert!(!client.success());
        assert_eq!(
            client.last_error().as_deref(),
            Some("400: a@b.com is already a list member.")
        );
        assert_eq!(
            client.last_request().unwrap().body.as_deref(),
            Some(r#"{"email_address":"a@b.com"}"#)
        );
        assert_eq!(client.last_response().unwrap().status, 400);
    }

    #[tokio::test]
    async fn test_delete_with_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/3.0/lists/abc/members/123"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let response = client
            .delete("lists/abc/members/123", DEFAULT_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(response.status, 204);
        assert_eq!(response.body, Value::Null);
        assert!(client.success());
        assert_eq!(client.last_response().unwrap().body, "");
    }

    #[tokio::test]
    async fn test_transport_error_is_recorded() {
        let endpoint = Url::parse("http://127.0.0.1:1/3.0").unwrap();
        let client = MailchimpClient::with_endpoint("key-us1", endpoint);

        let result = client.get("ping", None, Duration::from_secs(2)).await;

        assert!(matches!(result, Err(ClientError::Http(_))));
        assert!(!client.success());
        assert!(client.last_error().is_some());
        assert!(client.last_response().is_none());
    }
}
