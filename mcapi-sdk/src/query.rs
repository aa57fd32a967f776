//! Path-segment queries routed by verb.
//!
//! Hosts that drive the API from loosely-typed input (an admin command, a
//! scripted task) hand over a verb, a list of path segments and optional
//! query/body mappings. [`query`] assembles the endpoint and routes the verb
//! to the matching [`ApiClient`] call.

use std::time::Duration;

use crate::api::{ApiClient, ApiResponse, ClientError};
use crate::form::encode_nested;
use crate::objects::{Payload, Verb};

/// Join path segments with `/`, percent-encoding each one, and append
/// `query_args` as a query string.
pub fn build_endpoint(segments: &[&str], query_args: Option<&Payload>) -> String {
    let mut endpoint = segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if let Some(args) = query_args.filter(|a| !a.is_empty()) {
        endpoint.push('?');
        endpoint.push_str(&encode_nested(args));
    }
    endpoint
}

pub async fn query<C>(
    client: &C,
    verb: Verb,
    segments: &[&str],
    query_args: Option<&Payload>,
    args: Option<&Payload>,
    timeout: Duration,
) -> Result<ApiResponse, ClientError>
where
    C: ApiClient + ?Sized,
{
    let endpoint = build_endpoint(segments, query_args);
    match verb {
        Verb::Get => client.get(&endpoint, args, timeout).await,
        Verb::Post => client.post(&endpoint, args, timeout).await,
        Verb::Put => client.put(&endpoint, args, timeout).await,
        Verb::Patch => client.patch(&endpoint, args, timeout).await,
        Verb::Delete => client.delete(&endpoint, timeout).await,
    }
}
