//! Endpoint derivation from an API key.

use url::Url;

use super::ConfigError;

/// API root with a `<dc>` placeholder for the datacenter.
pub const ENDPOINT_TEMPLATE: &str = "https://<dc>.api.mailchimp.com/3.0";

/// The datacenter suffix of an API key: everything after the first `-`.
pub fn datacenter(api_key: &str) -> Result<&str, ConfigError> {
    let (_, dc) = api_key.split_once('-').ok_or(ConfigError::InvalidApiKey)?;
    if dc.is_empty() || !dc.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidApiKey);
    }
    Ok(dc)
}

pub fn endpoint_for_key(api_key: &str) -> Result<Url, ConfigError> {
    let dc = datacenter(api_key)?;
    Ok(Url::parse(&ENDPOINT_TEMPLATE.replace("<dc>", dc))?)
}
