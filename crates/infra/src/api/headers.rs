//! Headers attached to every outgoing request.

use netrelay_domain::constants::{
    ACCEPT_JSON, CONTENT_TYPE_JSON_UTF8, HEADER_ACCEPT, HEADER_CONTENT_TYPE, HEADER_USER_AGENT,
};
use netrelay_domain::{ClientConfig, Headers};

/// Standard header set derived from configuration only.
pub fn build_common_headers(config: &ClientConfig) -> Headers {
    let mut headers = Headers::new();
    headers.insert(HEADER_CONTENT_TYPE.to_string(), CONTENT_TYPE_JSON_UTF8.to_string());
    headers.insert(HEADER_ACCEPT.to_string(), ACCEPT_JSON.to_string());
    headers.insert(HEADER_USER_AGENT.to_string(), config.client_id.clone());
    headers
}
