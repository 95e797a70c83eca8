//! HTTP Client Factory
//!
//! Every outbound call (model, geodata backend, geocoder) carries its own
//! fixed timeout, configured once on the client.

use std::time::Duration;

/// Build a `reqwest::Client` with a request timeout and optional User-Agent.
pub fn build_http_client(
    timeout: Duration,
    user_agent: Option<&str>,
) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua.to_string());
    }
    builder.build()
}
