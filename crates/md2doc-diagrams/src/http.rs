//! Blocking HTTP helpers shared by the online engines and the network probe.

use std::time::Duration;

use ureq::Agent;

/// Create HTTP agent with the specified timeout.
///
/// Non-2xx statuses are returned as responses, not errors, so callers can
/// decide how to treat them.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// A fully read HTTP response.
#[derive(Debug)]
pub(crate) struct Fetched {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET `url` and read the whole body.
pub(crate) fn get(agent: &Agent, url: &str) -> Result<Fetched, String> {
    let response = agent.get(url).call().map_err(|e| e.to_string())?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body = response
        .into_body()
        .read_to_vec()
        .map_err(|e| e.to_string())?;

    Ok(Fetched {
        status,
        content_type,
        body,
    })
}

/// HEAD `url`. Any HTTP response means the host is reachable.
pub(crate) fn head(agent: &Agent, url: &str) -> Result<u16, String> {
    agent
        .head(url)
        .call()
        .map(|response| response.status().as_u16())
        .map_err(|e| e.to_string())
}
