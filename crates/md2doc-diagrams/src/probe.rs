//! Network reachability probing.

use std::time::Duration;

use ureq::Agent;

use crate::http;

/// Answers whether the rendering services can be reached.
pub trait NetworkProbe: Send {
    fn is_reachable(&self) -> bool;
}

/// Probe sending `HEAD` requests to the rendering endpoints in use.
///
/// The first endpoint that answers with any HTTP status wins.
pub struct HttpProbe {
    endpoints: Vec<String>,
    agent: Agent,
}

impl HttpProbe {
    #[must_use]
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        Self {
            endpoints,
            agent: http::create_agent(timeout),
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

impl NetworkProbe for HttpProbe {
    fn is_reachable(&self) -> bool {
        for endpoint in &self.endpoints {
            match http::head(&self.agent, endpoint) {
                Ok(status) => {
                    tracing::debug!(endpoint = %endpoint, status, "render endpoint reachable");
                    return true;
                }
                Err(e) => tracing::debug!(endpoint = %endpoint, "render endpoint unreachable: {e}"),
            }
        }
        tracing::warn!("no rendering service reachable, online rendering disabled");
        false
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl NetworkProbe for StaticProbe {
    fn is_reachable(&self) -> bool {
        self.0
    }
}
