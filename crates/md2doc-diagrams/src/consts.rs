//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default DPI hint sent to `PlantUML` servers.
pub const DEFAULT_PLANTUML_DPI: u32 = 96;

/// Default Mermaid image endpoint.
pub const DEFAULT_MERMAID_ENDPOINT: &str = "https://mermaid.ink";

/// Default `PlantUML` mirror servers, tried in order.
pub const DEFAULT_PLANTUML_SERVERS: &[&str] = &[
    "https://www.plantuml.com/plantuml",
    "https://plantuml.com/plantuml",
    "http://www.plantuml.com/plantuml",
];

/// HTTP timeout for Mermaid requests.
pub const MERMAID_ONLINE_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP timeout for `PlantUML` requests.
pub const PLANTUML_ONLINE_TIMEOUT: Duration = Duration::from_secs(45);

/// Timeout for a local renderer invocation.
pub const LOCAL_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Attempts per `PlantUML` URL variant.
pub const PLANTUML_ATTEMPTS: u32 = 2;

/// `PlantUML` responses shorter than this are error pages, not images.
pub const MIN_IMAGE_BYTES: usize = 100;

/// How long a network probe result stays valid.
pub const DEFAULT_NETWORK_TTL: Duration = Duration::from_secs(30);

/// Timeout for a single network probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
