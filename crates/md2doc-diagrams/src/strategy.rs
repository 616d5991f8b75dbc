//! Render strategies: which engine to try, in which mode, in which order.

use std::fmt;

use md2doc_parser::DiagramKind;

/// Render engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineId {
    Mermaid,
    PlantUml,
}

impl EngineId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
        }
    }

    /// Diagram family rendered by this engine.
    #[must_use]
    pub fn kind(self) -> DiagramKind {
        match self {
            Self::Mermaid => DiagramKind::Mermaid,
            Self::PlantUml => DiagramKind::PlantUml,
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an engine renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderMode {
    /// Remote rendering service over HTTP.
    Online,
    /// External command-line tool.
    Local,
}

impl RenderMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a diagram family's fallback chain.
///
/// Strategies are tried in ascending `priority`. The pair `(engine, mode)`
/// identifies the engine instance used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStrategy {
    pub engine: EngineId,
    pub mode: RenderMode,
    pub priority: u32,
    /// Continue with the next strategy when this one fails.
    pub fallback_on_failure: bool,
    /// Skip this strategy while the network is unreachable.
    pub network_required: bool,
}

impl RenderStrategy {
    /// Online strategy: requires the network and falls back on failure.
    #[must_use]
    pub fn online(engine: EngineId, priority: u32) -> Self {
        Self {
            engine,
            mode: RenderMode::Online,
            priority,
            fallback_on_failure: true,
            network_required: true,
        }
    }

    /// Local strategy: works offline and falls back on failure.
    #[must_use]
    pub fn local(engine: EngineId, priority: u32) -> Self {
        Self {
            engine,
            mode: RenderMode::Local,
            priority,
            fallback_on_failure: true,
            network_required: false,
        }
    }

    #[must_use]
    pub fn with_fallback_on_failure(mut self, fallback: bool) -> Self {
        self.fallback_on_failure = fallback;
        self
    }
}

/// Default fallback chain for a diagram family.
///
/// Online first, then local. With `prefer_local` the priorities are swapped.
#[must_use]
pub fn default_strategies(engine: EngineId, prefer_local: bool) -> Vec<RenderStrategy> {
    let (online, local) = if prefer_local { (1, 0) } else { (0, 1) };
    let mut strategies = vec![
        RenderStrategy::online(engine, online),
        RenderStrategy::local(engine, local),
    ];
    strategies.sort_by_key(|s| s.priority);
    strategies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategies_online_first() {
        let strategies = default_strategies(EngineId::Mermaid, false);
        assert_eq!(strategies[0].mode, RenderMode::Online);
        assert!(strategies[0].network_required);
        assert_eq!(strategies[1].mode, RenderMode::Local);
        assert!(!strategies[1].network_required);
    }

    #[test]
    fn test_default_strategies_prefer_local() {
        let strategies = default_strategies(EngineId::PlantUml, true);
        assert_eq!(strategies[0].mode, RenderMode::Local);
        assert_eq!(strategies[0].priority, 0);
        assert_eq!(strategies[1].mode, RenderMode::Online);
    }

    #[test]
    fn test_engine_kind() {
        assert_eq!(EngineId::Mermaid.kind(), DiagramKind::Mermaid);
        assert_eq!(EngineId::PlantUml.kind(), DiagramKind::PlantUml);
        assert_eq!(EngineId::PlantUml.to_string(), "plantuml");
    }
}
