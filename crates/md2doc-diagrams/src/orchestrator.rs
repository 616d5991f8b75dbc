//! Fallback-chain rendering across engines.
//!
//! [`RenderOrchestrator`] holds, per diagram family, a list of
//! [`RenderStrategy`] sorted by priority. Rendering walks the list, skipping
//! network strategies while the network is unreachable, and stops at the
//! first success. Engines are created lazily through an [`EngineFactory`] and
//! kept in a registry owned by the orchestrator.
//!
//! With the simplified fallback enabled, a diagram whose whole chain failed is
//! replaced by a generic substitute rendered through the same chain, and the
//! output is flagged with `content_replaced`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use md2doc_cache::ImageCache;
use md2doc_parser::{DiagramInfo, DiagramKind};

use crate::consts::DEFAULT_NETWORK_TTL;
use crate::engine::{RenderEngine, RenderOutput};
use crate::error::FallbackError;
use crate::mermaid::MermaidEngine;
use crate::plantuml::PlantUmlEngine;
use crate::probe::{HttpProbe, NetworkProbe};
use crate::settings::DiagramSettings;
use crate::simplified::simplified_source;
use crate::strategy::{EngineId, RenderMode, RenderStrategy, default_strategies};

/// Creates engine instances for the registry.
pub trait EngineFactory: Send {
    fn create(&self, engine: EngineId, mode: RenderMode) -> Box<dyn RenderEngine>;
}

/// Factory building the Mermaid and `PlantUML` engines from settings.
pub struct DefaultEngineFactory {
    settings: DiagramSettings,
    cache: Option<Arc<ImageCache>>,
}

impl DefaultEngineFactory {
    #[must_use]
    pub fn new(settings: DiagramSettings, cache: Option<Arc<ImageCache>>) -> Self {
        Self { settings, cache }
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create(&self, engine: EngineId, mode: RenderMode) -> Box<dyn RenderEngine> {
        let settings = &self.settings;
        let image = settings.image.clone();
        let cache = self.cache.clone();
        match (engine, mode) {
            (EngineId::Mermaid, RenderMode::Online) => Box::new(MermaidEngine::online(
                settings.mermaid.clone(),
                image,
                cache,
            )),
            (EngineId::Mermaid, RenderMode::Local) => Box::new(MermaidEngine::local(
                settings.mermaid.clone(),
                image,
                cache,
            )),
            (EngineId::PlantUml, RenderMode::Online) => Box::new(PlantUmlEngine::online(
                settings.plantuml.clone(),
                image,
                cache,
            )),
            (EngineId::PlantUml, RenderMode::Local) => Box::new(PlantUmlEngine::local(
                settings.plantuml.clone(),
                image,
                cache,
            )),
        }
    }
}

/// Availability of one strategy, as reported by
/// [`RenderOrchestrator::available_engines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub kind: DiagramKind,
    pub strategy: RenderStrategy,
    pub available: bool,
    pub formats: Vec<&'static str>,
}

/// Renders diagrams through per-family fallback chains.
pub struct RenderOrchestrator {
    strategies: BTreeMap<DiagramKind, Vec<RenderStrategy>>,
    factory: Box<dyn EngineFactory>,
    engines: HashMap<(EngineId, RenderMode), Box<dyn RenderEngine>>,
    probe: Box<dyn NetworkProbe>,
    network: Option<(bool, Instant)>,
    network_ttl: Duration,
    allow_simplified: bool,
}

impl RenderOrchestrator {
    /// Orchestrator with the default engines, the default strategy table and
    /// an HTTP probe against the configured rendering endpoints.
    #[must_use]
    pub fn new(settings: DiagramSettings, cache: Option<Arc<ImageCache>>) -> Self {
        let probe = HttpProbe::new(settings.probe_endpoints(), settings.probe_timeout);
        let prefer_local = settings.prefer_local;
        let ttl = settings.network_ttl;
        let simplified = settings.allow_simplified_fallback;
        Self::with_parts(
            Box::new(DefaultEngineFactory::new(settings, cache)),
            Box::new(probe),
            prefer_local,
        )
        .with_network_ttl(ttl)
        .with_simplified_fallback(simplified)
    }

    /// Orchestrator with custom engine construction and probing.
    #[must_use]
    pub fn with_parts(
        factory: Box<dyn EngineFactory>,
        probe: Box<dyn NetworkProbe>,
        prefer_local: bool,
    ) -> Self {
        let strategies = [EngineId::Mermaid, EngineId::PlantUml]
            .into_iter()
            .map(|engine| (engine.kind(), default_strategies(engine, prefer_local)))
            .collect();
        Self {
            strategies,
            factory,
            engines: HashMap::new(),
            probe,
            network: None,
            network_ttl: DEFAULT_NETWORK_TTL,
            allow_simplified: false,
        }
    }

    #[must_use]
    pub fn with_network_ttl(mut self, ttl: Duration) -> Self {
        self.network_ttl = ttl;
        self
    }

    /// Substitute a generic diagram once every strategy has failed.
    #[must_use]
    pub fn with_simplified_fallback(mut self, allow: bool) -> Self {
        self.allow_simplified = allow;
        self
    }

    /// Replace the network probe. Clears the memoized result.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn NetworkProbe>) -> Self {
        self.probe = probe;
        self.network = None;
        self
    }

    /// Add a strategy, keeping the family's list sorted by priority.
    ///
    /// Strategies with equal priority keep their registration order.
    pub fn register_strategy(&mut self, kind: DiagramKind, strategy: RenderStrategy) {
        let list = self.strategies.entry(kind).or_default();
        list.push(strategy);
        list.sort_by_key(|s| s.priority);
    }

    /// Remove every strategy for a family.
    pub fn clear_strategies(&mut self, kind: DiagramKind) {
        self.strategies.remove(&kind);
    }

    #[must_use]
    pub fn strategies(&self, kind: DiagramKind) -> &[RenderStrategy] {
        self.strategies
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Render a diagram through its family's fallback chain.
    ///
    /// Never panics; every failure is returned as a [`FallbackError`] for the
    /// caller to turn into a placeholder.
    pub fn render(
        &mut self,
        info: &DiagramInfo,
        out_path: Option<&Path>,
    ) -> Result<RenderOutput, FallbackError> {
        let err = match self.run_chain(info, out_path) {
            Ok(output) => return Ok(output),
            Err(err) => err,
        };
        if !self.allow_simplified || matches!(err, FallbackError::NoStrategy(_)) {
            return Err(err);
        }
        let Some(source) = simplified_source(info.kind) else {
            return Err(err);
        };

        tracing::warn!(line = info.source_line, "{err}, substituting a simplified diagram");
        let substitute = DiagramInfo {
            content: source.to_owned(),
            title: None,
            syntax_valid: true,
            ..info.clone()
        };
        match self.run_chain(&substitute, out_path) {
            Ok(output) => Ok(RenderOutput {
                content_replaced: true,
                ..output
            }),
            Err(substitute_err) => {
                tracing::warn!(line = info.source_line, "simplified substitute failed: {substitute_err}");
                Err(err)
            }
        }
    }

    fn run_chain(
        &mut self,
        info: &DiagramInfo,
        out_path: Option<&Path>,
    ) -> Result<RenderOutput, FallbackError> {
        let kind = info.kind;
        let strategies = match self.strategies.get(&kind) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return Err(FallbackError::NoStrategy(kind)),
        };

        let network = if strategies.iter().any(|s| s.network_required) {
            self.network_available()
        } else {
            true
        };

        let mut last_error = None;
        for strategy in strategies {
            if strategy.network_required && !network {
                tracing::debug!(engine = %strategy.engine, mode = %strategy.mode, "skipping strategy, network unavailable");
                continue;
            }

            let engine = self.engine(strategy.engine, strategy.mode);
            if !engine.can_render(info) {
                tracing::debug!(engine = %strategy.engine, mode = %strategy.mode, "engine cannot render diagram");
                continue;
            }

            match engine.render(info, out_path) {
                Ok(output) => {
                    tracing::debug!(
                        engine = %strategy.engine,
                        mode = %strategy.mode,
                        line = info.source_line,
                        "diagram rendered"
                    );
                    return Ok(output);
                }
                Err(e) => {
                    tracing::warn!(line = info.source_line, "diagram render failed: {e}");
                    last_error = Some(e);
                    if !strategy.fallback_on_failure {
                        break;
                    }
                }
            }
        }

        Err(match last_error {
            Some(last) => FallbackError::Exhausted { kind, last },
            None => FallbackError::NoneAvailable(kind),
        })
    }

    /// Minimal syntax check through the first usable engine of the family.
    pub fn validate(&mut self, info: &DiagramInfo) -> Result<(), String> {
        let strategies = self.strategies(info.kind).to_vec();
        if strategies.is_empty() {
            return Err(format!("no render strategy registered for {} diagrams", info.kind));
        }

        let network = self.network_available();
        for strategy in strategies {
            if strategy.network_required && !network {
                continue;
            }
            return self
                .engine(strategy.engine, strategy.mode)
                .validate_syntax(&info.content);
        }
        Err(format!("no engine available to validate {} diagrams", info.kind))
    }

    /// Report every registered strategy and whether it could render now.
    pub fn available_engines(&mut self) -> Vec<EngineStatus> {
        let all: Vec<(DiagramKind, RenderStrategy)> = self
            .strategies
            .iter()
            .flat_map(|(kind, list)| list.iter().map(|s| (*kind, *s)))
            .collect();
        let network = self.network_available();

        all.into_iter()
            .map(|(kind, strategy)| {
                let engine = self.engine(strategy.engine, strategy.mode);
                EngineStatus {
                    kind,
                    strategy,
                    available: engine.available() && (network || !strategy.network_required),
                    formats: engine.supported_formats().to_vec(),
                }
            })
            .collect()
    }

    /// Whether the rendering services are reachable.
    ///
    /// Probe results are reused for the configured TTL.
    pub fn network_available(&mut self) -> bool {
        if let Some((reachable, checked_at)) = self.network
            && checked_at.elapsed() < self.network_ttl
        {
            return reachable;
        }

        let reachable = self.probe.is_reachable();
        self.network = Some((reachable, Instant::now()));
        reachable
    }

    /// Force the next network check to probe again.
    pub fn invalidate_network(&mut self) {
        self.network = None;
    }

    /// Drop every engine instance; they are recreated on demand.
    pub fn clear_engines(&mut self) {
        self.engines.clear();
        self.network = None;
        tracing::debug!("engine registry cleared");
    }

    fn engine(&mut self, id: EngineId, mode: RenderMode) -> &dyn RenderEngine {
        let factory = &self.factory;
        let engine = self.engines.entry((id, mode)).or_insert_with(|| {
            tracing::debug!(engine = %id, mode = %mode, "creating render engine");
            factory.create(id, mode)
        });
        &**engine
    }
}
