//! Component configuration and the keyed YAML config-directory loader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

const DEFAULT_MAX_WORKERS: usize = 4;
const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Orchestrator-facing configuration. Both bounds are required to be
/// positive; `validate` runs at orchestrator construction time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Worker pool size for CPU-bound stages.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Permit count for I/O-bound stages.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl OrchestratorConfig {
    pub fn new(max_workers: usize, max_concurrency: usize) -> Self {
        Self {
            max_workers,
            max_concurrency,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_workers == 0 {
            return Err(PipelineError::Config(
                "max_workers must be a positive integer".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "max_concurrency must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pipeline components with a fixed config filename each. The lookup table is
/// resolved at startup, outside the orchestration core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    ExtractionOrchestrator,
    EvaluationOrchestrator,
    FileLister,
    TestDataLoader,
    Reader,
    Converter,
    Extractor,
    Evaluator,
    ExtractionExporter,
    EvaluationExporter,
}

impl Component {
    pub fn filename(self) -> &'static str {
        match self {
            Component::ExtractionOrchestrator => "extraction_orchestrator.yaml",
            Component::EvaluationOrchestrator => "evaluation_orchestrator.yaml",
            Component::FileLister => "file_lister.yaml",
            Component::TestDataLoader => "test_data_loader.yaml",
            Component::Reader => "reader.yaml",
            Component::Converter => "converter.yaml",
            Component::Extractor => "extractor.yaml",
            Component::Evaluator => "evaluator.yaml",
            Component::ExtractionExporter => "extraction_exporter.yaml",
            Component::EvaluationExporter => "evaluation_exporter.yaml",
        }
    }
}

/// A directory of per-component YAML files.
#[derive(Clone, Debug)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PipelineError::Config(format!(
                "config directory not found: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, component: Component) -> PathBuf {
        self.root.join(component.filename())
    }

    /// Load one component's file into a strategy-chosen config type. An empty
    /// file deserializes as an empty mapping so configs with defaults load
    /// cleanly; a missing file is an error.
    pub fn load<T: DeserializeOwned>(&self, component: Component) -> Result<T, PipelineError> {
        let path = self.path_for(component);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            PipelineError::Config(format!("config file not found: {}: {e}", path.display()))
        })?;
        let raw = if raw.trim().is_empty() { "{}" } else { raw.as_str() };
        serde_yaml::from_str(raw).map_err(|e| {
            PipelineError::Config(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Load `evaluator.yaml`, a mapping of evaluator name to config section.
    pub fn load_evaluators(&self) -> Result<EvaluatorConfigMap, PipelineError> {
        let sections: BTreeMap<String, serde_yaml::Value> = self.load(Component::Evaluator)?;
        if sections.is_empty() {
            return Err(PipelineError::Config(
                "no evaluator configuration found in evaluator.yaml".to_string(),
            ));
        }
        Ok(EvaluatorConfigMap { sections })
    }
}

/// Keyed evaluator config sections, deserialized per evaluator on demand.
#[derive(Clone, Debug)]
pub struct EvaluatorConfigMap {
    sections: BTreeMap<String, serde_yaml::Value>,
}

impl EvaluatorConfigMap {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, PipelineError> {
        let section = self.sections.get(name).ok_or_else(|| {
            PipelineError::Config(format!("no configuration found for evaluator '{name}'"))
        })?;
        serde_yaml::from_value(section.clone()).map_err(|e| {
            PipelineError::Config(format!("invalid configuration for evaluator '{name}': {e}"))
        })
    }
}

/// Aggregated extraction pipeline configuration, generic over the strategy
/// config types chosen by the caller.
#[derive(Clone, Debug)]
pub struct ExtractionPipelineConfig<L, R, C, X, E> {
    pub orchestrator: OrchestratorConfig,
    pub file_lister: L,
    pub reader: R,
    pub converter: C,
    pub extractor: X,
    pub exporter: E,
}

pub fn load_extraction_config<L, R, C, X, E>(
    dir: &ConfigDir,
) -> Result<ExtractionPipelineConfig<L, R, C, X, E>, PipelineError>
where
    L: DeserializeOwned,
    R: DeserializeOwned,
    C: DeserializeOwned,
    X: DeserializeOwned,
    E: DeserializeOwned,
{
    let orchestrator: OrchestratorConfig = dir.load(Component::ExtractionOrchestrator)?;
    orchestrator.validate()?;
    Ok(ExtractionPipelineConfig {
        orchestrator,
        file_lister: dir.load(Component::FileLister)?,
        reader: dir.load(Component::Reader)?,
        converter: dir.load(Component::Converter)?,
        extractor: dir.load(Component::Extractor)?,
        exporter: dir.load(Component::ExtractionExporter)?,
    })
}

/// Aggregated evaluation pipeline configuration.
#[derive(Clone, Debug)]
pub struct EvaluationPipelineConfig<T, R, C, X, E> {
    pub orchestrator: OrchestratorConfig,
    pub test_data_loader: T,
    pub reader: R,
    pub converter: C,
    pub extractor: X,
    pub evaluators: EvaluatorConfigMap,
    pub exporter: E,
}

pub fn load_evaluation_config<T, R, C, X, E>(
    dir: &ConfigDir,
) -> Result<EvaluationPipelineConfig<T, R, C, X, E>, PipelineError>
where
    T: DeserializeOwned,
    R: DeserializeOwned,
    C: DeserializeOwned,
    X: DeserializeOwned,
    E: DeserializeOwned,
{
    let orchestrator: OrchestratorConfig = dir.load(Component::EvaluationOrchestrator)?;
    orchestrator.validate()?;
    Ok(EvaluationPipelineConfig {
        orchestrator,
        test_data_loader: dir.load(Component::TestDataLoader)?,
        reader: dir.load(Component::Reader)?,
        converter: dir.load(Component::Converter)?,
        extractor: dir.load(Component::Extractor)?,
        evaluators: dir.load_evaluators()?,
        exporter: dir.load(Component::EvaluationExporter)?,
    })
}
