//! Extraction pipeline orchestration: ingest -> extract -> export per path.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::OrchestratorConfig;
use crate::context::RunContext;
use crate::error::{PipelineError, StageKind};
use crate::metrics::RunMetrics;
use crate::pipeline::ingest_unit;
use crate::pipeline::progress::{UnitProgress, UnitStage};
use crate::pipeline::report::{RunReport, UnitOutcome};
use crate::ports::{Converter, ExtractionExporter, Extractor, Reader};
use crate::runtime::{ConcurrencyGate, WorkerPool};
use crate::types::{ExtractionSchema, PathIdentifier};

/// Drives the per-document pipeline over a collection of inputs.
///
/// CPU-bound ingestion runs on the bounded worker pool; extraction and export
/// run under the concurrency gate. Units run concurrently with each other,
/// while each unit's own steps stay strictly sequential.
pub struct ExtractionOrchestrator<S: ExtractionSchema> {
    config: OrchestratorConfig,
    reader: Arc<dyn Reader>,
    converter: Arc<dyn Converter>,
    extractor: Arc<dyn Extractor<S>>,
    exporter: Arc<dyn ExtractionExporter<S>>,
    metrics: Arc<RunMetrics>,
}

impl<S: ExtractionSchema> std::fmt::Debug for ExtractionOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ExtractionSchema> ExtractionOrchestrator<S> {
    pub fn new(
        config: OrchestratorConfig,
        reader: Arc<dyn Reader>,
        converter: Arc<dyn Converter>,
        extractor: Arc<dyn Extractor<S>>,
        exporter: Arc<dyn ExtractionExporter<S>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            reader,
            converter,
            extractor,
            exporter,
            metrics: RunMetrics::new(),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn run(&self, paths: Vec<PathIdentifier>) -> RunReport {
        self.run_with_context(paths, RunContext::new()).await
    }

    /// Process every path and return one outcome per input, in input order.
    /// Never short-circuits: a failing unit is captured in its outcome while
    /// the remaining units keep running.
    pub async fn run_with_context(
        &self,
        paths: Vec<PathIdentifier>,
        ctx: RunContext,
    ) -> RunReport {
        let pool = Arc::new(WorkerPool::new(self.config.max_workers));
        let gate = Arc::new(ConcurrencyGate::new(self.config.max_concurrency));

        info!(
            run_id = %ctx.run_id(),
            units = paths.len(),
            max_workers = self.config.max_workers,
            max_concurrency = self.config.max_concurrency,
            "Starting extraction run"
        );

        let mut handles = Vec::with_capacity(paths.len());
        for path_identifier in paths {
            let unit = path_identifier.key().to_string();
            let reader = Arc::clone(&self.reader);
            let converter = Arc::clone(&self.converter);
            let extractor = Arc::clone(&self.extractor);
            let exporter = Arc::clone(&self.exporter);
            let pool = Arc::clone(&pool);
            let gate = Arc::clone(&gate);
            let ctx = ctx.clone();
            let metrics = Arc::clone(&self.metrics);

            let task_path = path_identifier.clone();
            let handle = tokio::spawn(async move {
                process_unit(
                    task_path, reader, converter, extractor, exporter, pool, gate, ctx, metrics,
                )
                .await
            });
            handles.push((unit, path_identifier, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (unit, path_identifier, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(UnitOutcome {
                    unit,
                    path_identifier,
                    result: Err(PipelineError::Runtime(format!("unit task panicked: {e}"))),
                    transitions: Vec::new(),
                }),
            }
        }

        let report = RunReport {
            run_id: ctx.run_id(),
            outcomes,
        };
        info!(
            run_id = %ctx.run_id(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Extraction run finished"
        );
        report
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_unit<S: ExtractionSchema>(
    path_identifier: PathIdentifier,
    reader: Arc<dyn Reader>,
    converter: Arc<dyn Converter>,
    extractor: Arc<dyn Extractor<S>>,
    exporter: Arc<dyn ExtractionExporter<S>>,
    pool: Arc<WorkerPool>,
    gate: Arc<ConcurrencyGate>,
    ctx: RunContext,
    metrics: Arc<RunMetrics>,
) -> UnitOutcome {
    let unit = path_identifier.key().to_string();
    let mut progress = UnitProgress::new(&unit);
    metrics.start_unit();

    let result = run_stages(
        &unit, &path_identifier, &mut progress, &reader, &converter, &extractor, &exporter,
        &pool, &gate, &ctx, &metrics,
    )
    .await;

    match &result {
        Ok(()) => {
            progress.complete();
            metrics.finish_unit(true);
        }
        Err(e) => {
            error!(unit = %unit, error = %e, "Extraction pipeline failed");
            progress.fail();
            metrics.finish_unit(false);
        }
    }

    UnitOutcome {
        unit,
        path_identifier,
        result,
        transitions: progress.into_transitions(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_stages<S: ExtractionSchema>(
    unit: &str,
    path_identifier: &PathIdentifier,
    progress: &mut UnitProgress,
    reader: &Arc<dyn Reader>,
    converter: &Arc<dyn Converter>,
    extractor: &Arc<dyn Extractor<S>>,
    exporter: &Arc<dyn ExtractionExporter<S>>,
    pool: &WorkerPool,
    gate: &ConcurrencyGate,
    ctx: &RunContext,
    metrics: &Arc<RunMetrics>,
) -> Result<(), PipelineError> {
    progress.transition_to(UnitStage::Ingesting);
    let document = ingest_unit(unit, path_identifier, reader, converter, pool, ctx, metrics).await?;

    // Extract and export run under a single permit; the unit's own steps
    // stay strictly sequential.
    gate.run(async {
        progress.transition_to(UnitStage::Extracting);
        let result = extractor
            .extract(&document, ctx)
            .await
            .map_err(|e| PipelineError::stage(StageKind::Extract, unit, e))?;
        metrics.record_extraction();

        progress.transition_to(UnitStage::Exporting);
        exporter
            .export(&document, &result, ctx)
            .await
            .map_err(|e| PipelineError::stage(StageKind::Export, unit, e))?;
        metrics.record_export();

        info!(unit = %unit, document_id = %document.id(), "Completed extraction");
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, Document, DocumentBytes, ExtractionResult, Page};
    use anyhow::Result;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct DummySchema {
        value: String,
    }

    #[derive(Default)]
    struct MockReader {
        fail_on: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockReader {
        fn failing_on(unit: &str) -> Self {
            Self {
                fail_on: Some(unit.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Reader for MockReader {
        fn read(&self, path_identifier: &PathIdentifier, _ctx: &RunContext) -> Result<DocumentBytes> {
            self.calls.lock().unwrap().push(path_identifier.key().to_string());
            if self.fail_on.as_deref() == Some(path_identifier.key()) {
                anyhow::bail!("unreadable source");
            }
            Ok(DocumentBytes::new(
                path_identifier.clone(),
                b"data".to_vec(),
                "text/plain",
            ))
        }
    }

    #[derive(Default)]
    struct MockConverter {
        calls: Mutex<Vec<String>>,
    }

    impl MockConverter {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Converter for MockConverter {
        fn convert(&self, document_bytes: DocumentBytes, _ctx: &RunContext) -> Result<Document> {
            let id = document_bytes.path_identifier.key().to_string();
            self.calls.lock().unwrap().push(id.clone());
            Ok(Document::new(
                id,
                document_bytes.path_identifier,
                ContentType::Text,
                vec![Page::text(1, "hello")],
                HashMap::new(),
            )?)
        }
    }

    #[derive(Default)]
    struct MockExtractor {
        fail_on: Option<String>,
        delay_ms: u64,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl MockExtractor {
        fn failing_on(unit: &str) -> Self {
            Self {
                fail_on: Some(unit.to_string()),
                ..Default::default()
            }
        }

        fn slow(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Extractor<DummySchema> for MockExtractor {
        async fn extract(
            &self,
            document: &Document,
            _ctx: &RunContext,
        ) -> Result<ExtractionResult<DummySchema>> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(current, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.calls.lock().unwrap().push(document.id().to_string());
            if self.fail_on.as_deref() == Some(document.id()) {
                anyhow::bail!("model refused");
            }
            Ok(ExtractionResult::new(DummySchema {
                value: format!("extracted:{}", document.id()),
            }))
        }
    }

    #[derive(Default)]
    struct MockExporter {
        exports: Mutex<Vec<(String, String)>>,
    }

    impl MockExporter {
        fn exported_units(&self) -> Vec<String> {
            self.exports.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl ExtractionExporter<DummySchema> for MockExporter {
        async fn export(
            &self,
            document: &Document,
            result: &ExtractionResult<DummySchema>,
            _ctx: &RunContext,
        ) -> Result<()> {
            self.exports
                .lock()
                .unwrap()
                .push((document.id().to_string(), result.data.value.clone()));
            Ok(())
        }
    }

    struct Fixture {
        reader: Arc<MockReader>,
        converter: Arc<MockConverter>,
        extractor: Arc<MockExtractor>,
        exporter: Arc<MockExporter>,
    }

    impl Fixture {
        fn new(reader: MockReader, extractor: MockExtractor) -> Self {
            Self {
                reader: Arc::new(reader),
                converter: Arc::new(MockConverter::default()),
                extractor: Arc::new(extractor),
                exporter: Arc::new(MockExporter::default()),
            }
        }

        fn orchestrator(&self, config: OrchestratorConfig) -> ExtractionOrchestrator<DummySchema> {
            ExtractionOrchestrator::new(
                config,
                Arc::clone(&self.reader) as Arc<dyn Reader>,
                Arc::clone(&self.converter) as Arc<dyn Converter>,
                Arc::clone(&self.extractor) as Arc<dyn Extractor<DummySchema>>,
                Arc::clone(&self.exporter) as Arc<dyn ExtractionExporter<DummySchema>>,
            )
            .unwrap()
        }
    }

    fn paths(keys: &[&str]) -> Vec<PathIdentifier> {
        keys.iter().map(|key| PathIdentifier::new(*key)).collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let fixture = Fixture::new(MockReader::default(), MockExtractor::default());
        let err = ExtractionOrchestrator::<DummySchema>::new(
            OrchestratorConfig::new(0, 2),
            Arc::clone(&fixture.reader) as Arc<dyn Reader>,
            Arc::clone(&fixture.converter) as Arc<dyn Converter>,
            Arc::clone(&fixture.extractor) as Arc<dyn Extractor<DummySchema>>,
            Arc::clone(&fixture.exporter) as Arc<dyn ExtractionExporter<DummySchema>>,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_run_processes_single_path() {
        let fixture = Fixture::new(MockReader::default(), MockExtractor::default());
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(1, 1));

        let report = orchestrator.run(paths(&["doc-1"])).await;

        assert_eq!(report.total(), 1);
        assert!(report.is_complete_success());
        assert_eq!(fixture.reader.call_count(), 1);
        assert_eq!(fixture.converter.call_count(), 1);
        assert_eq!(fixture.extractor.call_count(), 1);
        assert_eq!(
            fixture.exporter.exports.lock().unwrap()[0],
            ("doc-1".to_string(), "extracted:doc-1".to_string())
        );

        let outcome = report.outcome_for("doc-1").unwrap();
        assert_eq!(outcome.path_identifier.key(), "doc-1");
        assert_eq!(outcome.transitions.last().unwrap().to, UnitStage::Done);
    }

    #[tokio::test]
    async fn test_reader_failure_skips_downstream_stages() {
        let fixture = Fixture::new(MockReader::failing_on("bad"), MockExtractor::default());
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(2, 2));

        let report = orchestrator.run(paths(&["bad"])).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(fixture.converter.call_count(), 0);
        assert_eq!(fixture.extractor.call_count(), 0);
        assert!(fixture.exporter.exported_units().is_empty());

        let outcome = report.outcome_for("bad").unwrap();
        assert_eq!(outcome.error().unwrap().stage_kind(), Some(StageKind::Read));
        assert_eq!(outcome.transitions.last().unwrap().to, UnitStage::Failed);
    }

    #[tokio::test]
    async fn test_run_yields_one_outcome_per_path() {
        let fixture = Fixture::new(MockReader::failing_on("doc-3"), MockExtractor::default());
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(2, 4));

        let inputs = paths(&["doc-1", "doc-2", "doc-3", "doc-4", "doc-5"]);
        let report = orchestrator.run(inputs.clone()).await;

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.failed(), 1);
        for (input, outcome) in inputs.iter().zip(&report.outcomes) {
            assert_eq!(outcome.unit, input.key());
        }
    }

    #[tokio::test]
    async fn test_failing_extractor_scenario() {
        // 3 paths, max_workers = 1, max_concurrency = 2, extractor fails for
        // exactly one input: 2 exports, 1 recorded failure, and the failing
        // unit's exporter is never called.
        let fixture = Fixture::new(MockReader::default(), MockExtractor::failing_on("doc-2"));
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(1, 2));

        let report = orchestrator.run(paths(&["doc-1", "doc-2", "doc-3"])).await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);

        let mut exported = fixture.exporter.exported_units();
        exported.sort();
        assert_eq!(exported, vec!["doc-1", "doc-3"]);

        let outcome = report.outcome_for("doc-2").unwrap();
        assert_eq!(outcome.error().unwrap().stage_kind(), Some(StageKind::Extract));
    }

    #[tokio::test]
    async fn test_gate_bounds_concurrent_extractions() {
        let fixture = Fixture::new(MockReader::default(), MockExtractor::slow(20));
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(4, 2));

        let report = orchestrator
            .run(paths(&["a", "b", "c", "d", "e", "f"]))
            .await;

        assert!(report.is_complete_success());
        assert!(fixture.extractor.high_water.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_repeated_runs_yield_same_outcome_multiset() {
        let fixture = Fixture::new(MockReader::failing_on("doc-2"), MockExtractor::default());
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(2, 2));
        let inputs = paths(&["doc-1", "doc-2", "doc-3"]);

        let collect = |report: &RunReport| {
            let mut pairs: Vec<(String, bool)> = report
                .outcomes
                .iter()
                .map(|o| (o.unit.clone(), o.is_success()))
                .collect();
            pairs.sort();
            pairs
        };

        let first = collect(&orchestrator.run(inputs.clone()).await);
        let second = collect(&orchestrator.run(inputs).await);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_context_extension_visible_to_stages() {
        let fixture = Fixture::new(MockReader::default(), MockExtractor::default());

        let ctx = RunContext::new();
        ctx.insert_extension("seen", Arc::new(AtomicUsize::new(0)));

        struct CountingExporter;

        #[async_trait]
        impl ExtractionExporter<DummySchema> for CountingExporter {
            async fn export(
                &self,
                _document: &Document,
                _result: &ExtractionResult<DummySchema>,
                ctx: &RunContext,
            ) -> Result<()> {
                let counter: Arc<AtomicUsize> = ctx
                    .extension("seen")
                    .ok_or_else(|| anyhow::anyhow!("missing counter"))?;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let orchestrator = ExtractionOrchestrator::new(
            OrchestratorConfig::new(2, 2),
            Arc::clone(&fixture.reader) as Arc<dyn Reader>,
            Arc::clone(&fixture.converter) as Arc<dyn Converter>,
            Arc::clone(&fixture.extractor) as Arc<dyn Extractor<DummySchema>>,
            Arc::new(CountingExporter) as Arc<dyn ExtractionExporter<DummySchema>>,
        )
        .unwrap();

        let report = orchestrator
            .run_with_context(paths(&["x", "y", "z"]), ctx.clone())
            .await;

        assert!(report.is_complete_success());
        let counter: Arc<AtomicUsize> = ctx.extension("seen").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_metrics_reflect_run() {
        let fixture = Fixture::new(MockReader::failing_on("doc-2"), MockExtractor::default());
        let orchestrator = fixture.orchestrator(OrchestratorConfig::new(2, 2));

        orchestrator.run(paths(&["doc-1", "doc-2"])).await;

        let snapshot = orchestrator.metrics().snapshot();
        assert_eq!(snapshot.units_total, 2);
        assert_eq!(snapshot.units_succeeded, 1);
        assert_eq!(snapshot.units_failed, 1);
        assert_eq!(snapshot.reads, 1);
        assert_eq!(snapshot.conversions, 1);
        assert_eq!(snapshot.extractions, 1);
        assert_eq!(snapshot.exports, 1);
    }
}
