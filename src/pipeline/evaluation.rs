//! Evaluation pipeline orchestration: ingest -> extract -> evaluate per
//! example, then one aggregated export.

use std::sync::Arc;

use futures::future;
use tracing::{error, info};

use crate::config::OrchestratorConfig;
use crate::context::RunContext;
use crate::error::{PipelineError, StageKind};
use crate::metrics::RunMetrics;
use crate::pipeline::ingest_unit;
use crate::pipeline::progress::{UnitProgress, UnitStage};
use crate::pipeline::report::{EvaluationRunReport, UnitOutcome};
use crate::ports::{
    Converter, EvaluationExporter, Evaluator, Extractor, Reader, TestDataLoader,
};
use crate::runtime::{ConcurrencyGate, WorkerPool};
use crate::types::{Document, EvaluationExample, EvaluationResult, ExtractionSchema, PathIdentifier};

/// Drives the per-example pipeline over a collection of ground-truth
/// examples, then performs a single aggregated export.
///
/// Metrics are only meaningful in aggregate, so unlike the extraction
/// pipeline's per-unit export, the evaluation exporter is called exactly once
/// per run, strictly after every example task has reached a terminal state,
/// with the full result set.
pub struct EvaluationOrchestrator<S: ExtractionSchema> {
    config: OrchestratorConfig,
    test_data_loader: Arc<dyn TestDataLoader<S>>,
    reader: Arc<dyn Reader>,
    converter: Arc<dyn Converter>,
    extractor: Arc<dyn Extractor<S>>,
    evaluators: Vec<Arc<dyn Evaluator<S>>>,
    exporter: Arc<dyn EvaluationExporter>,
    metrics: Arc<RunMetrics>,
}

impl<S: ExtractionSchema> std::fmt::Debug for EvaluationOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ExtractionSchema> EvaluationOrchestrator<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        test_data_loader: Arc<dyn TestDataLoader<S>>,
        reader: Arc<dyn Reader>,
        converter: Arc<dyn Converter>,
        extractor: Arc<dyn Extractor<S>>,
        evaluators: Vec<Arc<dyn Evaluator<S>>>,
        exporter: Arc<dyn EvaluationExporter>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            test_data_loader,
            reader,
            converter,
            extractor,
            evaluators,
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

    pub fn evaluator_count(&self) -> usize {
        self.evaluators.len()
    }

    /// Run the TestDataLoader once, before orchestration.
    pub fn load_examples(
        &self,
        source: &PathIdentifier,
        ctx: &RunContext,
    ) -> Result<Vec<EvaluationExample<S>>, PipelineError> {
        self.test_data_loader
            .load_test_data(source, ctx)
            .map_err(|e| PipelineError::stage(StageKind::LoadTestData, source.key(), e))
    }

    pub async fn run(&self, examples: Vec<EvaluationExample<S>>) -> EvaluationRunReport {
        self.run_with_context(examples, RunContext::new()).await
    }

    /// Process every example, then export the aggregated results exactly
    /// once. Failed examples contribute no (document, results) pair but are
    /// reported in their outcome; the export still happens, possibly with an
    /// empty result set.
    pub async fn run_with_context(
        &self,
        examples: Vec<EvaluationExample<S>>,
        ctx: RunContext,
    ) -> EvaluationRunReport {
        let pool = Arc::new(WorkerPool::new(self.config.max_workers));
        let gate = Arc::new(ConcurrencyGate::new(self.config.max_concurrency));

        info!(
            run_id = %ctx.run_id(),
            examples = examples.len(),
            evaluators = self.evaluators.len(),
            max_workers = self.config.max_workers,
            max_concurrency = self.config.max_concurrency,
            "Starting evaluation run"
        );

        let mut handles = Vec::with_capacity(examples.len());
        for example in examples {
            let unit = example.id.clone();
            let path_identifier = example.path_identifier.clone();
            let reader = Arc::clone(&self.reader);
            let converter = Arc::clone(&self.converter);
            let extractor = Arc::clone(&self.extractor);
            let evaluators = self.evaluators.clone();
            let pool = Arc::clone(&pool);
            let gate = Arc::clone(&gate);
            let ctx = ctx.clone();
            let metrics = Arc::clone(&self.metrics);

            let handle = tokio::spawn(async move {
                process_example(
                    example, reader, converter, extractor, evaluators, pool, gate, ctx, metrics,
                )
                .await
            });
            handles.push((unit, path_identifier, handle));
        }

        // Await-all barrier: the terminal export happens-after every example
        // task has reached a terminal state.
        let mut outcomes = Vec::with_capacity(handles.len());
        let mut collected = Vec::new();
        for (unit, path_identifier, handle) in handles {
            match handle.await {
                Ok((outcome, pair)) => {
                    outcomes.push(outcome);
                    if let Some(pair) = pair {
                        collected.push(pair);
                    }
                }
                Err(e) => outcomes.push(UnitOutcome {
                    unit,
                    path_identifier,
                    result: Err(PipelineError::Runtime(format!("example task panicked: {e}"))),
                    transitions: Vec::new(),
                }),
            }
        }

        let export_result = self.export_results(&collected, &gate, &ctx).await;

        let report = EvaluationRunReport {
            run_id: ctx.run_id(),
            outcomes,
            exported: collected.len(),
            export_result,
        };
        info!(
            run_id = %ctx.run_id(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            exported = report.exported,
            "Evaluation run finished"
        );
        report
    }

    async fn export_results(
        &self,
        results: &[(Document, Vec<EvaluationResult>)],
        gate: &ConcurrencyGate,
        ctx: &RunContext,
    ) -> Result<(), PipelineError> {
        let exported = gate
            .run(self.exporter.export(results, ctx))
            .await?
            .map_err(|e| {
                PipelineError::stage(StageKind::Export, ctx.run_id().to_string(), e)
            });

        match &exported {
            Ok(()) => {
                self.metrics.record_export();
                info!(
                    run_id = %ctx.run_id(),
                    results = results.len(),
                    "Completed evaluation export"
                );
            }
            Err(e) => {
                error!(run_id = %ctx.run_id(), error = %e, "Evaluation export failed");
            }
        }
        exported
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_example<S: ExtractionSchema>(
    example: EvaluationExample<S>,
    reader: Arc<dyn Reader>,
    converter: Arc<dyn Converter>,
    extractor: Arc<dyn Extractor<S>>,
    evaluators: Vec<Arc<dyn Evaluator<S>>>,
    pool: Arc<WorkerPool>,
    gate: Arc<ConcurrencyGate>,
    ctx: RunContext,
    metrics: Arc<RunMetrics>,
) -> (UnitOutcome, Option<(Document, Vec<EvaluationResult>)>) {
    let unit = example.id.clone();
    let mut progress = UnitProgress::new(&unit);
    metrics.start_unit();

    let staged = run_example_stages(
        &unit, &example, &mut progress, &reader, &converter, &extractor, &evaluators, &pool,
        &gate, &ctx, &metrics,
    )
    .await;

    match staged {
        Ok(pair) => {
            progress.complete();
            metrics.finish_unit(true);
            let outcome = UnitOutcome {
                unit,
                path_identifier: example.path_identifier,
                result: Ok(()),
                transitions: progress.into_transitions(),
            };
            (outcome, Some(pair))
        }
        Err(e) => {
            error!(unit = %unit, error = %e, "Evaluation pipeline failed");
            progress.fail();
            metrics.finish_unit(false);
            let outcome = UnitOutcome {
                unit,
                path_identifier: example.path_identifier,
                result: Err(e),
                transitions: progress.into_transitions(),
            };
            (outcome, None)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_example_stages<S: ExtractionSchema>(
    unit: &str,
    example: &EvaluationExample<S>,
    progress: &mut UnitProgress,
    reader: &Arc<dyn Reader>,
    converter: &Arc<dyn Converter>,
    extractor: &Arc<dyn Extractor<S>>,
    evaluators: &[Arc<dyn Evaluator<S>>],
    pool: &WorkerPool,
    gate: &ConcurrencyGate,
    ctx: &RunContext,
    metrics: &Arc<RunMetrics>,
) -> Result<(Document, Vec<EvaluationResult>), PipelineError> {
    progress.transition_to(UnitStage::Ingesting);
    let document = ingest_unit(
        unit,
        &example.path_identifier,
        reader,
        converter,
        pool,
        ctx,
        metrics,
    )
    .await?;

    // Permit held across extraction and the pooled evaluator calls, matching
    // the extraction pipeline's single-permit unit block.
    let results = gate
        .run(async {
            progress.transition_to(UnitStage::Extracting);
            let pred = extractor
                .extract(&document, ctx)
                .await
                .map_err(|e| PipelineError::stage(StageKind::Extract, unit, e))?;
            metrics.record_extraction();

            progress.transition_to(UnitStage::Evaluating);
            // Every evaluator scores the same (truth, pred) pair; the result
            // list follows the configured evaluator order.
            let mut pending = Vec::with_capacity(evaluators.len());
            for evaluator in evaluators {
                let evaluator = Arc::clone(evaluator);
                let truth = example.truth.clone();
                let pred = pred.clone();
                let ctx = ctx.clone();
                let unit = unit.to_string();
                pending.push(pool.submit(move || {
                    evaluator
                        .evaluate(&truth, &pred, &ctx)
                        .map_err(|e| PipelineError::stage(StageKind::Evaluate, unit.as_str(), e))
                }));
            }

            let mut results = Vec::with_capacity(pending.len());
            for submitted in future::join_all(pending).await {
                let result = submitted??;
                metrics.record_evaluation();
                results.push(result);
            }
            Ok::<_, PipelineError>(results)
        })
        .await??;

    Ok((document, results))
}
