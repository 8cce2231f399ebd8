//! Local file exporters.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RunContext;
use crate::ports::{EvaluationExporter, ExtractionExporter};
use crate::types::{Document, EvaluationResult, ExtractionResult, ExtractionSchema};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalFileExtractionExporterConfig {
    pub destination: PathBuf,
}

/// Writes one `result_{document_id}.json` file per extracted document.
pub struct LocalFileExtractionExporter {
    destination: PathBuf,
}

impl LocalFileExtractionExporter {
    pub fn new(config: LocalFileExtractionExporterConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.destination).with_context(|| {
            format!(
                "failed to create export destination {}",
                config.destination.display()
            )
        })?;
        Ok(Self {
            destination: config.destination,
        })
    }
}

#[async_trait]
impl<S: ExtractionSchema> ExtractionExporter<S> for LocalFileExtractionExporter {
    async fn export(
        &self,
        document: &Document,
        result: &ExtractionResult<S>,
        _ctx: &RunContext,
    ) -> Result<()> {
        let out_path = self
            .destination
            .join(format!("result_{}.json", sanitize_id(document.id())));
        let payload = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&out_path, payload)
            .await
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalFileEvaluationExporterConfig {
    pub destination: PathBuf,
}

/// Writes a single `evaluation_summary.json` for the whole run: one row per
/// document plus cross-example per-metric means. Needing the full result set
/// for those means is exactly why the evaluation pipeline exports once, in
/// aggregate.
pub struct LocalFileEvaluationExporter {
    destination: PathBuf,
}

impl LocalFileEvaluationExporter {
    pub fn new(config: LocalFileEvaluationExporterConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.destination).with_context(|| {
            format!(
                "failed to create export destination {}",
                config.destination.display()
            )
        })?;
        Ok(Self {
            destination: config.destination,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EvaluationSummary {
    run_id: Uuid,
    generated_at: DateTime<Utc>,
    documents: Vec<DocumentRow>,
    metric_means: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentRow {
    document_id: String,
    source_path: String,
    results: Vec<EvaluationResult>,
}

#[async_trait]
impl EvaluationExporter for LocalFileEvaluationExporter {
    async fn export(
        &self,
        results: &[(Document, Vec<EvaluationResult>)],
        ctx: &RunContext,
    ) -> Result<()> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut documents = Vec::with_capacity(results.len());
        for (document, metrics) in results {
            for metric in metrics {
                let entry = sums.entry(metric.name.clone()).or_insert((0.0, 0));
                entry.0 += metric.result;
                entry.1 += 1;
            }
            documents.push(DocumentRow {
                document_id: document.id().to_string(),
                source_path: document.path_identifier().path.clone(),
                results: metrics.clone(),
            });
        }
        let metric_means = sums
            .into_iter()
            .map(|(name, (sum, count))| (name, sum / count as f64))
            .collect();

        let summary = EvaluationSummary {
            run_id: ctx.run_id(),
            generated_at: Utc::now(),
            documents,
            metric_means,
        };

        let out_path = self.destination.join("evaluation_summary.json");
        let payload = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(&out_path, payload)
            .await
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok(())
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
