//! Field-level evaluators.
//!
//! Both evaluators compare the top-level fields of the serialized schema
//! instances, so they work for any schema that serializes to a JSON object.

use anyhow::Result;
use serde_json::{Map, Value};

use crate::context::RunContext;
use crate::ports::Evaluator;
use crate::types::{EvaluationResult, ExtractionResult, ExtractionSchema};

fn top_level_fields<S: ExtractionSchema>(data: &S) -> Result<Map<String, Value>> {
    match serde_json::to_value(data)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "schema must serialize to a JSON object for field-level evaluation, got {other}"
        ),
    }
}

/// Field-level exact-match accuracy: the fraction of ground-truth fields
/// whose predicted value is identical.
#[derive(Debug, Default)]
pub struct AccuracyEvaluator;

impl AccuracyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<S: ExtractionSchema> Evaluator<S> for AccuracyEvaluator {
    fn evaluate(
        &self,
        truth: &ExtractionResult<S>,
        pred: &ExtractionResult<S>,
        _ctx: &RunContext,
    ) -> Result<EvaluationResult> {
        let true_fields = top_level_fields(&truth.data)?;
        let pred_fields = top_level_fields(&pred.data)?;

        let total = true_fields.len();
        let matches = true_fields
            .iter()
            .filter(|(key, value)| pred_fields.get(*key) == Some(value))
            .count();
        let accuracy = if total == 0 {
            0.0
        } else {
            matches as f64 / total as f64
        };

        Ok(EvaluationResult {
            name: "accuracy".to_string(),
            result: accuracy,
            description: format!("Field-level exact match accuracy ({matches}/{total})."),
        })
    }
}

/// Field-level F1 over non-null fields.
#[derive(Debug, Default)]
pub struct F1Evaluator;

impl F1Evaluator {
    pub fn new() -> Self {
        Self
    }
}

impl<S: ExtractionSchema> Evaluator<S> for F1Evaluator {
    fn evaluate(
        &self,
        truth: &ExtractionResult<S>,
        pred: &ExtractionResult<S>,
        _ctx: &RunContext,
    ) -> Result<EvaluationResult> {
        let true_fields = top_level_fields(&truth.data)?;
        let pred_fields = top_level_fields(&pred.data)?;

        let mut tp = 0u32;
        let mut fp = 0u32;
        let mut fn_ = 0u32;
        for (key, true_value) in &true_fields {
            let pred_value = pred_fields.get(key).unwrap_or(&Value::Null);
            let true_is_null = true_value.is_null();
            let pred_is_null = pred_value.is_null();
            if true_is_null && pred_is_null {
                continue;
            }
            let is_match = pred_value == true_value;
            if is_match && !true_is_null {
                tp += 1;
                continue;
            }
            if !pred_is_null && !is_match {
                fp += 1;
            }
            if !true_is_null && !is_match {
                fn_ += 1;
            }
        }

        let denom = 2 * tp + fp + fn_;
        let f1 = if denom == 0 {
            0.0
        } else {
            2.0 * f64::from(tp) / f64::from(denom)
        };

        Ok(EvaluationResult {
            name: "f1".to_string(),
            result: f1,
            description: format!("Field-level F1 score (tp={tp}, fp={fp}, fn={fn_})."),
        })
    }
}
