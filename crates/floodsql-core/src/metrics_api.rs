use crate::dataset::{DatasetStore, SqlValue};
use crate::model::RunRecord;
use crate::providers::embedder::Embedder;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MetricResult {
    pub score: f64,
    pub passed: bool,
    pub details: serde_json::Value,
}

impl MetricResult {
    pub fn pass(score: f64) -> Self {
        MetricResult {
            score,
            passed: true,
            details: serde_json::json!({}),
        }
    }

    pub fn fail(score: f64, msg: &str) -> Self {
        MetricResult {
            score,
            passed: false,
            details: serde_json::json!({ "message": msg }),
        }
    }
}

/// Reference answer for one item, precomputed by an `exec` pass so the
/// evaluator does not have to re-run the gold SQL.
#[derive(Debug, Clone, Default)]
pub struct ExpectedResult {
    pub row_count: Option<usize>,
    pub rows: Option<Vec<Vec<SqlValue>>>,
}

/// Shared read-only context handed to metrics. Execution metrics need the
/// dataset store; semantic metrics need the embedder; either may be absent
/// depending on the evaluation mode.
pub struct EvalContext {
    pub store: Option<Arc<DatasetStore>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub query_timeout: Duration,
    pub expected: HashMap<String, ExpectedResult>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            store: None,
            embedder: None,
            query_timeout: Duration::from_secs(30),
            expected: HashMap::new(),
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One way of scoring a run record against its reference, in [0,1].
#[async_trait]
pub trait Metric: Send + Sync {
    fn name(&self) -> &'static str;
    async fn evaluate(&self, rec: &RunRecord, ctx: &EvalContext) -> anyhow::Result<MetricResult>;
}
