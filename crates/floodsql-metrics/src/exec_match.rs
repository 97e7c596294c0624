use async_trait::async_trait;
use floodsql_core::dataset::results_match;
use floodsql_core::metrics_api::{EvalContext, Metric, MetricResult};
use floodsql_core::model::{Generated, RunRecord};

/// Execution correctness: run the predicted SQL against the dataset store
/// and compare its result set to the reference. A missing prediction, an
/// execution error, or a timeout scores 0; only the reference SQL failing
/// (a corpus bug) surfaces as a metric error.
pub struct ExecMatchMetric;

#[async_trait]
impl Metric for ExecMatchMetric {
    fn name(&self) -> &'static str {
        "exec_match"
    }

    async fn evaluate(&self, rec: &RunRecord, ctx: &EvalContext) -> anyhow::Result<MetricResult> {
        let store = ctx
            .store
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("exec_match requires a dataset store"))?;

        let sql = match rec.generated() {
            Generated::Sql(sql) => sql,
            Generated::Failed { reason, detail } => {
                return Ok(MetricResult::fail(
                    0.0,
                    &format!("no generated SQL ({}): {}", reason, detail),
                ));
            }
        };

        let predicted = match store.run_query(&sql, ctx.query_timeout).await {
            Ok(output) => output,
            Err(failure) => {
                return Ok(MetricResult::fail(0.0, &failure.to_string()));
            }
        };

        // Precomputed expectations win; the reference SQL only re-runs when
        // the benchmark file carries neither rows nor a row count.
        if let Some(expected) = ctx.expected.get(&rec.id) {
            if let Some(rows) = &expected.rows {
                return Ok(compare(rows.len(), &predicted.rows, results_match(rows, &predicted.rows)));
            }
            if let Some(count) = expected.row_count {
                let matched = predicted.rows.len() == count;
                return Ok(compare(count, &predicted.rows, matched));
            }
        }

        let gt_sql = rec
            .gt_sql
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("item {} has no reference SQL", rec.id))?;
        let reference = store
            .run_query(gt_sql, ctx.query_timeout)
            .await
            .map_err(|f| anyhow::anyhow!("reference SQL failed for {}: {}", rec.id, f))?;

        Ok(compare(
            reference.rows.len(),
            &predicted.rows,
            results_match(&reference.rows, &predicted.rows),
        ))
    }
}

fn compare(
    expected_rows: usize,
    predicted: &[Vec<floodsql_core::dataset::SqlValue>],
    matched: bool,
) -> MetricResult {
    if matched {
        MetricResult::pass(1.0)
    } else {
        MetricResult {
            score: 0.0,
            passed: false,
            details: serde_json::json!({
                "message": format!(
                    "result mismatch (expected {} rows, got {})",
                    expected_rows,
                    predicted.len()
                ),
                "expected_rows": expected_rows,
                "predicted_rows": predicted.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodsql_core::dataset::DatasetStore;
    use floodsql_core::metrics_api::ExpectedResult;
    use std::sync::Arc;

    fn ctx() -> EvalContext {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::discover(dir.path()).unwrap();
        let mut ctx = EvalContext::new();
        ctx.store = Some(Arc::new(store));
        // tempdir is dropped here; the store only keeps the path and the
        // queries under test reference no table.
        ctx
    }

    fn record(generated: Option<&str>, gt: &str) -> RunRecord {
        RunRecord {
            id: "L0_0001".into(),
            question: "q".into(),
            gt_sql: Some(gt.into()),
            generated_sql: generated.map(|s| s.to_string()),
            error: generated.is_none().then(|| "api error".to_string()),
            error_reason: None,
            chosen_tables: vec![],
            chosen_columns: Default::default(),
            table_scores: vec![],
        }
    }

    #[tokio::test]
    async fn equivalent_sql_scores_one() {
        let result = ExecMatchMetric
            .evaluate(&record(Some("SELECT 2"), "SELECT 1 + 1"), &ctx())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn wrong_result_scores_zero() {
        let result = ExecMatchMetric
            .evaluate(&record(Some("SELECT 3"), "SELECT 1 + 1"), &ctx())
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn missing_prediction_scores_zero_without_error() {
        let result = ExecMatchMetric
            .evaluate(&record(None, "SELECT 1"), &ctx())
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn broken_prediction_scores_zero_without_error() {
        let result = ExecMatchMetric
            .evaluate(&record(Some("SELECT FROM nothing"), "SELECT 1"), &ctx())
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn precomputed_row_count_is_used() {
        let mut context = ctx();
        context.expected.insert(
            "L0_0001".into(),
            ExpectedResult {
                row_count: Some(1),
                rows: None,
            },
        );
        // Reference SQL is broken on purpose: the expected row count must
        // win before the reference would ever run.
        let result = ExecMatchMetric
            .evaluate(&record(Some("SELECT 9"), "SELECT FROM broken"), &context)
            .await
            .unwrap();
        assert!(result.passed);
    }
}
