use async_trait::async_trait;
use floodsql_core::embeddings::util::cosine_similarity;
use floodsql_core::metrics_api::{EvalContext, Metric, MetricResult};
use floodsql_core::model::{Generated, RunRecord};

const DEFAULT_MIN_SCORE: f64 = 0.80;
const EPSILON: f64 = 1e-6;

/// Embedding similarity between reference and predicted SQL. Cheaper than
/// execution and usable without the dataset on disk, at the cost of being
/// an approximation of correctness.
pub struct SemanticSimilarityMetric;

#[async_trait]
impl Metric for SemanticSimilarityMetric {
    fn name(&self) -> &'static str {
        "semantic_similarity"
    }

    async fn evaluate(&self, rec: &RunRecord, ctx: &EvalContext) -> anyhow::Result<MetricResult> {
        let embedder = ctx
            .embedder
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("semantic_similarity requires an embedder"))?;

        let sql = match rec.generated() {
            Generated::Sql(sql) => sql,
            Generated::Failed { reason, detail } => {
                return Ok(MetricResult::fail(
                    0.0,
                    &format!("no generated SQL ({}): {}", reason, detail),
                ));
            }
        };

        let gt_sql = rec
            .gt_sql
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("item {} has no reference SQL", rec.id))?;

        let gen_vec = embedder.embed(&sql).await?;
        let gt_vec = embedder.embed(gt_sql).await?;
        let score = cosine_similarity(&gt_vec, &gen_vec)?;

        // Rounding guard for scores sitting exactly on the threshold.
        let passed = score + EPSILON >= DEFAULT_MIN_SCORE;

        Ok(MetricResult {
            score,
            passed,
            details: serde_json::json!({
                "score": score,
                "min_score": DEFAULT_MIN_SCORE,
                "model": embedder.model_id(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodsql_core::providers::embedder::FakeEmbedder;
    use std::sync::Arc;

    fn ctx() -> EvalContext {
        let mut ctx = EvalContext::new();
        ctx.embedder = Some(Arc::new(FakeEmbedder::default()));
        ctx
    }

    fn record(generated: Option<&str>) -> RunRecord {
        RunRecord {
            id: "L3_0001".into(),
            question: "q".into(),
            gt_sql: Some("SELECT COUNT(*) FROM claims WHERE STATEFP = '48'".into()),
            generated_sql: generated.map(|s| s.to_string()),
            error: None,
            error_reason: None,
            chosen_tables: vec![],
            chosen_columns: Default::default(),
            table_scores: vec![],
        }
    }

    #[tokio::test]
    async fn identical_sql_scores_one() {
        let rec = record(Some("SELECT COUNT(*) FROM claims WHERE STATEFP = '48'"));
        let result = SemanticSimilarityMetric.evaluate(&rec, &ctx()).await.unwrap();
        assert!(result.passed);
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unrelated_sql_scores_lower() {
        let near = SemanticSimilarityMetric
            .evaluate(
                &record(Some("SELECT COUNT(*) FROM claims WHERE STATEFP = '22'")),
                &ctx(),
            )
            .await
            .unwrap();
        let far = SemanticSimilarityMetric
            .evaluate(
                &record(Some("WITH z AS (SELECT geometry FROM zcta) SELECT * FROM z")),
                &ctx(),
            )
            .await
            .unwrap();
        assert!(near.score > far.score);
    }

    #[tokio::test]
    async fn missing_prediction_scores_zero() {
        let result = SemanticSimilarityMetric
            .evaluate(&record(None), &ctx())
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.score, 0.0);
    }
}
