use crate::dataset::SqlValue;
use crate::metrics_api::{EvalContext, ExpectedResult, Metric};
use crate::model::{RunRecord, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemScore {
    pub id: String,
    pub tier: Tier,
    pub score: f64,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierScore {
    pub tier: Tier,
    pub items: usize,
    pub mean: f64,
}

/// Final evaluation artifact: per-tier means, the overall mean, and the
/// per-item scores they were derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub metric: String,
    pub total_items: usize,
    pub per_tier: Vec<TierScore>,
    pub overall: f64,
    pub items: Vec<ItemScore>,
}

/// Mean score per tier plus the overall mean. Pure and deterministic:
/// scoring the same items twice yields identical aggregates.
pub fn aggregate(items: &[ItemScore]) -> (Vec<TierScore>, f64) {
    let mut by_tier: BTreeMap<Tier, Vec<f64>> = BTreeMap::new();
    for item in items {
        by_tier.entry(item.tier).or_default().push(item.score);
    }
    let per_tier = by_tier
        .into_iter()
        .map(|(tier, scores)| TierScore {
            tier,
            items: scores.len(),
            mean: scores.iter().sum::<f64>() / scores.len() as f64,
        })
        .collect();
    let overall = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|i| i.score).sum::<f64>() / items.len() as f64
    };
    (per_tier, overall)
}

/// Loads precomputed reference results from an `exec` results file.
/// Items whose reference failed during the exec pass carry no rows; the
/// evaluator falls back to live reference execution for those.
pub fn load_expected(path: &Path) -> anyhow::Result<HashMap<String, ExpectedResult>> {
    let items = crate::model::load_benchmark(path)?;
    let mut expected = HashMap::with_capacity(items.len());
    for item in items {
        let rows = item.result.as_ref().map(|rows| {
            rows.iter()
                .map(|row| row.iter().map(SqlValue::from_json).collect())
                .collect()
        });
        expected.insert(
            item.id.clone(),
            ExpectedResult {
                row_count: item.row_count,
                rows,
            },
        );
    }
    Ok(expected)
}

/// Scores every record with the given metric. A metric error on one item
/// counts that item as incorrect; it never aborts the pass, so the report
/// always covers the full record set. An empty record set yields an empty
/// report, not an error.
pub async fn evaluate(
    records: &[RunRecord],
    metric: Arc<dyn Metric>,
    ctx: &EvalContext,
) -> anyhow::Result<EvalReport> {
    let mut items = Vec::with_capacity(records.len());
    for rec in records {
        let tier = rec.tier()?;
        let item = match metric.evaluate(rec, ctx).await {
            Ok(result) => ItemScore {
                id: rec.id.clone(),
                tier,
                score: result.score.clamp(0.0, 1.0),
                passed: result.passed,
                message: result
                    .details
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or_default()
                    .to_string(),
            },
            Err(e) => {
                tracing::warn!(id = %rec.id, error = %e, "metric error; scoring item 0");
                ItemScore {
                    id: rec.id.clone(),
                    tier,
                    score: 0.0,
                    passed: false,
                    message: format!("metric error: {}", e),
                }
            }
        };
        items.push(item);
    }

    let (per_tier, overall) = aggregate(&items);
    Ok(EvalReport {
        metric: metric.name().to_string(),
        total_items: items.len(),
        per_tier,
        overall,
        items,
    })
}
