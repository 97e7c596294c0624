use std::sync::Arc;

use floodsql_core::errors::ConfigError;
use floodsql_core::metrics_api::Metric;

mod exec_match;
mod semantic;

pub use exec_match::ExecMatchMetric;
pub use semantic::SemanticSimilarityMetric;

/// Resolves an evaluation mode name to its metric.
pub fn metric_for_mode(mode: &str) -> Result<Arc<dyn Metric>, ConfigError> {
    match mode {
        "exec" => Ok(Arc::new(ExecMatchMetric)),
        "semantic" => Ok(Arc::new(SemanticSimilarityMetric)),
        other => Err(ConfigError(format!(
            "unknown eval mode '{}' (expected exec|semantic)",
            other
        ))),
    }
}
