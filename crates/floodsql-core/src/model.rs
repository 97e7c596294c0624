use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Difficulty tier, parsed from the benchmark item id prefix (`L4_0020` -> L4).
/// Ordered by join complexity: L0 single-table up to L5 triple-table hybrid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl Tier {
    pub const ALL: [Tier; 6] = [Tier::L0, Tier::L1, Tier::L2, Tier::L3, Tier::L4, Tier::L5];

    pub fn from_item_id(id: &str) -> anyhow::Result<Tier> {
        let prefix = id.split('_').next().unwrap_or(id);
        prefix.parse()
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L0" => Ok(Tier::L0),
            "L1" => Ok(Tier::L1),
            "L2" => Ok(Tier::L2),
            "L3" => Ok(Tier::L3),
            "L4" => Ok(Tier::L4),
            "L5" => Ok(Tier::L5),
            other => anyhow::bail!("unknown difficulty tier: {}", other),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::L0 => "L0",
            Tier::L1 => "L1",
            Tier::L2 => "L2",
            Tier::L3 => "L3",
            Tier::L4 => "L4",
            Tier::L5 => "L5",
        };
        f.write_str(s)
    }
}

/// One question of the benchmark set. Read-only during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItem {
    pub id: String,
    pub question: String,
    pub sql: String,
    /// Row count captured by a prior `exec` pass over the reference SQL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    /// Result rows captured by a prior `exec` pass over the reference SQL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Vec<serde_json::Value>>>,
}

impl BenchmarkItem {
    pub fn tier(&self) -> anyhow::Result<Tier> {
        Tier::from_item_id(&self.id)
    }
}

/// Loads a benchmark file. Accepts both layouts the corpus ships:
/// a JSON array of items, or line-delimited JSON.
pub fn load_benchmark(path: &Path) -> anyhow::Result<Vec<BenchmarkItem>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read benchmark {}: {}", path.display(), e))?;

    let items: Vec<BenchmarkItem> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid benchmark JSON {}: {}", path.display(), e))?
    } else {
        let mut out = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let item: BenchmarkItem = serde_json::from_str(line).map_err(|e| {
                anyhow::anyhow!("invalid JSONL at {}:{}: {}", path.display(), lineno + 1, e)
            })?;
            out.push(item);
        }
        out
    };

    // Tier prefixes are part of the id contract; reject bad ones at load time.
    for item in &items {
        item.tier()
            .map_err(|e| anyhow::anyhow!("item {}: {}", item.id, e))?;
    }
    Ok(items)
}

/// Why a generation produced no SQL. Kept coarse on purpose: the corpus does
/// not root-cause model failures, it only needs them to not abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The model endpoint returned an error.
    Api,
    /// The call exceeded the per-item timeout.
    Timeout,
    /// The response carried no extractable SQL.
    Empty,
    /// Candidate retrieval failed (embedding service unavailable).
    Retrieval,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Api => "api",
            FailureReason::Timeout => "timeout",
            FailureReason::Empty => "empty",
            FailureReason::Retrieval => "retrieval",
        };
        f.write_str(s)
    }
}

/// Outcome of one generation attempt. An explicit variant instead of a
/// sentinel null, so aggregation code has to handle the failure arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Sql(String),
    Failed { reason: FailureReason, detail: String },
}

impl Generated {
    pub fn sql(&self) -> Option<&str> {
        match self {
            Generated::Sql(s) => Some(s),
            Generated::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Generated::Failed { .. })
    }
}

/// Per-item result produced by the runner and consumed by the evaluator.
///
/// The wire format mirrors the published results files: `generated_sql` is
/// null on failure and an `error` string carries the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt_sql: Option<String>,
    pub generated_sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chosen_tables: Vec<String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub chosen_columns: std::collections::BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_scores: Vec<(String, f64)>,
}

impl RunRecord {
    pub fn tier(&self) -> anyhow::Result<Tier> {
        Tier::from_item_id(&self.id)
    }

    pub fn generated(&self) -> Generated {
        match &self.generated_sql {
            Some(sql) => Generated::Sql(sql.clone()),
            None => Generated::Failed {
                reason: self.error_reason.clone().unwrap_or(FailureReason::Api),
                detail: self.error.clone().unwrap_or_default(),
            },
        }
    }

    pub fn set_generated(&mut self, outcome: Generated) {
        match outcome {
            Generated::Sql(sql) => {
                self.generated_sql = Some(sql);
                self.error = None;
                self.error_reason = None;
            }
            Generated::Failed { reason, detail } => {
                self.generated_sql = None;
                self.error = Some(detail);
                self.error_reason = Some(reason);
            }
        }
    }
}

/// Loads a predictions file (runner output), line-delimited JSON.
pub fn load_run_records(path: &Path) -> anyhow::Result<Vec<RunRecord>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read predictions {}: {}", path.display(), e))?;
    let mut out = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let rec: RunRecord = serde_json::from_str(line).map_err(|e| {
            anyhow::anyhow!("invalid JSONL at {}:{}: {}", path.display(), lineno + 1, e)
        })?;
        out.push(rec);
    }
    Ok(out)
}

/// One message of the assembled prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}
