use crate::catalog::Catalog;
use crate::model::{BenchmarkItem, FailureReason, Generated, RunRecord};
use crate::prompt::{assemble, clean_sql, flatten_sql};
use crate::providers::llm::LlmClient;
use crate::report::RunArtifacts;
use crate::retrieval::{top_k_for, Retriever};
use crate::storage::Store;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub parallel: usize,
    pub timeout: Duration,
    /// Fixed table top-K; when unset, K follows the item's tier.
    pub top_k: Option<usize>,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout: Duration::from_secs(30),
            top_k: None,
        }
    }
}

/// Drives the benchmark: retrieve, assemble, call the model, record the
/// outcome. Items are independent, so they fan out under a bounded
/// semaphore; results keep input order.
#[derive(Clone)]
pub struct Runner {
    pub client: Arc<dyn LlmClient>,
    pub retriever: Arc<Retriever>,
    pub catalog: Arc<Catalog>,
    pub store: Store,
    pub model: String,
    pub policy: RunPolicy,
}

impl Runner {
    pub async fn run_benchmark(&self, items: &[BenchmarkItem]) -> anyhow::Result<RunArtifacts> {
        let run_id = self.store.create_run("run", Some(&self.model))?;

        let parallel = self.policy.parallel.max(1);
        let sem = Arc::new(Semaphore::new(parallel));
        let mut handles = Vec::with_capacity(items.len());

        for item in items.iter() {
            let permit = sem.clone().acquire_owned().await?;
            let this = self.clone();
            let item = item.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                this.run_item(&item).await
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        let mut failed = 0usize;
        for (item, handle) in items.iter().zip(handles) {
            let record = match handle.await {
                Ok(record) => record,
                Err(e) => {
                    // Task panic or cancellation; the item still gets a row.
                    let mut record = base_record(item);
                    record.set_generated(Generated::Failed {
                        reason: FailureReason::Api,
                        detail: format!("task error: {}", e),
                    });
                    record
                }
            };
            if record.generated().is_failed() {
                failed += 1;
            }
            records.push(record);
        }

        self.store.finalize_run(run_id, records.len(), "completed")?;
        tracing::info!(
            run_id,
            items = records.len(),
            failed,
            "benchmark run finished"
        );
        Ok(RunArtifacts {
            run_id,
            model: self.model.clone(),
            records,
        })
    }

    /// Per-item pipeline. Never returns an error: every failure mode folds
    /// into the record's failure variant so the run always completes.
    async fn run_item(&self, item: &BenchmarkItem) -> RunRecord {
        let mut record = base_record(item);

        let top_k = match (self.policy.top_k, item.tier()) {
            (Some(k), _) => k,
            (None, Ok(tier)) => top_k_for(tier),
            // Load-time validation rejects bad ids; fall back to the widest K.
            (None, Err(_)) => 5,
        };

        let retrieved = match self.retriever.retrieve(&self.catalog, &item.question, top_k).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "retrieval failed");
                record.set_generated(Generated::Failed {
                    reason: FailureReason::Retrieval,
                    detail: e.to_string(),
                });
                return record;
            }
        };

        record.chosen_tables = retrieved.table_names();
        record.table_scores = retrieved.tables.clone();
        record.chosen_columns = retrieved
            .columns
            .iter()
            .map(|(t, hits)| (t.clone(), hits.iter().map(|h| h.name.clone()).collect()))
            .collect();

        let messages = assemble(&self.catalog, &retrieved, &item.question);

        let outcome = match timeout(self.policy.timeout, self.client.complete(&messages)).await {
            Err(_) => Generated::Failed {
                reason: FailureReason::Timeout,
                detail: format!("model call exceeded {}s", self.policy.timeout.as_secs()),
            },
            Ok(Err(e)) => Generated::Failed {
                reason: FailureReason::Api,
                detail: e.to_string(),
            },
            Ok(Ok(resp)) => {
                let sql = flatten_sql(&clean_sql(&resp.text));
                if sql.is_empty() {
                    Generated::Failed {
                        reason: FailureReason::Empty,
                        detail: "model returned no SQL".into(),
                    }
                } else {
                    Generated::Sql(sql)
                }
            }
        };

        if let Generated::Failed { reason, detail } = &outcome {
            tracing::warn!(id = %item.id, %reason, detail = %detail, "generation failed");
        }
        record.set_generated(outcome);
        record
    }
}

fn base_record(item: &BenchmarkItem) -> RunRecord {
    RunRecord {
        id: item.id.clone(),
        question: item.question.clone(),
        gt_sql: Some(item.sql.clone()),
        generated_sql: None,
        error: None,
        error_reason: None,
        chosen_tables: vec![],
        chosen_columns: Default::default(),
        table_scores: vec![],
    }
}

/// Writes run records as line-delimited JSON, one record per line.
pub fn write_records(path: &Path, records: &[RunRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatMessage, LlmResponse};
    use crate::providers::embedder::FakeEmbedder;
    use crate::providers::llm::fake::FakeLlm;
    use async_trait::async_trait;

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_json_str(
                r#"{
                "svi": {"schema": [{"column_name": "GEOID", "description": "tract id"}]},
                "county": {"schema": [{"column_name": "NAME", "description": "county name"}]},
                "_global": {}
            }"#,
            )
            .unwrap(),
        )
    }

    fn runner(client: Arc<dyn LlmClient>) -> Runner {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        Runner {
            client,
            retriever: Arc::new(Retriever::new(
                Arc::new(FakeEmbedder::default()),
                store.clone(),
            )),
            catalog: catalog(),
            store,
            model: "fake".into(),
            policy: RunPolicy::default(),
        }
    }

    fn item(id: &str, question: &str) -> BenchmarkItem {
        BenchmarkItem {
            id: id.into(),
            question: question.into(),
            sql: "SELECT 1".into(),
            row_count: None,
            result: None,
        }
    }

    #[tokio::test]
    async fn run_produces_records_in_input_order() -> anyhow::Result<()> {
        let r = runner(Arc::new(FakeLlm));
        let items = vec![item("L0_0001", "first"), item("L1_0002", "second")];
        let artifacts = r.run_benchmark(&items).await?;
        assert_eq!(artifacts.records.len(), 2);
        assert_eq!(artifacts.records[0].id, "L0_0001");
        assert_eq!(artifacts.records[1].id, "L1_0002");
        assert_eq!(artifacts.records[0].generated_sql.as_deref(), Some("SELECT 1"));
        assert!(!artifacts.records[0].chosen_tables.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_benchmark_yields_empty_artifacts() -> anyhow::Result<()> {
        let r = runner(Arc::new(FakeLlm));
        let artifacts = r.run_benchmark(&[]).await?;
        assert!(artifacts.records.is_empty());
        Ok(())
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _messages: &[ChatMessage]) -> anyhow::Result<LlmResponse> {
            anyhow::bail!("upstream 500")
        }

        fn provider_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn api_failure_becomes_failure_variant_and_run_continues() -> anyhow::Result<()> {
        let r = runner(Arc::new(FailingLlm));
        let items = vec![item("L2_0001", "q1"), item("L2_0002", "q2")];
        let artifacts = r.run_benchmark(&items).await?;
        assert_eq!(artifacts.records.len(), 2);
        for record in &artifacts.records {
            assert!(record.generated_sql.is_none());
            assert_eq!(record.error_reason, Some(FailureReason::Api));
            assert!(record.error.as_deref().unwrap_or("").contains("upstream 500"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn records_write_as_jsonl() -> anyhow::Result<()> {
        let r = runner(Arc::new(FakeLlm));
        let artifacts = r.run_benchmark(&[item("L0_0001", "q")]).await?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results/preds.jsonl");
        write_records(&path, &artifacts.records)?;
        let loaded = crate::model::load_run_records(&path)?;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "L0_0001");
        Ok(())
    }
}
