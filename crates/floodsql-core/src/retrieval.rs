use crate::catalog::Catalog;
use crate::embeddings::util::{cosine_similarity, embed_cache_key};
use crate::model::Tier;
use crate::providers::embedder::Embedder;
use crate::storage::Store;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Columns kept per chosen table.
pub const COLUMNS_PER_TABLE: usize = 5;

/// Table candidates per question, keyed on join complexity: harder tiers
/// need more tables in context.
pub fn top_k_for(tier: Tier) -> usize {
    match tier {
        Tier::L0 => 3,
        Tier::L1 | Tier::L2 => 4,
        Tier::L3 | Tier::L4 | Tier::L5 => 5,
    }
}

/// A column selected as likely relevant to a question.
#[derive(Debug, Clone)]
pub struct ColumnHit {
    pub name: String,
    pub score: f64,
    pub text: String,
}

/// Retriever output for one question: tables in rank order, then the top
/// columns within each chosen table.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub tables: Vec<(String, f64)>,
    pub columns: BTreeMap<String, Vec<ColumnHit>>,
}

impl RetrievedContext {
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|(t, _)| t.clone()).collect()
    }
}

/// Ranks corpus entries against a query vector by cosine similarity.
/// Pure over precomputed embeddings; ties break on name so the ordering is
/// deterministic.
pub fn rank(query: &[f32], corpus: &[(String, Vec<f32>)]) -> anyhow::Result<Vec<(String, f64)>> {
    let mut scored = Vec::with_capacity(corpus.len());
    for (name, vec) in corpus {
        scored.push((name.clone(), cosine_similarity(query, vec)?));
    }
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(scored)
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Store,
    refresh: bool,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Store) -> Self {
        Self {
            embedder,
            store,
            refresh: false,
        }
    }

    pub fn refresh_embeddings(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub async fn embed_cached(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let model_id = self.embedder.model_id();
        let key = embed_cache_key(&model_id, text);
        if !self.refresh {
            if let Some((_model, vec)) = self.store.get_embedding(&key)? {
                return Ok(vec);
            }
        }
        let vec = self.embedder.embed(text).await?;
        self.store.put_embedding(&key, &model_id, &vec)?;
        Ok(vec)
    }

    async fn embed_corpus(
        &self,
        texts: Vec<(String, String)>,
    ) -> anyhow::Result<Vec<(String, Vec<f32>)>> {
        let mut out = Vec::with_capacity(texts.len());
        for (name, text) in texts {
            out.push((name, self.embed_cached(&text).await?));
        }
        Ok(out)
    }

    /// Top-K tables by description similarity, then the top columns within
    /// each. An embedder failure propagates; the caller records it as a
    /// per-item retrieval failure.
    pub async fn retrieve(
        &self,
        catalog: &Catalog,
        question: &str,
        top_k: usize,
    ) -> anyhow::Result<RetrievedContext> {
        let q = self.embed_cached(question).await?;

        let table_corpus = self.embed_corpus(catalog.table_texts()).await?;
        let mut tables = rank(&q, &table_corpus)?;
        tables.truncate(top_k);

        let mut columns = BTreeMap::new();
        for (table, _score) in &tables {
            let col_texts = catalog.column_texts(table);
            let texts: BTreeMap<String, String> = col_texts.iter().cloned().collect();
            let corpus = self.embed_corpus(col_texts).await?;
            let mut ranked = rank(&q, &corpus)?;
            ranked.truncate(COLUMNS_PER_TABLE);
            let hits = ranked
                .into_iter()
                .map(|(name, score)| {
                    let text = texts.get(&name).cloned().unwrap_or_default();
                    ColumnHit { name, score, text }
                })
                .collect();
            columns.insert(table.clone(), hits);
        }

        Ok(RetrievedContext { tables, columns })
    }
}
