use crate::embeddings::util::{decode_vec_f32, encode_vec_f32};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Local harness state: the embedding cache and run bookkeeping. The
/// benchmark corpus is static, so cached table/column embeddings make
/// repeated runs cheap and keep unit runs off the network entirely.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn get_embedding(&self, key: &str) -> anyhow::Result<Option<(String, Vec<f32>)>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT model, vec FROM embeddings WHERE key = ?1",
                params![key],
                |row| {
                    let model: String = row.get(0)?;
                    let blob: Vec<u8> = row.get(1)?;
                    Ok((model, blob))
                },
            )
            .optional()?;
        match row {
            Some((model, blob)) => Ok(Some((model, decode_vec_f32(&blob)?))),
            None => Ok(None),
        }
    }

    pub fn put_embedding(&self, key: &str, model: &str, vec: &[f32]) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO embeddings (key, model, dims, vec, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                model,
                vec.len() as i64,
                encode_vec_f32(vec),
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn create_run(&self, kind: &str, model: Option<&str>) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO runs (kind, model, started_at) VALUES (?1, ?2, ?3)",
            params![kind, model, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_run(&self, run_id: i64, items: usize, status: &str) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE runs SET finished_at = ?1, items = ?2, status = ?3 WHERE id = ?4",
            params![
                chrono::Utc::now().to_rfc3339(),
                items as i64,
                status,
                run_id
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_cache_roundtrip() -> anyhow::Result<()> {
        let store = Store::memory()?;
        store.init_schema()?;

        let key = "emb|fake:bow-256|abc";
        assert!(store.get_embedding(key)?.is_none());

        let v = vec![0.5f32, -1.25, 2.0];
        store.put_embedding(key, "fake:bow-256", &v)?;
        let (model, back) = store.get_embedding(key)?.expect("cached vector");
        assert_eq!(model, "fake:bow-256");
        assert_eq!(back, v);
        Ok(())
    }

    #[test]
    fn run_bookkeeping() -> anyhow::Result<()> {
        let store = Store::memory()?;
        store.init_schema()?;
        let id = store.create_run("run", Some("gpt-test"))?;
        store.finalize_run(id, 12, "completed")?;
        Ok(())
    }

    #[test]
    fn open_creates_parent_dirs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/cache.db");
        let store = Store::open(&path)?;
        store.init_schema()?;
        assert!(path.exists());
        Ok(())
    }
}
