use serde::Deserialize;
use std::path::Path;

/// Dataset repository on the Hugging Face hub.
pub const DEFAULT_REPO: &str = "HanzhouLiu/FloodSQL-Bench";

const HUB_BASE: &str = "https://huggingface.co";

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

async fn list_files(client: &reqwest::Client, repo_id: &str) -> anyhow::Result<Vec<TreeEntry>> {
    let url = format!(
        "{}/api/datasets/{}/tree/main?recursive=true",
        HUB_BASE, repo_id
    );
    let entries: Vec<TreeEntry> = client
        .get(&url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("hub listing failed for {}: {}", repo_id, e))?
        .json()
        .await?;
    Ok(entries)
}

/// Downloads a dataset snapshot into `dest`, mirroring the repository
/// layout. The dataset is public; no credentials involved. Network failure
/// here is fatal: nothing downstream can run without the data.
pub async fn fetch_dataset(repo_id: &str, dest: &Path) -> anyhow::Result<Vec<String>> {
    let client = reqwest::Client::new();
    let entries = list_files(&client, repo_id).await?;

    let mut fetched = Vec::new();
    for entry in entries.iter().filter(|e| e.kind == "file") {
        let url = format!("{}/datasets/{}/resolve/main/{}", HUB_BASE, repo_id, entry.path);
        let target = dest.join(&entry.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %entry.path, size = ?entry.size, "downloading");
        let bytes = client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("download failed for {}: {}", entry.path, e))?
            .bytes()
            .await?;
        std::fs::write(&target, &bytes)?;
        fetched.push(entry.path.clone());
    }

    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_entry_parses_hub_listing() {
        let raw = r#"[
            {"type": "file", "path": "data/svi_tx_fl_la.parquet", "size": 123, "oid": "abc"},
            {"type": "directory", "path": "data"}
        ]"#;
        let entries: Vec<TreeEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "file");
        assert_eq!(entries[0].size, Some(123));
        assert_eq!(entries[1].kind, "directory");
    }
}
