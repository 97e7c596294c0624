use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Key under which the cross-table rule set lives in the metadata document.
const GLOBAL_KEY: &str = "_global";

/// Longest the rendered metadata prompt may get before truncation.
pub const METADATA_PROMPT_LIMIT: usize = 80_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub avoid_select_star: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub schema: Vec<ColumnMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_rows: Vec<BTreeMap<String, serde_json::Value>>,
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_identifier: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spatial_identifier: Vec<String>,
}

/// A join rule endpoint pair, e.g. `["claims.GEOID", "census_tracts.GEOID"]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinPair {
    #[serde(default)]
    pub pair: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyBasedRules {
    #[serde(default)]
    pub direct: Vec<JoinPair>,
    #[serde(default)]
    pub concat: Vec<JoinPair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialRules {
    #[serde(default)]
    pub point_polygon: Vec<JoinPair>,
    #[serde(default)]
    pub polygon_polygon: Vec<JoinPair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRules {
    #[serde(default)]
    pub key_based: KeyBasedRules,
    #[serde(default)]
    pub spatial: SpatialRules,
}

/// The `_global` section: join rules plus the free-form guidance the prompt
/// assembler serializes for the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalRules {
    #[serde(default)]
    pub join_rules: JoinRules,
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub triple_table_notes: Vec<String>,
    #[serde(default)]
    pub spatial_function_notes: Vec<String>,
    #[serde(default)]
    pub basic_function_notes: Vec<String>,
}

/// The full metadata document: one entry per table plus the global rule set.
/// Immutable once loaded; shared read-only across all questions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tables: BTreeMap<String, TableMeta>,
    pub global: GlobalRules,
}

impl Catalog {
    pub fn load(path: &Path) -> anyhow::Result<Catalog> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read metadata {}: {}", path.display(), e))?;
        Catalog::from_json_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid metadata {}: {}", path.display(), e))
    }

    /// The document is keyed by table name with `_global` interleaved, so it
    /// is split by hand rather than derived.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Catalog> {
        let doc: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut tables = BTreeMap::new();
        let mut global = GlobalRules::default();
        for (name, value) in doc {
            if name == GLOBAL_KEY {
                global = serde_json::from_value(value)
                    .map_err(|e| anyhow::anyhow!("bad {} section: {}", GLOBAL_KEY, e))?;
            } else {
                let meta: TableMeta = serde_json::from_value(value)
                    .map_err(|e| anyhow::anyhow!("bad table entry {}: {}", name, e))?;
                tables.insert(name, meta);
            }
        }
        Ok(Catalog { tables, global })
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        let mut doc = serde_json::Map::new();
        for (name, meta) in &self.tables {
            doc.insert(name.clone(), serde_json::to_value(meta)?);
        }
        doc.insert(GLOBAL_KEY.into(), serde_json::to_value(&self.global)?);
        Ok(serde_json::to_string_pretty(&serde_json::Value::Object(doc))?)
    }

    /// One retrieval corpus entry per table: the table name followed by a
    /// `name: description` line per column.
    pub fn table_texts(&self) -> Vec<(String, String)> {
        self.tables
            .iter()
            .map(|(name, meta)| {
                let mut parts = vec![name.clone()];
                for col in &meta.schema {
                    parts.push(format!("{}: {}", col.column_name, col.description));
                }
                (name.clone(), parts.join("\n"))
            })
            .collect()
    }

    /// Column-level corpus for a single table: `(column_name, text)` pairs.
    pub fn column_texts(&self, table: &str) -> Vec<(String, String)> {
        self.tables
            .get(table)
            .map(|meta| {
                meta.schema
                    .iter()
                    .map(|col| {
                        (
                            col.column_name.clone(),
                            format!("{}: {}", col.column_name, col.description),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Author-maintained column descriptions and global rules, merged with the
/// live parquet schema by `build_catalog`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Descriptions {
    #[serde(default)]
    pub tables: BTreeMap<String, TableDescription>,
    #[serde(default)]
    pub global: GlobalRules,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDescription {
    #[serde(default)]
    pub layer_category: Option<String>,
    #[serde(default)]
    pub key_identifier: Vec<String>,
    #[serde(default)]
    pub spatial_identifier: Vec<String>,
    #[serde(default)]
    pub meta: Option<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl Descriptions {
    pub fn load(path: &Path) -> anyhow::Result<Descriptions> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read descriptions {}: {}", path.display(), e)
        })?;
        serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid descriptions {}: {}", path.display(), e))
    }

    fn describe(&self, table: &str, column: &str) -> String {
        // Parquet layers occasionally ship the geometry column as `geom`.
        let column = if column == "geom" { "geometry" } else { column };
        self.tables
            .get(table)
            .and_then(|t| t.columns.get(column))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

const INDEXED_COLUMNS: [&str; 4] = ["GEOID", "STATEFP", "COUNTYFP", "COUNTYFIPS"];

/// Builds the metadata document from the live parquet schema plus the
/// descriptions document: per table, the typed schema with descriptions and
/// index hints, the row count, and a few sample rows.
pub fn build_catalog(
    store: &crate::dataset::DatasetStore,
    conn: &duckdb::Connection,
    desc: &Descriptions,
    sample_rows: usize,
) -> anyhow::Result<Catalog> {
    let mut tables = BTreeMap::new();

    for name in store.table_names() {
        let mut schema = Vec::new();
        for (column_name, column_type) in store.describe(conn, &name)? {
            let indexed = INDEXED_COLUMNS.contains(&column_name.as_str())
                || column_name == "geometry";
            schema.push(ColumnMeta {
                description: desc.describe(&name, &column_name),
                avoid_select_star: column_name == "geometry",
                indexed,
                column_name,
                column_type: Some(column_type),
            });
        }

        let row_count = store.row_count(conn, &name)?;
        let samples = store.sample_rows(conn, &name, sample_rows)?;
        let table_desc = desc.tables.get(&name);

        tables.insert(
            name.clone(),
            TableMeta {
                file: store.table_file(&name),
                row_count: Some(row_count),
                schema,
                sample_rows: samples,
                meta: table_desc.and_then(|t| t.meta.clone()),
                layer_category: table_desc.and_then(|t| t.layer_category.clone()),
                key_identifier: table_desc.map(|t| t.key_identifier.clone()).unwrap_or_default(),
                spatial_identifier: table_desc
                    .map(|t| t.spatial_identifier.clone())
                    .unwrap_or_default(),
            },
        );
        tracing::info!(table = %name, rows = row_count, "catalog entry built");
    }

    Ok(Catalog {
        tables,
        global: desc.global.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "svi": {
            "file": "svi_tx_fl_la.parquet",
            "row_count": 2,
            "schema": [
                {"column_name": "GEOID", "description": "11-digit census tract identifier", "indexed": true},
                {"column_name": "RPL_THEMES", "description": "overall SVI percentile"}
            ],
            "_meta": "Social Vulnerability Index table",
            "key_identifier": ["GEOID"]
        },
        "_global": {
            "join_rules": {
                "key_based": {"direct": [{"pair": ["svi.GEOID", "county.GEOID"]}]}
            },
            "notes": ["GEOID is a string; do not cast to BIGINT."]
        }
    }"#;

    #[test]
    fn parses_tables_and_global() {
        let cat = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(cat.tables.len(), 1);
        let svi = &cat.tables["svi"];
        assert_eq!(svi.schema.len(), 2);
        assert!(svi.schema[0].indexed);
        assert_eq!(cat.global.join_rules.key_based.direct.len(), 1);
        assert_eq!(cat.global.notes.len(), 1);
    }

    #[test]
    fn corpus_texts_skip_global() {
        let cat = Catalog::from_json_str(SAMPLE).unwrap();
        let texts = cat.table_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].1.starts_with("svi\n"));
        assert!(texts[0].1.contains("RPL_THEMES: overall SVI percentile"));

        let cols = cat.column_texts("svi");
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].0, "GEOID");
        assert!(cat.column_texts("missing").is_empty());
    }

    #[test]
    fn json_roundtrip_keeps_global_key() {
        let cat = Catalog::from_json_str(SAMPLE).unwrap();
        let out = cat.to_json_string().unwrap();
        assert!(out.contains("\"_global\""));
        let back = Catalog::from_json_str(&out).unwrap();
        assert_eq!(back.tables.len(), cat.tables.len());
    }
}
