use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Suffix the published parquet files carry; logical table names drop it.
const TABLE_SUFFIXES: [&str; 2] = ["_tx_fl_la", "_TX_FL_LA"];

/// A single cell of a query result, normalized for comparison and JSON
/// serialization. Dates and timestamps are rendered to text; both sides of
/// a comparison go through the same rendering, so representation drift
/// cannot produce false mismatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn from_json(v: &serde_json::Value) -> SqlValue {
        match v {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::json!(i),
            SqlValue::Float(f) => {
                if f.is_finite() {
                    serde_json::json!(f)
                } else {
                    serde_json::Value::Null
                }
            }
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::Float(f) => Some(*f),
            SqlValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Equality with numeric tolerance; ints and floats compare numerically.
    pub fn approx_eq(&self, other: &SqlValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(x), Some(y)) => {
                if x == y {
                    return true;
                }
                let scale = 1.0_f64.max(x.abs()).max(y.abs());
                (x - y).abs() <= 1e-6 * scale
            }
            _ => self == other,
        }
    }

    fn sort_key(&self) -> String {
        match self {
            SqlValue::Null => "\u{0}null".into(),
            SqlValue::Bool(b) => format!("b:{}", b),
            SqlValue::Int(i) => format!("n:{:+025.6}", *i as f64),
            SqlValue::Float(f) => format!("n:{:+025.6}", f),
            SqlValue::Text(s) => format!("t:{}", s),
        }
    }

    fn from_value_ref(v: ValueRef<'_>) -> SqlValue {
        match v {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Boolean(b) => SqlValue::Bool(b),
            ValueRef::TinyInt(i) => SqlValue::Int(i as i64),
            ValueRef::SmallInt(i) => SqlValue::Int(i as i64),
            ValueRef::Int(i) => SqlValue::Int(i as i64),
            ValueRef::BigInt(i) => SqlValue::Int(i),
            ValueRef::HugeInt(i) => {
                if let Ok(v) = i64::try_from(i) {
                    SqlValue::Int(v)
                } else {
                    SqlValue::Float(i as f64)
                }
            }
            ValueRef::UTinyInt(i) => SqlValue::Int(i as i64),
            ValueRef::USmallInt(i) => SqlValue::Int(i as i64),
            ValueRef::UInt(i) => SqlValue::Int(i as i64),
            ValueRef::UBigInt(i) => {
                if let Ok(v) = i64::try_from(i) {
                    SqlValue::Int(v)
                } else {
                    SqlValue::Float(i as f64)
                }
            }
            ValueRef::Float(f) => SqlValue::Float(f as f64),
            ValueRef::Double(f) => SqlValue::Float(f),
            ValueRef::Decimal(d) => {
                SqlValue::Float(d.to_string().parse().unwrap_or(f64::NAN))
            }
            ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => SqlValue::Text(format!("BLOB({} bytes)", b.len())),
            ValueRef::Date32(d) => {
                // Days since 1970-01-01; 719163 is that day in the
                // proleptic Gregorian calendar.
                let text = chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| d.to_string());
                SqlValue::Text(text)
            }
            ValueRef::Timestamp(unit, v) => {
                let micros = match unit {
                    TimeUnit::Second => v.saturating_mul(1_000_000),
                    TimeUnit::Millisecond => v.saturating_mul(1_000),
                    TimeUnit::Microsecond => v,
                    TimeUnit::Nanosecond => v / 1_000,
                };
                let text = chrono::DateTime::from_timestamp_micros(micros)
                    .map(|t| t.naive_utc().to_string())
                    .unwrap_or_else(|| v.to_string());
                SqlValue::Text(text)
            }
            other => SqlValue::Text(format!("{:?}", other)),
        }
    }
}

/// Order-insensitive multiset comparison with numeric tolerance. Reference
/// answers in the corpus do not pin row order unless the SQL does, so rows
/// are canonicalized before the pairwise check.
pub fn results_match(a: &[Vec<SqlValue>], b: &[Vec<SqlValue>]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let canon = |rows: &[Vec<SqlValue>]| {
        let mut sorted: Vec<Vec<SqlValue>> = rows.to_vec();
        sorted.sort_by_key(|row| {
            row.iter()
                .map(SqlValue::sort_key)
                .collect::<Vec<_>>()
                .join("|")
        });
        sorted
    };
    let sa = canon(a);
    let sb = canon(b);
    sa.iter().zip(sb.iter()).all(|(ra, rb)| {
        ra.len() == rb.len() && ra.iter().zip(rb.iter()).all(|(x, y)| x.approx_eq(y))
    })
}

#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub rows: Vec<Vec<SqlValue>>,
    pub elapsed: Duration,
}

/// Per-query failure. Timeouts are tracked apart from execution errors so
/// the error summary can report them separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error_type", content = "error")]
pub enum QueryFailure {
    Timeout(String),
    Execution(String),
}

impl std::fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryFailure::Timeout(m) => write!(f, "timeout: {}", m),
            QueryFailure::Execution(m) => write!(f, "execution error: {}", m),
        }
    }
}

pub fn normalize_table_name(file_stem: &str) -> String {
    for suffix in TABLE_SUFFIXES {
        if let Some(base) = file_stem.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    file_stem.to_string()
}

/// The dataset store: parquet files exposed as DuckDB views. Sessions are
/// opened per query batch; a hung query only strands its own session.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    data_dir: PathBuf,
    tables: BTreeMap<String, PathBuf>,
}

impl DatasetStore {
    /// Scans the data directory for parquet files. An empty directory is
    /// allowed (queries that reference no table still run).
    pub fn discover(data_dir: &Path) -> anyhow::Result<DatasetStore> {
        let mut tables = BTreeMap::new();
        let entries = std::fs::read_dir(data_dir)
            .map_err(|e| anyhow::anyhow!("failed to read data dir {}: {}", data_dir.display(), e))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            tables.insert(normalize_table_name(&stem), path);
        }
        Ok(DatasetStore {
            data_dir: data_dir.to_path_buf(),
            tables,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Basename of the parquet file backing a table.
    pub fn table_file(&self, table: &str) -> Option<String> {
        self.tables.get(table).and_then(|p| {
            p.file_name()
                .and_then(|f| f.to_str())
                .map(|f| f.to_string())
        })
    }

    /// Opens an in-memory session with the parquet views registered. The
    /// spatial extension is best-effort: key-based queries work without it,
    /// so a load failure downgrades to a warning.
    pub fn open_session(&self) -> anyhow::Result<Connection> {
        let conn = Connection::open_in_memory()?;
        if let Err(e) = conn.execute_batch("INSTALL spatial; LOAD spatial;") {
            tracing::warn!(error = %e, "spatial extension unavailable; spatial queries will fail");
        }
        for (name, path) in &self.tables {
            let escaped = path.display().to_string().replace('\'', "''");
            conn.execute_batch(&format!(
                "CREATE OR REPLACE VIEW \"{}\" AS SELECT * FROM '{}'",
                name, escaped
            ))?;
        }
        Ok(conn)
    }

    /// Runs one statement on an open session and materializes the result.
    pub fn execute_on(&self, conn: &Connection, sql: &str) -> anyhow::Result<QueryOutput> {
        let start = Instant::now();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut rec = Vec::new();
            // Column count is only known post-execution; get_ref errors
            // past the last column.
            let mut i = 0;
            while let Ok(v) = row.get_ref(i) {
                rec.push(SqlValue::from_value_ref(v));
                i += 1;
            }
            out.push(rec);
        }
        Ok(QueryOutput {
            rows: out,
            elapsed: start.elapsed(),
        })
    }

    /// Runs one statement in a fresh session on a blocking thread, bounded
    /// by `timeout`. On timeout the stranded session is abandoned and the
    /// caller continues with the next item.
    pub async fn run_query(
        &self,
        sql: &str,
        timeout: Duration,
    ) -> Result<QueryOutput, QueryFailure> {
        let store = self.clone();
        let sql = sql.to_string();
        let handle = tokio::task::spawn_blocking(move || -> anyhow::Result<QueryOutput> {
            let conn = store.open_session()?;
            store.execute_on(&conn, &sql)
        });
        match tokio::time::timeout(timeout, handle).await {
            Err(_) => Err(QueryFailure::Timeout(format!(
                "query exceeded {}s",
                timeout.as_secs()
            ))),
            Ok(Err(join_err)) => Err(QueryFailure::Execution(join_err.to_string())),
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e))) => Err(QueryFailure::Execution(e.to_string())),
        }
    }

    /// `DESCRIBE` a registered view: `(column_name, column_type)` pairs.
    pub fn describe(&self, conn: &Connection, table: &str) -> anyhow::Result<Vec<(String, String)>> {
        let out = self.execute_on(conn, &format!("DESCRIBE SELECT * FROM \"{}\"", table))?;
        let mut cols = Vec::with_capacity(out.rows.len());
        for row in out.rows {
            let name = match row.first() {
                Some(SqlValue::Text(s)) => s.clone(),
                _ => continue,
            };
            let ty = match row.get(1) {
                Some(SqlValue::Text(s)) => s.clone(),
                _ => String::new(),
            };
            cols.push((name, ty));
        }
        Ok(cols)
    }

    pub fn row_count(&self, conn: &Connection, table: &str) -> anyhow::Result<u64> {
        let out = self.execute_on(conn, &format!("SELECT COUNT(*) FROM \"{}\"", table))?;
        match out.rows.first().and_then(|r| r.first()) {
            Some(SqlValue::Int(n)) => Ok(*n as u64),
            other => anyhow::bail!("unexpected COUNT(*) result: {:?}", other),
        }
    }

    pub fn sample_rows(
        &self,
        conn: &Connection,
        table: &str,
        n: usize,
    ) -> anyhow::Result<Vec<BTreeMap<String, serde_json::Value>>> {
        let columns = self.describe(conn, table)?;
        let out = self.execute_on(
            conn,
            &format!("SELECT * FROM \"{}\" USING SAMPLE {} ROWS", table, n),
        )?;
        let mut samples = Vec::with_capacity(out.rows.len());
        for row in out.rows {
            let mut obj = BTreeMap::new();
            for (i, (name, _ty)) in columns.iter().enumerate() {
                let v = row.get(i).map(SqlValue::to_json).unwrap_or_default();
                obj.insert(name.clone(), v);
            }
            samples.push(obj);
        }
        Ok(samples)
    }
}
