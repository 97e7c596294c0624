pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS embeddings (
  key        TEXT PRIMARY KEY,
  model      TEXT NOT NULL,
  dims       INTEGER NOT NULL,
  vec        BLOB NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  kind        TEXT NOT NULL,
  model       TEXT,
  started_at  TEXT NOT NULL,
  finished_at TEXT,
  items       INTEGER NOT NULL DEFAULT 0,
  status      TEXT NOT NULL DEFAULT 'running'
);
"#;
