use assert_cmd::Command;
use predicates::prelude::*;

const METADATA: &str = r#"{
    "svi": {
        "schema": [
            {"column_name": "GEOID", "description": "tract identifier"},
            {"column_name": "RPL_THEMES", "description": "overall SVI percentile"}
        ]
    },
    "county": {
        "schema": [
            {"column_name": "GEOID", "description": "county identifier"},
            {"column_name": "NAME", "description": "county name"}
        ]
    },
    "_global": {
        "join_rules": {
            "key_based": {"direct": [{"pair": ["svi.GEOID", "county.GEOID"]}]}
        },
        "notes": ["GEOID stays VARCHAR."]
    }
}"#;

#[test]
fn offline_run_writes_predictions_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = dir.path().join("metadata.json");
    std::fs::write(&metadata, METADATA).unwrap();

    // The fake provider echoes `-- reply:` directives, so the benchmark
    // questions script the exact model output.
    let benchmark = dir.path().join("bench.jsonl");
    std::fs::write(
        &benchmark,
        [
            r#"{"id":"L0_0001","question":"How many tracts? -- reply: SELECT 11","sql":"SELECT 11"}"#,
            r#"{"id":"L1_0002","question":"How many counties? -- reply: SELECT 22","sql":"SELECT 22"}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    let out = dir.path().join("results/preds.jsonl");
    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "run",
            "--benchmark",
            benchmark.to_str().unwrap(),
            "--metadata",
            metadata.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--provider",
            "fake",
            "--embedder",
            "fake",
            "--db",
            dir.path().join("cache.db").to_str().unwrap(),
        ])
        .assert()
        .success();

    let raw = std::fs::read_to_string(&out).unwrap();
    let records: Vec<serde_json::Value> = raw
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], "L0_0001");
    assert_eq!(records[0]["generated_sql"], "SELECT 11");
    assert_eq!(records[1]["id"], "L1_0002");
    assert_eq!(records[1]["generated_sql"], "SELECT 22");
    assert!(!records[0]["chosen_tables"].as_array().unwrap().is_empty());
}

#[test]
fn empty_benchmark_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = dir.path().join("metadata.json");
    std::fs::write(&metadata, METADATA).unwrap();
    let benchmark = dir.path().join("bench.jsonl");
    std::fs::write(&benchmark, "").unwrap();
    let out = dir.path().join("preds.jsonl");

    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "run",
            "--benchmark",
            benchmark.to_str().unwrap(),
            "--metadata",
            metadata.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--provider",
            "fake",
            "--embedder",
            "fake",
            "--db",
            dir.path().join("cache.db").to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn unknown_provider_aborts_before_items() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = dir.path().join("metadata.json");
    std::fs::write(&metadata, METADATA).unwrap();
    let benchmark = dir.path().join("bench.jsonl");
    std::fs::write(
        &benchmark,
        r#"{"id":"L0_0001","question":"q","sql":"SELECT 1"}"#,
    )
    .unwrap();

    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "run",
            "--benchmark",
            benchmark.to_str().unwrap(),
            "--metadata",
            metadata.to_str().unwrap(),
            "--out",
            dir.path().join("preds.jsonl").to_str().unwrap(),
            "--provider",
            "grok",
            "--embedder",
            "fake",
            "--db",
            dir.path().join("cache.db").to_str().unwrap(),
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown llm provider"));
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("floodsql")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("fetch")
                .and(predicate::str::contains("run"))
                .and(predicate::str::contains("eval")),
        );
}
