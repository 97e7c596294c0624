use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn exec_captures_reference_results() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();

    let benchmark = dir.path().join("bench.jsonl");
    std::fs::write(
        &benchmark,
        [
            r#"{"id":"L0_0001","question":"one plus one","sql":"SELECT 1 + 1"}"#,
            r#"{"id":"L0_0002","question":"two rows","sql":"SELECT * FROM (VALUES (1), (2)) t(v)"}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    let out = dir.path().join("reference.jsonl");
    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "exec",
            "--benchmark",
            benchmark.to_str().unwrap(),
            "--data-dir",
            data.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("All 2 queries executed successfully"));

    let records: Vec<serde_json::Value> = std::fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records[0]["row_count"], 1);
    assert_eq!(records[0]["result"][0][0], 2);
    assert_eq!(records[1]["row_count"], 2);
}

#[test]
fn exec_flags_broken_reference_sql() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();

    let benchmark = dir.path().join("bench.jsonl");
    std::fs::write(
        &benchmark,
        [
            r#"{"id":"L0_0001","question":"fine","sql":"SELECT 1"}"#,
            r#"{"id":"L1_0002","question":"broken","sql":"SELECT * FROM no_such_table"}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    let errors_out = dir.path().join("errors.txt");
    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "exec",
            "--benchmark",
            benchmark.to_str().unwrap(),
            "--data-dir",
            data.to_str().unwrap(),
            "--errors-out",
            errors_out.to_str().unwrap(),
        ])
        .assert()
        .code(1);

    let summary = std::fs::read_to_string(&errors_out).unwrap();
    assert!(summary.contains("Total errors: 1 out of 2"));
    assert!(summary.contains("L1_0002"));
}

#[test]
fn exec_mode_eval_scores_result_set_match() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();

    // Equivalent but differently-written SQL matches; a wrong constant and a
    // failed generation both score 0.
    let preds = dir.path().join("preds.jsonl");
    std::fs::write(
        &preds,
        [
            r#"{"id":"L0_0001","question":"q1","gt_sql":"SELECT 1 + 1","generated_sql":"SELECT 2"}"#,
            r#"{"id":"L0_0002","question":"q2","gt_sql":"SELECT 7","generated_sql":"SELECT 8"}"#,
            r#"{"id":"L2_0001","question":"q3","gt_sql":"SELECT 'x'","generated_sql":null,"error":"timeout"}"#,
        ]
        .join("\n"),
    )
    .unwrap();

    let out = dir.path().join("scores.json");
    Command::cargo_bin("floodsql")
        .unwrap()
        .args([
            "eval",
            "--predictions",
            preds.to_str().unwrap(),
            "--mode",
            "exec",
            "--data-dir",
            data.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["metric"], "exec_match");
    let items = report["items"].as_array().unwrap();
    assert_eq!(items[0]["score"].as_f64().unwrap(), 1.0);
    assert_eq!(items[1]["score"].as_f64().unwrap(), 0.0);
    assert_eq!(items[2]["score"].as_f64().unwrap(), 0.0);

    // L0 = mean(1, 0) = 0.5, L2 = 0, overall = 1/3.
    let tiers = report["per_tier"].as_array().unwrap();
    assert!((tiers[0]["mean"].as_f64().unwrap() - 0.5).abs() < 1e-9);
    assert_eq!(tiers[1]["mean"].as_f64().unwrap(), 0.0);
    assert!((report["overall"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
}
