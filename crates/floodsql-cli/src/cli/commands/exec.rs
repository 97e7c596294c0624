use crate::cli::args::ExecArgs;
use floodsql_core::dataset::{DatasetStore, QueryFailure, SqlValue};
use floodsql_core::model::{load_benchmark, BenchmarkItem};
use floodsql_core::report::console::format_result;
use std::path::Path;
use std::time::Duration;

struct ItemError {
    id: String,
    question: String,
    message: String,
    timed_out: bool,
}

pub async fn execute(args: ExecArgs) -> anyhow::Result<i32> {
    let store = DatasetStore::discover(&args.data_dir)?;
    let mut items = load_benchmark(&args.benchmark)?;

    if let Some(id) = &args.id {
        items.retain(|item| &item.id == id);
        if items.is_empty() {
            anyhow::bail!("item {} not found in {}", id, args.benchmark.display());
        }
    }

    let timeout = Duration::from_secs(args.timeout_seconds);
    let total = items.len();
    let mut lines = Vec::with_capacity(total);
    let mut errors: Vec<ItemError> = Vec::new();

    for item in &items {
        print_header(item);
        let mut record = serde_json::json!({
            "id": item.id,
            "question": item.question,
            "sql": item.sql,
        });

        match store.run_query(&item.sql, timeout).await {
            Ok(output) => {
                println!(
                    "Success ({} rows, {:.3} sec)\n",
                    output.rows.len(),
                    output.elapsed.as_secs_f64()
                );
                println!("{}", format_result(&output.rows, args.limit_output));

                let rows: Vec<Vec<serde_json::Value>> = output
                    .rows
                    .iter()
                    .map(|row| row.iter().map(SqlValue::to_json).collect())
                    .collect();
                record["elapsed"] =
                    serde_json::json!((output.elapsed.as_secs_f64() * 1000.0).round() / 1000.0);
                record["row_count"] = serde_json::json!(output.rows.len());
                record["result"] = serde_json::json!(rows);
            }
            Err(failure) => {
                let timed_out = matches!(failure, QueryFailure::Timeout(_));
                println!("Error while executing: {}\n", failure);
                record["error"] = serde_json::json!(failure.to_string());
                record["error_type"] = serde_json::json!(if timed_out {
                    "timeout"
                } else {
                    "execution_error"
                });
                errors.push(ItemError {
                    id: item.id.clone(),
                    question: item.question.clone(),
                    message: failure.to_string(),
                    timed_out,
                });
            }
        }

        lines.push(record.to_string());
    }

    if let Some(out) = &args.out {
        write_lines(out, &lines)?;
        eprintln!("Results saved to {}", out.display());
    }
    if let Some(errors_out) = &args.errors_out {
        write_error_summary(errors_out, total, &errors)?;
        eprintln!("Error summary saved to {}", errors_out.display());
    }

    let timeouts = errors.iter().filter(|e| e.timed_out).count();
    if errors.is_empty() {
        eprintln!("\nAll {} queries executed successfully", total);
        Ok(0)
    } else {
        eprintln!(
            "\n{} errors out of {} queries ({:.1}%), {} timeouts",
            errors.len(),
            total,
            errors.len() as f64 / total as f64 * 100.0,
            timeouts
        );
        Ok(1)
    }
}

fn print_header(item: &BenchmarkItem) {
    println!("{}", "=".repeat(80));
    println!("[{}] {}", item.id, item.question);
    println!("{}", "-".repeat(80));
    println!("{}\n", item.sql);
}

fn write_lines(path: &Path, lines: &[String]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    std::fs::write(path, out)?;
    Ok(())
}

fn write_error_summary(path: &Path, total: usize, errors: &[ItemError]) -> anyhow::Result<()> {
    let mut out = String::new();
    if errors.is_empty() {
        out.push_str("No errors found. All queries executed successfully.\n");
    } else {
        let timeouts = errors.iter().filter(|e| e.timed_out).count();
        out.push_str(&format!(
            "Total errors: {} out of {} queries\n",
            errors.len(),
            total
        ));
        out.push_str(&format!(
            "Error rate: {:.2}%\n",
            errors.len() as f64 / total as f64 * 100.0
        ));
        out.push_str(&format!("Timeout errors: {}\n", timeouts));
        out.push_str(&format!("Execution errors: {}\n", errors.len() - timeouts));
        out.push_str(&format!("{}\n\nError IDs:\n", "=".repeat(80)));
        for e in errors {
            out.push_str(&format!("{}\n", e.id));
        }
        out.push_str(&format!("\n{}\nDetails:\n\n", "=".repeat(80)));
        for e in errors {
            out.push_str(&format!("ID: {}\n", e.id));
            out.push_str(&format!("Question: {}\n", e.question));
            out.push_str(&format!("Error: {}\n", e.message));
            out.push_str(&format!("{}\n\n", "-".repeat(80)));
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, out)?;
    Ok(())
}
