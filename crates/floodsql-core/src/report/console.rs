use crate::dataset::SqlValue;
use crate::eval::EvalReport;
use crate::report::RunArtifacts;

/// Pretty-prints query rows: a lone scalar on one line, otherwise an
/// aligned table capped at `limit` rows.
pub fn format_result(rows: &[Vec<SqlValue>], limit: usize) -> String {
    if rows.is_empty() {
        return "  (no rows)\n".to_string();
    }
    if rows.len() == 1 && rows[0].len() == 1 {
        return format!("  {}\n", render(&rows[0][0]));
    }

    let shown = &rows[..rows.len().min(limit)];
    let cols = shown.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in shown {
        for (i, v) in row.iter().enumerate() {
            widths[i] = widths[i].max(render(v).len());
        }
    }

    let mut lines = Vec::new();
    for row in shown {
        let formatted = row
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:<width$}", render(v), width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(format!("  {}", formatted));
    }
    if rows.len() > limit {
        lines.push(format!("  ... ({} more rows)", rows.len() - limit));
    }
    lines.join("\n") + "\n"
}

fn render(v: &SqlValue) -> String {
    match v {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => format!("{}", f),
        SqlValue::Text(s) => s.clone(),
    }
}

pub fn print_run_summary(artifacts: &RunArtifacts) {
    let mut generated = 0usize;
    let mut failed = 0usize;

    eprintln!("\nRan {} questions with {}", artifacts.records.len(), artifacts.model);
    for record in &artifacts.records {
        match &record.generated_sql {
            Some(sql) => {
                generated += 1;
                let display = if sql.len() > 80 {
                    format!("{}...", &sql[..80])
                } else {
                    sql.clone()
                };
                eprintln!("✅ {:<10} {}", record.id, display);
            }
            None => {
                failed += 1;
                eprintln!(
                    "❌ {:<10} {}",
                    record.id,
                    record.error.as_deref().unwrap_or("failed")
                );
            }
        }
    }

    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Summary: {} generated, {} failed", generated, failed);
}

pub fn print_eval_summary(report: &EvalReport) {
    eprintln!("\nScores ({}) over {} items", report.metric, report.total_items);
    for tier in &report.per_tier {
        eprintln!(
            "  {}: {:.4}  ({} items)",
            tier.tier, tier.mean, tier.items
        );
    }
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("Overall: {:.4}", report.overall);
}
