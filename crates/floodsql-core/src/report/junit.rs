use crate::eval::EvalReport;
use std::path::Path;

/// Writes the evaluation as a JUnit testsuite so the benchmark can gate CI:
/// one testcase per item, failure message carrying the mismatch reason.
pub fn write_junit(suite: &str, report: &EvalReport, out: &Path) -> anyhow::Result<()> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="{}" tests="{}">"#,
        escape(suite),
        report.items.len()
    ));
    xml.push('\n');

    for item in &report.items {
        xml.push_str(&format!(
            r#"  <testcase name="{}" classname="{}">"#,
            escape(&item.id),
            escape(&item.tier.to_string())
        ));
        if !item.passed {
            let message = if item.message.is_empty() {
                format!("score {:.4}", item.score)
            } else {
                item.message.clone()
            };
            xml.push_str(&format!(r#"<failure message="{}"/>"#, escape(&message)));
        }
        xml.push_str("</testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    std::fs::write(out, xml)?;
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{aggregate, ItemScore};
    use crate::model::Tier;

    #[test]
    fn junit_structure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("junit.xml");

        let items = vec![
            ItemScore {
                id: "L1_0001".into(),
                tier: Tier::L1,
                score: 1.0,
                passed: true,
                message: String::new(),
            },
            ItemScore {
                id: "L4_0002".into(),
                tier: Tier::L4,
                score: 0.0,
                passed: false,
                message: "result mismatch".into(),
            },
        ];
        let (per_tier, overall) = aggregate(&items);
        let report = EvalReport {
            metric: "exec_match".into(),
            total_items: items.len(),
            per_tier,
            overall,
            items,
        };

        write_junit("floodsql", &report, &path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains(r#"<testsuite name="floodsql" tests="2">"#));
        assert!(content.contains(r#"<testcase name="L1_0001" classname="L1">"#));
        assert!(content.contains(r#"<failure message="result mismatch"/>"#));
    }
}
