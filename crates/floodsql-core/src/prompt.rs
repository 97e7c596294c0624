use crate::catalog::{Catalog, JoinPair, METADATA_PROMPT_LIMIT};
use crate::model::ChatMessage;
use crate::retrieval::RetrievedContext;

/// Fixed system instruction for the SQL generator.
pub const SYSTEM_PROMPT: &str = "You are an expert DuckDB SQL generator for the FloodSQL_Bench dataset.
Use only the tables and columns given in the metadata context.
Do NOT output any reasoning, explanation, or analysis.
Output only the final SQL query, with no comments and no semicolon.
Your output must contain SQL code only.
Any natural language or reasoning is strictly forbidden.";

fn push_pairs(lines: &mut Vec<String>, header: &str, pairs: &[JoinPair]) {
    lines.push(format!("\n[{}]", header));
    for p in pairs {
        if let [a, b] = p.pair.as_slice() {
            lines.push(format!("- {}  <->  {}", a, b));
        }
    }
}

/// Renders the metadata prompt: retrieved candidates first, then the global
/// join rules and notes. Pure function of its inputs; section order is part
/// of the prompt contract.
pub fn build_metadata_prompt(catalog: &Catalog, retrieved: &RetrievedContext) -> String {
    let mut lines = Vec::new();

    lines.push("[TABLES SELECTED]".to_string());
    for (table, _score) in &retrieved.tables {
        lines.push(format!("- {}", table));
    }

    lines.push("\n[COLUMNS SELECTED]".to_string());
    for (table, hits) in &retrieved.columns {
        for hit in hits {
            lines.push(format!("- {}.{}: {}", table, hit.name, hit.text));
        }
    }

    let jr = &catalog.global.join_rules;
    push_pairs(&mut lines, "JOIN RULES: KEY-BASED DIRECT", &jr.key_based.direct);
    push_pairs(&mut lines, "JOIN RULES: KEY-BASED CONCAT", &jr.key_based.concat);
    push_pairs(
        &mut lines,
        "JOIN RULES: SPATIAL POINT-POLYGON",
        &jr.spatial.point_polygon,
    );
    push_pairs(
        &mut lines,
        "JOIN RULES: SPATIAL POLYGON-POLYGON",
        &jr.spatial.polygon_polygon,
    );

    lines.push("\n[RULES]".to_string());
    for (name, rule) in &catalog.global.rules {
        lines.push(format!("- {}: {}", name, rule));
    }

    lines.push("\n[NOTES]".to_string());
    for note in &catalog.global.notes {
        lines.push(format!("- {}", note));
    }

    lines.push("\n[SPATIAL-NOTES]".to_string());
    for note in &catalog.global.spatial_function_notes {
        lines.push(format!("- {}", note));
    }

    let mut result = lines.join("\n");
    if result.len() > METADATA_PROMPT_LIMIT {
        let mut cut = METADATA_PROMPT_LIMIT;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result.push_str("\n...[TRUNCATED]...");
        tracing::warn!(
            limit = METADATA_PROMPT_LIMIT,
            "metadata prompt truncated"
        );
    }
    result
}

/// The three-message prompt: fixed instruction, metadata context, question.
pub fn assemble(catalog: &Catalog, retrieved: &RetrievedContext, question: &str) -> Vec<ChatMessage> {
    let metadata_prompt = build_metadata_prompt(catalog, retrieved);
    let user_prompt = format!(
        "Question:\n{}\n\nReturn only a single valid DuckDB SQL query.",
        question
    );
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::system(metadata_prompt),
        ChatMessage::user(user_prompt),
    ]
}

/// Strips markdown SQL fences from a model reply.
pub fn clean_sql(sql: &str) -> String {
    sql.trim()
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Collapses whitespace so results files hold one statement per line.
pub fn flatten_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
