use std::sync::Arc;

use tracing::warn;

use floatchat_core::types::Row;
use floatchat_llm::{ChatRequest, LlmProvider, Message, Role};

const INTERPRETATION_SYSTEM_PROMPT: &str = "You are a concise oceanographic data analyst. \
Given a user's question, the SQL query that answered it, and a sample of the results, write \
2-4 sentences interpreting the results in plain language. Do not restate the SQL. Do not use \
code blocks.";

/// Result Interpretation: a separate LLM call, independent of
/// NL-to-SQL and of validation. On any failure, falls back to a template.
pub async fn interpret(
    provider: &Arc<dyn LlmProvider>,
    model: &str,
    temperature: f32,
    max_tokens: u32,
    utterance: &str,
    sql: &str,
    columns: &[String],
    rows: &[Row],
    row_count: usize,
) -> String {
    if row_count == 0 {
        return "The query returned no results.".to_string();
    }

    let table = render_table(columns, rows.iter().take(10));
    let user_content = format!(
        "Question: {utterance}\n\nSQL:\n{sql}\n\nResults ({row_count} row(s) total, showing up \
         to 10):\n{table}"
    );

    let chat_req = ChatRequest {
        model: model.to_string(),
        system: INTERPRETATION_SYSTEM_PROMPT.to_string(),
        messages: vec![Message {
            role: Role::User,
            content: user_content,
        }],
        temperature,
        max_tokens,
    };

    match provider.send(&chat_req).await {
        Ok(response) if !response.content.trim().is_empty() => response.content.trim().to_string(),
        Ok(_) => fallback_template(columns, row_count),
        Err(e) => {
            warn!(error = %e, "interpretation_llm_call_failed");
            fallback_template(columns, row_count)
        }
    }
}

/// "N rows with columns X, Y, …" fallback used on any interpretation
/// failure.
fn fallback_template(columns: &[String], row_count: usize) -> String {
    if row_count == 0 {
        return "The query returned no results.".to_string();
    }
    format!(
        "{row_count} row{plural} with columns {cols}.",
        plural = if row_count == 1 { "" } else { "s" },
        cols = columns.join(", "),
    )
}

fn render_table<'a>(columns: &[String], rows: impl Iterator<Item = &'a Row>) -> String {
    let mut out = String::new();
    out.push_str(&columns.join(" | "));
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(|(_, v)| cell_to_text(v)).collect();
        out.push_str(&cells.join(" | "));
        out.push('\n');
    }
    out
}

fn cell_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_template_for_empty_results() {
        assert_eq!(fallback_template(&["count".to_string()], 0), "The query returned no results.");
    }

    #[test]
    fn fallback_template_pluralizes_row_count() {
        let one = fallback_template(&["a".to_string()], 1);
        assert!(one.contains("1 row with"));
        let many = fallback_template(&["a".to_string(), "b".to_string()], 5);
        assert!(many.contains("5 rows with columns a, b"));
    }
}
