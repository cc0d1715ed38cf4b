use std::sync::Arc;

use tracing::warn;

use floatchat_llm::{ChatRequest, LlmProvider, Message, Role};

const FOLLOW_UP_SYSTEM_PROMPT: &str = "You suggest 2-3 natural follow-up questions a user might \
ask next about an oceanographic float dataset, given their last question, the SQL that answered \
it, and a short interpretation of the results. Respond with ONLY a JSON array of strings, \
e.g. [\"question one?\", \"question two?\"]. No other text.";

/// Follow-up suggestion generation: a dedicated LLM call, distinct from
/// NL-to-SQL and interpretation. Never raises — any failure yields an
/// empty list.
pub async fn generate(
    provider: &Arc<dyn LlmProvider>,
    model: &str,
    temperature: f32,
    max_tokens: u32,
    utterance: &str,
    sql: &str,
    interpretation: &str,
) -> Vec<String> {
    let user_content =
        format!("Last question: {utterance}\n\nSQL:\n{sql}\n\nInterpretation: {interpretation}");

    let chat_req = ChatRequest {
        model: model.to_string(),
        system: FOLLOW_UP_SYSTEM_PROMPT.to_string(),
        messages: vec![Message {
            role: Role::User,
            content: user_content,
        }],
        temperature,
        max_tokens,
    };

    match provider.send(&chat_req).await {
        Ok(response) => parse_follow_ups(&response.content),
        Err(e) => {
            warn!(error = %e, "follow_up_llm_call_failed");
            Vec::new()
        }
    }
}

/// Defensive parse: strip a fenced code block if present, try JSON array
/// of strings, and fall back to scanning lines ending in `?`.
fn parse_follow_ups(text: &str) -> Vec<String> {
    let stripped = strip_fence(text);

    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(&stripped) {
        let questions: Vec<String> = items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if !questions.is_empty() {
            return questions;
        }
    }

    stripped
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with('?'))
        .map(|line| line.trim_start_matches(['-', '*', ' ']).to_string())
        .collect()
}

fn strip_fence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        return rest.trim_end_matches("```").trim().to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        return rest.trim_end_matches("```").trim().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_array() {
        let parsed = parse_follow_ups(r#"["What about salinity?", "Show me the trend?"]"#);
        assert_eq!(parsed, vec!["What about salinity?", "Show me the trend?"]);
    }

    #[test]
    fn parses_fenced_json_array() {
        let parsed = parse_follow_ups("```json\n[\"One?\", \"Two?\"]\n```");
        assert_eq!(parsed, vec!["One?", "Two?"]);
    }

    #[test]
    fn falls_back_to_scanning_question_lines() {
        let parsed = parse_follow_ups("Sure, here are some ideas:\n- What about depth?\n- And time?\nThanks.");
        assert_eq!(parsed, vec!["What about depth?", "And time?"]);
    }

    #[test]
    fn malformed_response_yields_empty_list() {
        let parsed = parse_follow_ups("I'm not sure what to suggest.");
        assert!(parsed.is_empty());
    }
}
