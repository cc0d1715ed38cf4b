use std::sync::Arc;

use tracing::{info, instrument, warn};

use floatchat_core::types::ConversationTurn;
use floatchat_geo::ResolvedRegion;
use floatchat_llm::{ChatRequest, LlmProvider, Message, Role};
use floatchat_schema::SCHEMA_PROMPT;
use floatchat_validator::validate_sql;

use crate::error::{PipelineError, Result};
use crate::extract::extract_sql;

/// Produced by a successful NL-to-SQL attempt loop.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub sql: String,
    pub provider: String,
    pub retries_used: u32,
    pub warnings: Vec<String>,
}

/// One NL-to-SQL request.
pub struct NlToSqlRequest<'a> {
    pub utterance: &'a str,
    pub prior_turns: &'a [ConversationTurn],
    pub resolved_geography: Option<&'a ResolvedRegion>,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
}

/// Drives the attempt loop: prompt assembly -> LLM call -> SQL
/// extraction -> validation -> bounded retry. Never returns unvalidated
/// SQL.
#[instrument(skip(provider, req), fields(utterance = %req.utterance, max_retries = req.max_retries))]
pub async fn generate_sql(
    provider: &Arc<dyn LlmProvider>,
    req: &NlToSqlRequest<'_>,
) -> Result<ValidatedQuery> {
    let mut last_errors: Vec<String> = Vec::new();
    let mut retries_used = 0u32;

    for attempt in 0..=req.max_retries {
        let messages = build_messages(req, &last_errors);

        let chat_req = ChatRequest {
            model: req.model.to_string(),
            system: SCHEMA_PROMPT.to_string(),
            messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let response = provider.send(&chat_req).await?;

        let Some(candidate_sql) = extract_sql(&response.content) else {
            warn!(attempt, "nl_to_sql_extraction_failed");
            last_errors.push("could not extract SQL from the model's response".to_string());
            retries_used = attempt;
            continue;
        };

        let validation = validate_sql(&candidate_sql, None);
        if validation.valid {
            info!(attempt, provider = provider.name(), "nl_to_sql_validated");
            return Ok(ValidatedQuery {
                sql: candidate_sql,
                provider: provider.name().to_string(),
                retries_used: attempt,
                warnings: validation.warnings,
            });
        }

        let error = validation
            .error
            .unwrap_or_else(|| "validation failed with no message".to_string());
        warn!(attempt, check = ?validation.check_failed, %error, "nl_to_sql_validation_failed");
        last_errors.push(error);
        retries_used = attempt;
    }

    // Enumerate only the last few errors — the terminal message "enumerates
    // the last few validation errors".
    let tail_start = last_errors.len().saturating_sub(3);
    Err(PipelineError::Exhausted {
        attempts: retries_used + 1,
        last_errors: last_errors[tail_start..].to_vec(),
    })
}

fn build_messages(req: &NlToSqlRequest<'_>, last_errors: &[String]) -> Vec<Message> {
    let mut messages = Vec::new();

    if let Some(region) = req.resolved_geography {
        messages.push(Message {
            role: Role::System,
            content: format!(
                "The user's question refers to the region \"{}\". Its bounding box is \
                 latitude [{}, {}], longitude [{}, {}]. Prefer this bounding box for \
                 spatial filters unless the question clearly asks for something else.",
                region.name, region.bbox.lat_min, region.bbox.lat_max, region.bbox.lon_min, region.bbox.lon_max
            ),
        });
    }

    for turn in req.prior_turns {
        let mut content = turn.content.clone();
        if let Some(sql) = &turn.sql {
            content.push_str(&format!("\n```sql\n{sql}\n```"));
        }
        messages.push(Message {
            role: match turn.role {
                floatchat_core::types::MessageRole::User => Role::User,
                floatchat_core::types::MessageRole::Assistant => Role::Assistant,
            },
            content,
        });
    }

    let mut user_content = req.utterance.to_string();
    if let Some(last_error) = last_errors.last() {
        user_content.push_str(&format!(
            "\n\n[RETRY] The previous query failed validation: {last_error}\nPlease produce a corrected SELECT query."
        ));
    }
    messages.push(Message {
        role: Role::User,
        content: user_content,
    });

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_messages_appends_retry_block_with_previous_error() {
        let req = NlToSqlRequest {
            utterance: "count the floats",
            prior_turns: &[],
            resolved_geography: None,
            model: "test-model",
            temperature: 0.0,
            max_tokens: 100,
            max_retries: 3,
        };
        let messages = build_messages(&req, &["write statement detected".to_string()]);
        let last = messages.last().unwrap();
        assert!(last.content.contains("[RETRY]"));
        assert!(last.content.contains("write statement detected"));
    }

    #[test]
    fn build_messages_injects_geography_system_message() {
        let region = ResolvedRegion {
            name: "arabian sea".to_string(),
            bbox: floatchat_geo::BoundingBox {
                lat_min: 10.0,
                lat_max: 20.0,
                lon_min: 50.0,
                lon_max: 70.0,
            },
        };
        let req = NlToSqlRequest {
            utterance: "floats in the arabian sea",
            prior_turns: &[],
            resolved_geography: Some(&region),
            model: "test-model",
            temperature: 0.0,
            max_tokens: 100,
            max_retries: 3,
        };
        let messages = build_messages(&req, &[]);
        assert!(messages[0].content.contains("arabian sea"));
        assert!(messages[0].content.contains("10"));
    }
}
