//! POST /chat/sessions/{id}/query and /query/confirm: the Chat
//! Orchestrator. The single most spec-critical surface in the system —
//! strict SSE event ordering, a bounded NL-to-SQL retry loop, a
//! confirmation protocol for large result estimates, and a persistence
//! contract that must hold even when any downstream call fails.
//!
//! Built as a `Sse<impl Stream<...>>` over an `async_stream::stream!`
//! block, one multi-stage event vocabulary per request.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use floatchat_core::types::{ConversationTurn, ErrorType, MessageRole, MessageStatus};
use floatchat_pipeline::nl_to_sql::{generate_sql, NlToSqlRequest, ValidatedQuery};
use floatchat_pipeline::PipelineError;
use floatchat_sessions::NewMessage;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub message_id: Uuid,
}

/// Encode one SSE frame. A payload we built ourselves is never expected
/// to fail to serialize, so a malformed frame degrades to an empty body
/// rather than panicking the stream.
fn event(kind: &'static str, payload: impl Serialize) -> Event {
    Event::default()
        .event(kind)
        .data(serde_json::to_string(&payload).unwrap_or_default())
}

/// A short, deterministic interpretation derived purely from the
/// utterance text, shown alongside the `interpreting` event — distinct
/// from the full LLM-generated interpretation attached to the final
/// `results` event.
fn template_interpretation(utterance: &str) -> String {
    let lower = utterance.to_lowercase();
    if lower.contains("how many") || lower.contains("count") {
        "I'll count the matching records…".to_string()
    } else if lower.contains("average") || lower.contains("mean") {
        "I'll calculate the average you're asking about…".to_string()
    } else {
        "I'll query the ocean data database…".to_string()
    }
}

/// POST /chat/sessions/{id}/query
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = Uuid::parse_str(&id)?;
    state.sessions.get_active_session(session_id).await?;

    let user_message = state
        .sessions
        .append_message(session_id, NewMessage::user(&req.query))
        .await?;

    let stream = async_stream::stream! {
        yield Ok(event("thinking", json!({})));

        let resolved_region = state.geography.resolve(&req.query);
        let prior_turns = state.context_store.get(&session_id.to_string()).await;

        let nl_req = NlToSqlRequest {
            utterance: &req.query,
            prior_turns: &prior_turns,
            resolved_geography: resolved_region.as_ref(),
            model: &state.config.llm.model,
            temperature: state.config.llm.temperature,
            max_tokens: state.config.llm.max_tokens,
            max_retries: state.config.query.max_retries,
        };

        let validated = match generate_sql(&state.llm, &nl_req).await {
            Ok(v) => v,
            Err(err) => {
                yield Ok(*on_generation_failure(&state, session_id, user_message.id, &err).await);
                return;
            }
        };

        let interpreting_template = template_interpretation(&req.query);
        yield Ok(event(
            "interpreting",
            json!({ "interpretation": interpreting_template, "generated_sql": validated.sql }),
        ));

        let estimate = state.executor.estimate_row_count(&validated.sql).await;
        let needs_confirmation = !req.confirm
            && estimate.map(|n| n as u64 > state.config.query.confirmation_threshold).unwrap_or(false);

        if needs_confirmation {
            let estimated_rows = estimate.unwrap_or(0);
            let pending = match state
                .sessions
                .append_message(
                    session_id,
                    NewMessage {
                        role: MessageRole::Assistant,
                        content: interpreting_template.clone(),
                        status: MessageStatus::PendingConfirmation,
                        generated_sql: Some(validated.sql.clone()),
                        result_metadata: None,
                        follow_up_suggestions: None,
                        error_type: None,
                    },
                )
                .await
            {
                Ok(m) => m,
                Err(err) => {
                    yield Ok(event("error", json!({ "error_type": "execution_error", "message": err.to_string() })));
                    yield Ok(event("done", json!({})));
                    return;
                }
            };

            yield Ok(event(
                "awaiting_confirmation",
                json!({
                    "message_id": pending.id,
                    "estimated_rows": estimated_rows,
                    "sql": validated.sql,
                    "interpretation": interpreting_template,
                }),
            ));
            yield Ok(event("done", json!({})));
            return;
        }

        yield Ok(event("executing", json!({})));

        match run_query_to_completion(&state, &validated, &req.query, session_id).await {
            Ok(events) => {
                for e in events {
                    yield Ok(e);
                }
            }
            Err(err_event) => {
                yield Ok(*err_event);
            }
        }
        yield Ok(event("done", json!({})));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /chat/sessions/{id}/query/confirm
pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session_id = Uuid::parse_str(&id)?;
    state.sessions.get_active_session(session_id).await?;

    let pending = state.sessions.get_message(session_id, req.message_id).await?;
    if pending.status != MessageStatus::PendingConfirmation || pending.generated_sql.is_none() {
        return Err(ApiError::bad_request(format!(
            "message {} is not awaiting confirmation",
            req.message_id
        )));
    }

    state.sessions.begin_confirmation(session_id, req.message_id).await?;
    let sql = pending.generated_sql.expect("checked above");
    let utterance = pending.content;

    let stream = async_stream::stream! {
        yield Ok(event("executing", json!({})));

        let validated = ValidatedQuery {
            sql,
            provider: state.llm.name().to_string(),
            retries_used: 0,
            warnings: Vec::new(),
        };

        match run_query_to_completion_confirm(&state, &validated, &utterance, session_id, req.message_id).await {
            Ok(events) => {
                for e in events {
                    yield Ok(e);
                }
            }
            Err(err_event) => {
                yield Ok(*err_event);
            }
        }
        yield Ok(event("done", json!({})));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Shared tail of the normal query path: execute (honoring the result
/// cache), interpret, generate follow-ups, persist the completed
/// message, and update the rolling context — in that order, since
/// `results` must precede `suggestions` and
/// neither may block on the other failing.
async fn run_query_to_completion(
    state: &AppState,
    validated: &ValidatedQuery,
    utterance: &str,
    session_id: Uuid,
) -> Result<Vec<Event>, Box<Event>> {
    let mut events = Vec::new();

    let execution = execute_with_cache(state, &validated.sql).await;
    if let Some(error_text) = &execution.error {
        if let Err(err) = state
            .sessions
            .append_message(
                session_id,
                NewMessage {
                    role: MessageRole::Assistant,
                    content: format!("The query failed to execute: {error_text}"),
                    status: MessageStatus::Error,
                    generated_sql: Some(validated.sql.clone()),
                    result_metadata: None,
                    follow_up_suggestions: None,
                    error_type: Some(ErrorType::ExecutionError),
                },
            )
            .await
        {
            warn!(error = %err, "failed to persist execution-error message");
        }
        return Err(Box::new(event(
            "error",
            json!({ "error_type": "execution_error", "message": error_text }),
        )));
    }

    events.push(event(
        "results",
        json!({
            "columns": execution.columns,
            "rows": rows_to_json(&execution.rows),
            "row_count": execution.row_count,
            "truncated": execution.truncated,
        }),
    ));

    let interpretation = floatchat_pipeline::interpretation::interpret(
        &state.llm,
        &state.config.llm.model,
        state.config.llm.follow_up_temperature,
        state.config.llm.follow_up_max_tokens,
        utterance,
        &validated.sql,
        &execution.columns,
        &execution.rows,
        execution.row_count,
    )
    .await;

    let follow_ups = floatchat_pipeline::follow_ups::generate(
        &state.llm,
        &state.config.llm.model,
        state.config.llm.follow_up_temperature,
        state.config.llm.follow_up_max_tokens,
        utterance,
        &validated.sql,
        &interpretation,
    )
    .await;

    events.push(event("suggestions", json!({ "suggestions": follow_ups })));

    let result_metadata = json!({
        "row_count": execution.row_count,
        "truncated": execution.truncated,
        "columns": execution.columns,
        "retries_used": validated.retries_used,
        "provider": validated.provider,
    });

    if let Err(err) = state
        .sessions
        .append_message(
            session_id,
            NewMessage {
                role: MessageRole::Assistant,
                content: interpretation.clone(),
                status: MessageStatus::Completed,
                generated_sql: Some(validated.sql.clone()),
                result_metadata: Some(result_metadata),
                follow_up_suggestions: Some(follow_ups),
                error_type: None,
            },
        )
        .await
    {
        warn!(error = %err, "failed to persist completed assistant message");
    }

    append_turn_pair(state, session_id, utterance, &interpretation, &validated.sql, execution.row_count).await;

    Ok(events)
}

/// Same tail as [`run_query_to_completion`], but updating the pending
/// message in place rather than appending a new one.
async fn run_query_to_completion_confirm(
    state: &AppState,
    validated: &ValidatedQuery,
    utterance: &str,
    session_id: Uuid,
    message_id: Uuid,
) -> Result<Vec<Event>, Box<Event>> {
    let mut events = Vec::new();

    let execution = execute_with_cache(state, &validated.sql).await;
    if let Some(error_text) = &execution.error {
        if let Err(err) = state
            .sessions
            .update_message(
                message_id,
                &format!("The query failed to execute: {error_text}"),
                MessageStatus::Error,
                None,
                None,
                Some(ErrorType::ExecutionError),
                0,
            )
            .await
        {
            warn!(error = %err, "failed to update message on confirm execution error");
        }
        return Err(Box::new(event(
            "error",
            json!({ "error_type": "execution_error", "message": error_text }),
        )));
    }

    events.push(event(
        "results",
        json!({
            "columns": execution.columns,
            "rows": rows_to_json(&execution.rows),
            "row_count": execution.row_count,
            "truncated": execution.truncated,
        }),
    ));

    let interpretation = floatchat_pipeline::interpretation::interpret(
        &state.llm,
        &state.config.llm.model,
        state.config.llm.follow_up_temperature,
        state.config.llm.follow_up_max_tokens,
        utterance,
        &validated.sql,
        &execution.columns,
        &execution.rows,
        execution.row_count,
    )
    .await;

    let follow_ups = floatchat_pipeline::follow_ups::generate(
        &state.llm,
        &state.config.llm.model,
        state.config.llm.follow_up_temperature,
        state.config.llm.follow_up_max_tokens,
        utterance,
        &validated.sql,
        &interpretation,
    )
    .await;

    events.push(event("suggestions", json!({ "suggestions": follow_ups })));

    let result_metadata = json!({
        "row_count": execution.row_count,
        "truncated": execution.truncated,
        "columns": execution.columns,
    });

    // No activity-count delta here: this turn's two rows (the user message
    // and the pending-confirmation assistant message) were already counted
    // when each was appended; this call only updates the assistant row in
    // place, persisting zero new rows.
    if let Err(err) = state
        .sessions
        .update_message(
            message_id,
            &interpretation,
            MessageStatus::Completed,
            Some(result_metadata),
            Some(&follow_ups),
            None,
            0,
        )
        .await
    {
        warn!(error = %err, "failed to update message on confirm completion");
    }

    append_turn_pair(state, session_id, utterance, &interpretation, &validated.sql, execution.row_count).await;

    Ok(events)
}

/// Check the result cache before hitting the executor; populate it on a
/// fresh execution. A cached hit cannot recover the original truncation
/// flag, so it is reported as `false` — the result cache does not store
/// the flag alongside the rows.
async fn execute_with_cache(state: &AppState, sql: &str) -> floatchat_core::types::ExecutionResult {
    if let Some(rows) = state.result_cache.get(sql).await {
        let columns = rows
            .first()
            .map(|row| row.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        let row_count = rows.len();
        return floatchat_core::types::ExecutionResult {
            columns,
            rows,
            row_count,
            truncated: false,
            error: None,
        };
    }

    let result = state.executor.execute(sql).await;
    if result.error.is_none() {
        state.result_cache.set(sql, &result.rows).await;
    }
    result
}

async fn append_turn_pair(
    state: &AppState,
    session_id: Uuid,
    utterance: &str,
    interpretation: &str,
    sql: &str,
    row_count: usize,
) {
    let key = session_id.to_string();
    state
        .context_store
        .append(
            &key,
            ConversationTurn {
                role: MessageRole::User,
                content: utterance.to_string(),
                sql: None,
                row_count: None,
            },
        )
        .await;
    state
        .context_store
        .append(
            &key,
            ConversationTurn {
                role: MessageRole::Assistant,
                content: interpretation.to_string(),
                sql: Some(sql.to_string()),
                row_count: Some(row_count),
            },
        )
        .await;
}

fn rows_to_json(rows: &[floatchat_core::types::Row]) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|row| {
            let map: serde_json::Map<String, serde_json::Value> = row.iter().cloned().collect();
            serde_json::Value::Object(map)
        })
        .collect()
}

/// Persist the generation-failure assistant message and build the
/// terminal `error` event. `PipelineError::Exhausted` and
/// `PipelineError::Llm` are both surfaced as `generation_failure` —
/// neither produced SQL the executor could ever see.
async fn on_generation_failure(
    state: &AppState,
    session_id: Uuid,
    _user_message_id: Uuid,
    err: &PipelineError,
) -> Box<Event> {
    let message = err.to_string();
    if let Err(persist_err) = state
        .sessions
        .append_message(
            session_id,
            NewMessage {
                role: MessageRole::Assistant,
                content: message.clone(),
                status: MessageStatus::Error,
                generated_sql: None,
                result_metadata: None,
                follow_up_suggestions: None,
                error_type: Some(ErrorType::GenerationFailure),
            },
        )
        .await
    {
        warn!(error = %persist_err, "failed to persist generation-failure message");
    }

    Box::new(event(
        "error",
        json!({ "error_type": "generation_failure", "message": message }),
    ))
}
