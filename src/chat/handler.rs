//! Chat endpoint controllers
//! Validation, pipeline orchestration, and status mapping per request

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::chat::extract::{extract_question, ConversationTurn};
use crate::chat::mock;
use crate::chat::prompt::{self, ResearchContext};
use crate::chat::stream::{sse_response, Answer, FALLBACK_ANSWER};
use crate::error::ChatError;
use crate::providers::completion::CompletionStreamClient;
use crate::providers::valyu::{self, DeepResearchClient, ResearchStatus};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub use_valyu: Option<bool>,
}

/// POST /api/chat. Research (when enabled) enriches the completion call;
/// research failures degrade to a no-data prompt instead of aborting.
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    let valyu_key = state.config.require_valyu_key()?;
    let openai_key = state.config.require_openai_key()?;
    let question = extract_question(&payload.messages, payload.input.as_deref())?;

    if state.config.mock_mode {
        info!("mock mode active, bypassing providers");
        return Ok(sse_response(Answer::Fragments(mock::mock_fragments())));
    }

    let research = if payload.use_valyu.unwrap_or(true) {
        run_enrichment_research(&state, valyu_key, &question).await
    } else {
        ResearchContext::Unavailable
    };

    let composed = prompt::compose(&question, &payload.messages, research);
    let completion = CompletionStreamClient::new(
        openai_key.to_string(),
        state.config.openai_base_url.clone(),
    );
    let fragments = completion.stream_answer(&composed).await?;
    Ok(sse_response(Answer::Fragments(fragments)))
}

/// POST /api/research. Research output is the answer itself: the longer
/// deadline applies and failures are fatal to the request.
pub async fn research(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    let valyu_key = state.config.require_valyu_key()?;
    let question = extract_question(&payload.messages, payload.input.as_deref())?;

    if state.config.mock_mode {
        info!("mock mode active, bypassing providers");
        return Ok(sse_response(Answer::Complete(mock::MOCK_ANSWER.to_string())));
    }

    let client = DeepResearchClient::new(state.http.clone(), valyu_key.to_string());
    let result = client
        .run(&prompt::research_input(&question), valyu::SOLE_SOURCE_MAX_WAIT)
        .await?;
    let answer = match result.status {
        ResearchStatus::Completed => result
            .output
            .filter(|output| !output.is_empty())
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string()),
        ResearchStatus::Failed => {
            return Err(ChatError::ResearchFailed(
                result
                    .error
                    .unwrap_or_else(|| "DeepResearch task failed.".to_string()),
            ));
        }
        ResearchStatus::TimedOut => {
            return Err(ChatError::ResearchFailed(
                "DeepResearch task did not complete (status: timed-out).".to_string(),
            ));
        }
    };
    Ok(sse_response(Answer::Complete(answer)))
}

/// Preflight; the CORS layer attaches the allow headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Enrichment-mode research: every failure degrades to "no data" so the
/// completion step can still answer.
async fn run_enrichment_research(
    state: &AppState,
    valyu_key: &str,
    question: &str,
) -> ResearchContext {
    let client = DeepResearchClient::new(state.http.clone(), valyu_key.to_string());
    let started = Instant::now();
    match client.run(question, valyu::ENRICHMENT_MAX_WAIT).await {
        Ok(result) if result.status == ResearchStatus::Completed => {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "research completed");
            match result.output {
                Some(output) if !output.is_empty() => ResearchContext::Findings(output),
                _ => ResearchContext::Unavailable,
            }
        }
        Ok(result) => {
            warn!(
                status = ?result.status,
                error = result.error.as_deref(),
                "research unavailable, continuing without findings"
            );
            ResearchContext::Unavailable
        }
        Err(err) => {
            warn!(error = %err, "research request failed, continuing without findings");
            ResearchContext::Unavailable
        }
    }
}
