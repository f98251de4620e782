//! OpenAI-compatible streaming completion client
//! Wraps the rig agent stream into a plain text-fragment sequence

use std::pin::Pin;

use futures::{Stream, StreamExt};
use rig::agent::{Agent, MultiTurnStreamItem};
use rig::completion::{AssistantContent, Message};
use rig::message::UserContent;
use rig::prelude::CompletionClient;
use rig::providers::openai;
use rig::streaming::{StreamedAssistantContent, StreamingChat};
use rig::OneOrMany;

use crate::chat::prompt::{ComposedPrompt, TurnRole};

pub const COMPLETION_MODEL: &str = "gpt-4o-mini";
pub const COMPLETION_TEMPERATURE: f64 = 0.7;
const MAX_STREAM_TURNS: usize = 1;

/// Lazy, single-pass fragment sequence; the consumer drains it exactly once.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("OpenAI API rejected the request (check OPENAI_API_KEY and permissions).")]
    Auth,
    #[error("completion request failed: {0}")]
    Upstream(String),
}

pub struct CompletionStreamClient {
    api_key: String,
    base_url: Option<String>,
}

impl CompletionStreamClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self { api_key, base_url }
    }

    /// Opens the completion stream and waits for its first item, so a
    /// credential rejection surfaces before any response bytes are
    /// committed. Everything after the first fragment is delivered lazily.
    pub async fn stream_answer(&self, prompt: &ComposedPrompt) -> Result<FragmentStream, CompletionError> {
        let mut builder =
            openai::CompletionsClient::<reqwest::Client>::builder().api_key(self.api_key.clone());
        if let Some(base_url) = self.base_url.as_deref() {
            builder = builder.base_url(base_url);
        }
        let client = builder
            .build()
            .map_err(|err| CompletionError::Upstream(err.to_string()))?;
        let agent = client
            .agent(COMPLETION_MODEL.to_string())
            .preamble(&prompt.system)
            .temperature(COMPLETION_TEMPERATURE)
            .build();

        let (question, history) = to_rig_messages(prompt);
        let mut fragments = fragment_stream(agent, question, history);
        match fragments.next().await {
            None => Ok(Box::pin(futures::stream::empty())),
            Some(Err(err)) => Err(classify_open_error(err)),
            Some(Ok(first)) => {
                let head = futures::stream::once(async move { Ok(first) });
                Ok(Box::pin(head.chain(fragments)))
            }
        }
    }
}

fn fragment_stream<M>(agent: Agent<M>, prompt: Message, history: Vec<Message>) -> FragmentStream
where
    M: rig::completion::CompletionModel + 'static,
    M::StreamingResponse: rig::completion::GetTokenUsage,
{
    Box::pin(async_stream::stream! {
        let mut stream = agent
            .stream_chat(prompt, history)
            .multi_turn(MAX_STREAM_TURNS)
            .await;
        while let Some(item) = stream.next().await {
            match item {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(text))) => {
                    if !text.text.is_empty() {
                        yield Ok(text.text);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    yield Err(CompletionError::Upstream(err.to_string()));
                    return;
                }
            }
        }
    })
}

fn to_rig_messages(prompt: &ComposedPrompt) -> (Message, Vec<Message>) {
    let history = prompt
        .history
        .iter()
        .map(|turn| match turn.role {
            TurnRole::User => Message::User {
                content: OneOrMany::one(UserContent::text(turn.text.clone())),
            },
            TurnRole::Assistant => Message::Assistant {
                id: None,
                content: OneOrMany::one(AssistantContent::text(turn.text.clone())),
            },
        })
        .collect();
    let question = Message::User {
        content: OneOrMany::one(UserContent::text(prompt.question.clone())),
    };
    (question, history)
}

/// Providers report credential problems through the error message rather
/// than a typed status once streaming is involved.
fn classify_open_error(err: CompletionError) -> CompletionError {
    match err {
        CompletionError::Upstream(message) if is_auth_failure(&message) => CompletionError::Auth,
        other => other,
    }
}

fn is_auth_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("forbidden")
        || lower.contains("invalid api key")
        || lower.contains("invalid_api_key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompt::{ComposedPrompt, HistoryTurn};

    #[test]
    fn auth_failures_are_recognized_by_message() {
        assert!(is_auth_failure("HTTP 401 Unauthorized"));
        assert!(is_auth_failure("provider returned 403"));
        assert!(is_auth_failure("Incorrect API key provided: invalid_api_key"));
        assert!(!is_auth_failure("connection reset by peer"));
    }

    #[test]
    fn open_errors_classify_to_auth_or_upstream() {
        assert!(matches!(
            classify_open_error(CompletionError::Upstream("401 Unauthorized".to_string())),
            CompletionError::Auth
        ));
        assert!(matches!(
            classify_open_error(CompletionError::Upstream("timed out".to_string())),
            CompletionError::Upstream(_)
        ));
    }

    #[test]
    fn history_roles_map_to_rig_messages() {
        let prompt = ComposedPrompt {
            system: "system".to_string(),
            history: vec![
                HistoryTurn {
                    role: TurnRole::User,
                    text: "earlier question".to_string(),
                },
                HistoryTurn {
                    role: TurnRole::Assistant,
                    text: "earlier answer".to_string(),
                },
            ],
            question: "current question".to_string(),
        };
        let (question, history) = to_rig_messages(&prompt);
        assert!(matches!(question, Message::User { .. }));
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], Message::User { .. }));
        assert!(matches!(history[1], Message::Assistant { .. }));
    }
}
