//! Prompt composition for the completion call

use crate::chat::extract::{turn_text, ConversationTurn};

pub const SYSTEM_PROMPT: &str = r#"You are a macroeconomics research assistant.

You help users reason about business cycles, inflation and unemployment, monetary and fiscal policy, and international macro (FX, trade balances, capital flows).

BEHAVIOR:
- Assume questions are about macroeconomics unless clearly stated otherwise.
- Start with a 2-3 sentence high-level summary, then short sections covering the key channels, mechanisms, and data.
- Prefer clear intuition first; add equations or technical detail only when it helps.
- Be explicit about uncertainty and data lags; prefer ranges over point estimates.
- Avoid hype and trading advice; focus on concepts, mechanisms, and risks.

FORMATTING:
- Always respond in markdown: ## for main sections, ### for subsections.
- Use bullet points or numbered lists for key points and **bold** for important terms.
- Keep paragraphs concise, separated by blank lines."#;

const FINDINGS_HEADER: &str = "\n\nLIVE RESEARCH FINDINGS:\n";
const FINDINGS_GROUNDING: &str = "\n\nGround every numeric claim (rates, growth, inflation, debt ratios) in the findings above. If the findings do not support a number, say so instead of guessing.";
const NO_DATA_NOTICE: &str = "\n\nNo live research data is available for this request. Answer from general knowledge and state clearly that figures may be dated.";

/// Research outcome as seen by the composer: findings to ground the answer
/// in, or an explicit absence (skipped, failed, or timed out upstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchContext {
    Findings(String),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Ordered input for the completion call: system instruction, prior turns,
/// current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub history: Vec<HistoryTurn>,
    pub question: String,
}

/// Builds the completion input. Prior turns keep role and order; turns that
/// reduce to empty text are dropped, and system turns fold into the
/// preamble. The most recent user turn is excluded from history since the
/// question itself forms the final entry.
pub fn compose(
    question: &str,
    messages: &[ConversationTurn],
    research: ResearchContext,
) -> ComposedPrompt {
    let last_user = messages.iter().rposition(|turn| turn.role == "user");

    let mut system = String::from(SYSTEM_PROMPT);
    let mut history = Vec::new();
    for (index, turn) in messages.iter().enumerate() {
        if Some(index) == last_user {
            continue;
        }
        let Some(text) = turn_text(turn) else {
            continue;
        };
        match turn.role.as_str() {
            "user" => history.push(HistoryTurn {
                role: TurnRole::User,
                text,
            }),
            "assistant" => history.push(HistoryTurn {
                role: TurnRole::Assistant,
                text,
            }),
            "system" => {
                system.push_str("\n\n");
                system.push_str(&text);
            }
            _ => {}
        }
    }

    match research {
        ResearchContext::Findings(findings) => {
            system.push_str(FINDINGS_HEADER);
            system.push_str(&findings);
            system.push_str(FINDINGS_GROUNDING);
        }
        ResearchContext::Unavailable => system.push_str(NO_DATA_NOTICE),
    }

    ComposedPrompt {
        system,
        history,
        question: question.to_string(),
    }
}

/// Input for the research-only pipeline, where the task answers the
/// question directly instead of enriching a completion.
pub fn research_input(question: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\nUser question:\n{question}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn turn(value: serde_json::Value) -> ConversationTurn {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn findings_are_appended_verbatim_with_grounding_rule() {
        let findings = "Fed funds target range: 4.25-4.50% as of the last FOMC meeting.";
        let prompt = compose("question", &[], ResearchContext::Findings(findings.to_string()));
        assert!(prompt.system.starts_with(SYSTEM_PROMPT));
        assert!(prompt.system.contains(findings));
        assert!(prompt.system.contains("Ground every numeric claim"));
    }

    #[test]
    fn absent_findings_disclose_the_lack_of_live_data() {
        let prompt = compose("question", &[], ResearchContext::Unavailable);
        assert!(prompt.system.contains("No live research data is available"));
        assert!(!prompt.system.contains("LIVE RESEARCH FINDINGS"));
    }

    #[test]
    fn history_excludes_the_latest_user_turn_and_empty_turns() {
        let messages = vec![
            turn(json!({"role": "user", "content": "first question"})),
            turn(json!({"role": "assistant", "content": "first answer"})),
            turn(json!({"role": "assistant", "content": ""})),
            turn(json!({"role": "user", "parts": [{"type": "text", "text": "second question"}]})),
        ];
        let prompt = compose("second question", &messages, ResearchContext::Unavailable);
        assert_eq!(
            prompt.history,
            vec![
                HistoryTurn {
                    role: TurnRole::User,
                    text: "first question".to_string(),
                },
                HistoryTurn {
                    role: TurnRole::Assistant,
                    text: "first answer".to_string(),
                },
            ]
        );
        assert_eq!(prompt.question, "second question");
    }

    #[test]
    fn system_turns_fold_into_the_preamble() {
        let messages = vec![
            turn(json!({"role": "system", "content": "Answer in French."})),
            turn(json!({"role": "user", "content": "question"})),
        ];
        let prompt = compose("question", &messages, ResearchContext::Unavailable);
        assert!(prompt.system.contains("Answer in French."));
        assert!(prompt.history.is_empty());
    }

    #[test]
    fn research_input_carries_prompt_and_question() {
        let input = research_input("What drives inflation?");
        assert!(input.starts_with(SYSTEM_PROMPT));
        assert!(input.contains("User question:\nWhat drives inflation?"));
    }
}
