//! Classify-and-dispatch over the fixed action set
//!
//! One cycle per finalized utterance: a deterministic classification call
//! labels the utterance, then the matching handler renders the reply.
//! There are no cycles and no retained state; the session state machine
//! lives in the pipeline crate.

use std::sync::Arc;

use async_trait::async_trait;
use voice_assist_config::constants::llm;
use voice_assist_core::{
    ChatHistory, DialogOutcome, DialogPlanner, Language, RenderOptions, TextRenderer, Turn,
    TurnRole,
};

use crate::action::DialogAction;
use crate::prompts::{self, facts};

/// LLM-backed dialog action router
pub struct DialogRouter {
    renderer: Arc<dyn TextRenderer>,
}

impl DialogRouter {
    pub fn new(renderer: Arc<dyn TextRenderer>) -> Self {
        Self { renderer }
    }

    /// Classify the utterance into one of the six actions
    async fn classify(&self, goal: &str, context: &[Turn]) -> crate::Result<DialogAction> {
        let prompt = prompts::classification_prompt(goal, context);
        let messages = [Turn::system(&prompt)];
        let options = RenderOptions::deterministic(llm::CLASSIFY_MAX_TOKENS);

        let raw = self
            .renderer
            .render(&messages, &options)
            .await
            .map_err(|e| crate::DialogError::Classification(e.to_string()))?;

        let action = DialogAction::parse(&raw);
        tracing::debug!(raw = %raw.trim(), action = %action, "utterance classified");
        Ok(action)
    }

    /// Render a fact record as one polite sentence
    async fn render_fact(&self, fact_json: &str, language: Language) -> crate::Result<String> {
        let prompt = prompts::fact_prompt(fact_json, language);
        let messages = [Turn::system(&prompt)];
        let options = RenderOptions::deterministic(llm::FACT_MAX_TOKENS);

        self.renderer
            .render(&messages, &options)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| crate::DialogError::Rendering(e.to_string()))
    }

    /// Free-form contextual reply over the numbered transcript
    async fn render_ai_reply(
        &self,
        history: &[Turn],
        goal: &str,
        language: Language,
    ) -> crate::Result<String> {
        let transcript = numbered_transcript(history);
        let prompt = prompts::ai_reply_prompt(&transcript, goal, language);
        let messages = [Turn::system(&prompt)];
        let options = RenderOptions {
            max_tokens: llm::REPLY_MAX_TOKENS,
            temperature: 0.7,
        };

        self.renderer
            .render(&messages, &options)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| crate::DialogError::Rendering(e.to_string()))
    }

    async fn render_farewell(&self, language: Language) -> crate::Result<String> {
        let prompt = prompts::farewell_prompt(language);
        let messages = [Turn::system(&prompt)];
        let options = RenderOptions::deterministic(llm::FACT_MAX_TOKENS);

        self.renderer
            .render(&messages, &options)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| crate::DialogError::Rendering(e.to_string()))
    }
}

/// Last non-system turns, oldest first, capped for the classifier
fn recent_context(history: &[Turn], limit: usize) -> Vec<Turn> {
    let filtered: Vec<&Turn> = history
        .iter()
        .filter(|t| t.role != TurnRole::System)
        .collect();
    let start = filtered.len().saturating_sub(limit);
    filtered[start..].iter().map(|t| (*t).clone()).collect()
}

fn numbered_transcript(history: &[Turn]) -> String {
    let mut chat = ChatHistory::new();
    for turn in history {
        chat.push(turn.clone());
    }
    // System turns are filtered by the renderer below
    chat.numbered_transcript()
}

#[async_trait]
impl DialogPlanner for DialogRouter {
    async fn plan(
        &self,
        history: &[Turn],
        user_text: &str,
    ) -> voice_assist_core::Result<DialogOutcome> {
        let language = Language::detect(user_text);
        let context = recent_context(history, llm::CLASSIFY_HISTORY_TURNS);

        let action = self
            .classify(user_text, &context)
            .await
            .map_err(|e| voice_assist_core::Error::Dialog(e.to_string()))?;

        tracing::info!(action = %action, language = %language, "dialog action selected");

        let reply = match action {
            DialogAction::CheckBalance => self.render_fact(&facts::balance(), language).await,
            DialogAction::QueryStatus => self.render_fact(&facts::query_status(), language).await,
            DialogAction::GenerateComplaint => {
                self.render_fact(&facts::complaint_registered(), language).await
            }
            DialogAction::RouteToCallAgent => {
                self.render_fact(&facts::routed_to_agent(), language).await
            }
            DialogAction::AiReply => self.render_ai_reply(history, user_text, language).await,
            DialogAction::EndConversation => self.render_farewell(language).await,
        }
        .map_err(|e| voice_assist_core::Error::Dialog(e.to_string()))?;

        Ok(DialogOutcome {
            reply,
            action: action.as_str().to_string(),
            end_conversation: action.is_terminal(),
        })
    }
}
