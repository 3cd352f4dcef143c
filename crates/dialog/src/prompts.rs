//! Prompt construction for classification and reply rendering
//!
//! All prompts forbid structured output. Replies are spoken aloud, so a
//! single conversational sentence is the target everywhere except the
//! free-form ai_reply path.

use voice_assist_core::{Language, Turn};

/// Classification instruction enumerating the action set
///
/// `context` is the most recent non-system turns, oldest first, used to
/// disambiguate follow-up utterances.
pub fn classification_prompt(goal: &str, context: &[Turn]) -> String {
    let mut history = String::new();
    for turn in context {
        history.push_str(&format!("- {}: {}\n", turn.role.as_str(), turn.content));
    }
    if history.is_empty() {
        history.push_str("(no prior turns)\n");
    }

    format!(
        "You are an action classifier for a telecom customer-service assistant.\n\
         Pick exactly one action name for the user's latest message and output\n\
         only that name, nothing else.\n\
         \n\
         Actions:\n\
         - check_balance: the user explicitly asks about their account balance\n\
         - query_status: the user asks about the status of an existing complaint or tracker\n\
         - generate_complaint: the user explicitly wants to register a new complaint\n\
         - route_to_call_agent: the user asks to escalate, cancel, or speak to a human agent\n\
         - ai_reply: chit-chat, small talk, anything out of scope, or ANY question about\n\
           what was said earlier in this conversation (for example \"what did I just ask?\"\n\
           or \"what was my last question?\" -- these are ai_reply, never query_status)\n\
         - END: the user says goodbye or clearly wants to stop\n\
         \n\
         Recent conversation:\n\
         {history}\n\
         User's latest message: {goal}\n\
         \n\
         Action name:"
    )
}

/// Phrase a structured fact as one polite spoken sentence
pub fn fact_prompt(fact_json: &str, language: Language) -> String {
    format!(
        "You are a polite telecom customer-service voice assistant.\n\
         Turn the following record into exactly one short, polite sentence\n\
         addressed to the customer, in {language_name}.\n\
         Do not output JSON, lists, or any structure. Do not ask a follow-up\n\
         question. One sentence only.\n\
         \n\
         Record: {fact_json}",
        language_name = language_name(language),
    )
}

/// Context-aware free-form reply over a numbered transcript
pub fn ai_reply_prompt(transcript: &str, goal: &str, language: Language) -> String {
    format!(
        "You are a friendly telecom customer-service voice assistant.\n\
         Answer the user's latest message in {language_name}, using the numbered\n\
         conversation below as context.\n\
         Rules:\n\
         - Keep it short and conversational; it will be spoken aloud.\n\
         - If the user asks what they said or asked earlier, answer from the\n\
           numbered conversation, paraphrasing in your own words. Never echo\n\
           their text verbatim.\n\
         - Do not output JSON or lists. No follow-up questions.\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         \n\
         User's latest message: {goal}\n\
         \n\
         Reply:",
        language_name = language_name(language),
    )
}

/// One short farewell sentence
pub fn farewell_prompt(language: Language) -> String {
    format!(
        "You are a polite telecom customer-service voice assistant. The customer\n\
         is saying goodbye. Reply with exactly one short, warm farewell sentence\n\
         in {language_name}. No questions, no structure, one sentence only.",
        language_name = language_name(language),
    )
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::English => "English",
        Language::Arabic => "Arabic",
    }
}

/// Canned fact records for the demo service backends
pub mod facts {
    use serde_json::json;

    pub fn balance() -> String {
        json!({
            "topic": "balance inquiry",
            "current_balance": "250 SAR",
        })
        .to_string()
    }

    pub fn query_status() -> String {
        json!({
            "topic": "query status",
            "tracker_id": "T98765",
            "status": "In Progress",
        })
        .to_string()
    }

    pub fn complaint_registered() -> String {
        json!({
            "topic": "register complaint",
            "complaint_id": "C12345",
            "status": "successful",
        })
        .to_string()
    }

    pub fn routed_to_agent() -> String {
        json!({
            "topic": "escalation",
            "status": "transferring to a human agent",
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_assist_core::Turn;

    #[test]
    fn test_classification_prompt_lists_all_actions() {
        let prompt = classification_prompt("hello", &[]);
        for name in [
            "check_balance",
            "query_status",
            "generate_complaint",
            "route_to_call_agent",
            "ai_reply",
            "END",
        ] {
            assert!(prompt.contains(name), "prompt missing {name}");
        }
        assert!(prompt.contains("(no prior turns)"));
    }

    #[test]
    fn test_classification_prompt_includes_context() {
        let context = vec![Turn::user("hi"), Turn::assistant("hello there")];
        let prompt = classification_prompt("what is my balance", &context);
        assert!(prompt.contains("- user: hi"));
        assert!(prompt.contains("- assistant: hello there"));
        assert!(prompt.contains("what is my balance"));
    }

    #[test]
    fn test_fact_prompt_forbids_structure() {
        let prompt = fact_prompt(&facts::balance(), Language::English);
        assert!(prompt.contains("250 SAR"));
        assert!(prompt.contains("Do not output JSON"));
        assert!(prompt.contains("English"));
    }

    #[test]
    fn test_ai_reply_prompt_carries_transcript() {
        let prompt = ai_reply_prompt("1. user: hello", "what did I say", Language::Arabic);
        assert!(prompt.contains("1. user: hello"));
        assert!(prompt.contains("Arabic"));
    }
}
