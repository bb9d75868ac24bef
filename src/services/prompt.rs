//! Prompt templating for the relay.
//!
//! Layout: persona, optional context line, prior turns oldest first, then the
//! new question. The persona text is fixed; only the tail varies per request.

use std::fmt::Write;

use crate::state::{ChatExchange, ClientContext};

pub const SYSTEM_PROMPT: &str = "\
You are HEVA's AI assistant. HEVA provides credit scoring and financing for \
professionals in the creative industries: musicians, filmmakers, designers, \
photographers, writers, fashion and digital content creators.

You may help with:
- understanding HEVA credit scores and what affects them
- loan products, eligibility and the application process
- required documents and how to upload them
- budgeting, cash flow and financial planning for creative work
- using the HEVA platform

Keep answers concise, friendly and practical. Do not invent figures about a \
user's account. If a question is unrelated to these topics, politely explain \
that you can only help with HEVA credit and financing questions.";

/// Build the full prompt sent upstream.
///
/// `window` must already be in chronological order.
#[must_use]
pub fn build_prompt(message: &str, context: Option<&ClientContext>, window: &[ChatExchange]) -> String {
    let mut prompt = String::with_capacity(SYSTEM_PROMPT.len() + message.len() + 256);
    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if let Some(line) = context.and_then(context_line) {
        prompt.push_str(&line);
        prompt.push_str("\n\n");
    }

    if !window.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for turn in window {
            let _ = writeln!(prompt, "User: {}", turn.user_message);
            let _ = writeln!(prompt, "Assistant: {}", turn.ai_response);
        }
        prompt.push('\n');
    }

    prompt.push_str("User question: ");
    prompt.push_str(message);
    prompt
}

fn context_line(ctx: &ClientContext) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(page) = &ctx.page {
        parts.push(format!("viewing the {page} page"));
    }
    if let Some(score) = ctx.user_score {
        parts.push(format!("credit score {score:.0}"));
    }
    if let Some(tier) = &ctx.user_tier {
        parts.push(format!("{tier} tier"));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("User context: {}.", parts.join(", ")))
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
