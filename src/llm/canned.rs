//! Offline keyword responder.
//!
//! Used when no hosted model is configured. Messages outside the credit and
//! finance domain get a scope reminder; everything else is answered from a
//! small set of canned replies, personalised with the caller's score and tier
//! when the client supplies them.

use crate::state::ClientContext;

pub const SERVICE_NAME: &str = "HEVA Chat Assistant";

const DOMAIN_KEYWORDS: &[&str] = &[
    "credit",
    "score",
    "loan",
    "finance",
    "financial",
    "payment",
    "debt",
    "rating",
    "application",
    "apply",
    "document",
    "upload",
    "hello",
    "hi",
    "hey",
    "help",
    "support",
];

const OFF_TOPIC_REPLY: &str = "I'm the HEVA credit assistant, so I can only help with credit scores, \
loan applications, financial assessments and credit decisions. Please ask me something related to credit or finance.";

const GREETING_REPLY: &str = "Hello! I'm your HEVA assistant. I can help with your credit score and loan \
application questions. How can I help you today?";

const SCORE_REPLY: &str = "Your credit score is one of the main factors in a lending decision. Scores range \
from 300 to 850, and higher scores unlock better terms. I can walk you through ways to improve yours.";

const LOAN_REPLY: &str = "I can guide you through the loan application. You'll need your business details, \
financial statements and a completed credit assessment. Would you like me to go over the requirements?";

const DOCUMENT_REPLY: &str = "A typical application needs your business registration, recent financial \
statements, bank statements and ID verification. I can explain which documents apply to you.";

const HELP_REPLY: &str = "I'm here to help! I can assist with:\n\
• Credit score explanations\n\
• Loan application guidance\n\
• Document requirements\n\
• Financial assessment tips\n\n\
What would you like to know more about?";

const DEFAULT_REPLY: &str = "Thanks for your question about credit and finance. I can explain credit scoring, \
loan applications and how to strengthen your financial profile. Could you tell me a bit more about what you need?";

#[derive(Debug, Default, Clone, Copy)]
pub struct CannedResponder;

impl CannedResponder {
    #[must_use]
    pub fn reply(&self, message: &str, context: Option<&ClientContext>) -> String {
        let words = words(message);
        let has = |keyword: &str| words.iter().any(|w| keyword_matches(w, keyword));

        if !DOMAIN_KEYWORDS.iter().any(|&k| has(k)) {
            return OFF_TOPIC_REPLY.to_string();
        }

        if has("hello") || has("hi") || has("hey") {
            return GREETING_REPLY.to_string();
        }

        if has("credit") && has("score") {
            if let Some(ctx) = context {
                if let Some(score) = ctx.user_score {
                    let tier = ctx.user_tier.as_deref().unwrap_or("standard");
                    return format!(
                        "With your current credit score of {score}, you're in the \"{tier}\" tier. \
                         That tier shapes your loan eligibility and interest rates. Would you like tips on improving it?"
                    );
                }
            }
            return SCORE_REPLY.to_string();
        }

        if has("loan") || has("apply") || has("application") {
            return LOAN_REPLY.to_string();
        }

        if has("document") || has("upload") {
            return DOCUMENT_REPLY.to_string();
        }

        if has("help") || has("support") {
            return HELP_REPLY.to_string();
        }

        DEFAULT_REPLY.to_string()
    }
}

/// Keywords of four or more letters match word prefixes ("loans" hits
/// "loan"); shorter ones must match the whole word ("history" misses "hi").
fn keyword_matches(word: &str, keyword: &str) -> bool {
    if keyword.len() >= 4 { word.starts_with(keyword) } else { word == keyword }
}

/// Lowercased alphanumeric words.
fn words(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
#[path = "canned_test.rs"]
mod tests;
