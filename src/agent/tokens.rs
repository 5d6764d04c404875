//! Token estimation
//!
//! A character-class heuristic, not a tokenizer. CJK characters are
//! counted at roughly two per token, everything else at four per token.
//! All budget logic goes through these functions.

use crate::core::Message;

/// First code point counted as CJK (CJK Radicals Supplement)
const CJK_THRESHOLD: u32 = 0x2E80;

/// Estimate the token count of a text
pub fn estimate_tokens(text: &str) -> usize {
    let (cjk, other) = text.chars().fold((0usize, 0usize), |(cjk, other), c| {
        if c as u32 >= CJK_THRESHOLD {
            (cjk + 1, other)
        } else {
            (cjk, other + 1)
        }
    });

    // ceil(cjk / 2 + other / 4) in integer arithmetic
    (cjk * 2 + other).div_ceil(4)
}

/// Estimate the tokens a message contributes to a request
pub fn estimate_message_tokens(message: &Message) -> usize {
    let mut total = estimate_tokens(&message.content);
    if let Some(reasoning) = &message.reasoning_content {
        total += estimate_tokens(reasoning);
    }
    for call in &message.tool_calls {
        total += estimate_tokens(&call.name) + estimate_tokens(&call.arguments);
    }
    total
}

/// Estimate the summed tokens of a message list
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
