//! History compaction
//!
//! Replaces the oldest part of a conversation with one LLM-written summary,
//! keeping the most recent messages verbatim. Compaction is all or nothing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::tokens::estimate_messages_tokens;
use crate::core::config::CompactionConfig;
use crate::core::{Message, Result, Role};
use crate::llm::{GenerateOptions, LLMProvider};

/// Name tag carried by summary messages
pub const SUMMARY_NAME: &str = "context_summary";

/// Content prefix of summary messages
pub const SUMMARY_PREFIX: &str = "[Context Summary]";

const SUMMARY_INSTRUCTIONS: &str = "You compress conversation transcripts. Write a concise, \
factual summary of the transcript you are given. Cover the user's goals, facts and data \
retrieved by tools, decisions made, and open questions or unfinished work. Do not invent \
anything, do not address the user, and keep it short.";

/// Outcome of a successful compaction
#[derive(Debug, Clone)]
pub struct CompactionResult {
    /// New history: the summary followed by the recent messages
    pub messages: Vec<Message>,
    /// The synthetic summary message
    pub summary_message: Message,
    /// Number of original messages the summary replaced
    pub compacted_count: usize,
}

/// Whether a message is a summary produced by compaction
pub fn is_summary(message: &Message) -> bool {
    message.role == Role::System && message.name.as_deref() == Some(SUMMARY_NAME)
}

/// LLM-driven history summariser
pub struct Compactor {
    llm: Arc<dyn LLMProvider>,
    model: String,
    keep_recent: usize,
    trigger_ratio: f64,
    summary_max_tokens: u32,
}

impl Compactor {
    /// Create a compactor with default thresholds
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self::from_config(llm, model, &CompactionConfig::default())
    }

    /// Create a compactor from configuration
    pub fn from_config(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        config: &CompactionConfig,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            keep_recent: config.keep_recent,
            trigger_ratio: config.trigger_ratio,
            summary_max_tokens: config.summary_max_tokens,
        }
    }

    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }

    pub fn with_trigger_ratio(mut self, ratio: f64) -> Self {
        self.trigger_ratio = ratio;
        self
    }

    pub fn keep_recent(&self) -> usize {
        self.keep_recent
    }

    /// True when `messages` use more than the trigger share of `max_tokens`
    pub fn should_compact(&self, messages: &[Message], max_tokens: usize) -> bool {
        let used = estimate_messages_tokens(messages);
        used as f64 > max_tokens as f64 * self.trigger_ratio
    }

    /// Summarise everything but the last `keep_recent` messages.
    ///
    /// Returns `None` without calling the model when the history is too
    /// short (at most `keep_recent + 2` messages) or holds nothing but
    /// earlier summaries outside the kept tail. Errors come from the
    /// summary call; the caller's history is never touched here.
    pub async fn compact(&self, messages: &[Message]) -> Result<Option<CompactionResult>> {
        if messages.len() <= self.keep_recent + 2 {
            debug!(
                messages = messages.len(),
                keep_recent = self.keep_recent,
                "history too short to compact"
            );
            return Ok(None);
        }

        // The tail is exactly `keep_recent` messages even when that leaves
        // tool results whose call is summarised; the context builder drops
        // those results from requests.
        let split = messages.len() - self.keep_recent;
        let (older, recent) = messages.split_at(split);

        let to_summarise: Vec<&Message> = older.iter().filter(|m| !is_summary(m)).collect();
        if to_summarise.is_empty() {
            return Ok(None);
        }

        let request = vec![
            Message::system(SUMMARY_INSTRUCTIONS),
            Message::user(format!(
                "Summarise this conversation transcript:\n\n{}",
                render_transcript(&to_summarise)
            )),
        ];
        let options = GenerateOptions {
            max_tokens: Some(self.summary_max_tokens),
            ..Default::default()
        };

        let response = self.llm.chat(&self.model, &request, &[], Some(options)).await?;
        let summary_text = response.content_str().trim();

        let summary_message =
            Message::system(format!("{}\n{}", SUMMARY_PREFIX, summary_text)).named(SUMMARY_NAME);

        let mut new_history = Vec::with_capacity(recent.len() + 1);
        new_history.push(summary_message.clone());
        new_history.extend_from_slice(recent);

        info!(
            compacted = older.len(),
            kept = recent.len(),
            "compacted conversation history"
        );

        Ok(Some(CompactionResult {
            messages: new_history,
            summary_message,
            compacted_count: older.len(),
        }))
    }
}

fn render_transcript(messages: &[&Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(&format!("[{}] {}", message.role, message.content.trim()));
        for call in &message.tool_calls {
            out.push_str(&format!("\n  -> {}({})", call.name, call.arguments));
        }
        out.push('\n');
    }
    out
}
