//! Answer Synthesizer - Generates answers grounded in book context
//!
//! Provides:
//! - Fixed prompt templates (grounded and context-free)
//! - Oversized context truncation before prompting
//! - Per-call timeout with exponential-backoff retries
//! - Low-confidence tagging of context-free answers
//! - Summaries of book text through the same retry path

use crate::config::{ContextConfig, ModelConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::{Answer, Summary};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::assembler::{char_len, ContextAssembler};
use super::model::ModelClient;

pub const CONTEXT_HEADER: &str = "### Context";
pub const QUESTION_HEADER: &str = "### Question";
pub const ANSWER_HEADER: &str = "### Answer";
pub const TEXT_HEADER: &str = "### Text";
pub const SUMMARY_HEADER: &str = "### Summary";

const GROUNDED_INSTRUCTIONS: &str = "You are a reading assistant for a personal library of technical books. \
Answer the question using ONLY the excerpts in the context section. \
If the excerpts do not contain the answer, say so plainly. Do not make up information.";

const CONTEXT_FREE_INSTRUCTIONS: &str = "You are a reading assistant for a personal library of technical books. \
No excerpts from the library matched this question. Answer from general knowledge, \
keep the answer brief, and state that it is not based on the user's books.";

const SUMMARY_INSTRUCTIONS: &str = "You are a reading assistant for a personal library of technical books. \
Summarize the text below in a few sentences, keeping its key terms. \
Use only what the text says.";

/// Build the summary prompt for `text`
pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n\n{}\n",
        SUMMARY_INSTRUCTIONS,
        TEXT_HEADER,
        text.trim(),
        SUMMARY_HEADER
    )
}

/// Build the prompt for `question`, grounded in `context` when it is non-empty
pub fn build_prompt(question: &str, context: &str) -> String {
    let question = question.trim();
    if context.trim().is_empty() {
        format!(
            "{}\n\n{}\n{}\n\n{}\n",
            CONTEXT_FREE_INSTRUCTIONS, QUESTION_HEADER, question, ANSWER_HEADER
        )
    } else {
        format!(
            "{}\n\n{}\n{}\n\n{}\n{}\n\n{}\n",
            GROUNDED_INSTRUCTIONS, CONTEXT_HEADER, context, QUESTION_HEADER, question, ANSWER_HEADER
        )
    }
}

/// Synthesis options
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Context longer than this (in characters) is truncated
    pub prompt_ceiling_chars: usize,

    /// Per-call timeout
    pub timeout: Duration,

    /// Retries after the first failed call
    pub max_retries: u32,

    /// First backoff delay
    pub initial_backoff: Duration,

    /// Backoff ceiling
    pub max_backoff: Duration,
}

impl SynthesisOptions {
    pub fn from_config(model: &ModelConfig, context: &ContextConfig) -> Self {
        Self {
            prompt_ceiling_chars: context.prompt_ceiling_chars,
            timeout: model.timeout(),
            max_retries: model.max_retries,
            initial_backoff: Duration::from_millis(model.initial_backoff_ms),
            max_backoff: Duration::from_millis(model.max_backoff_ms),
        }
    }
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default(), &ContextConfig::default())
    }
}

/// Synthesizer for generating answers
pub struct Synthesizer {
    model: Arc<dyn ModelClient>,
    assembler: ContextAssembler,
    options: SynthesisOptions,
}

impl Synthesizer {
    /// Create a new synthesizer
    pub fn new(model: Arc<dyn ModelClient>, options: SynthesisOptions) -> Self {
        Self {
            model,
            assembler: ContextAssembler::new(),
            options,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Answer `question` from `context`.
    ///
    /// An empty context still produces an answer, tagged `low_confidence`.
    pub async fn ask(&self, question: &str, context: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(AppError::invalid("question", "Question cannot be empty"));
        }

        let context = if char_len(context) > self.options.prompt_ceiling_chars {
            debug!(
                context_chars = char_len(context),
                ceiling = self.options.prompt_ceiling_chars,
                "Truncating oversized context"
            );
            self.assembler
                .truncate(context, self.options.prompt_ceiling_chars)
        } else {
            context.to_string()
        };

        let low_confidence = context.trim().is_empty();
        let prompt = build_prompt(question, &context);

        let (answer, attempts) = self.complete_with_retry(&prompt).await?;

        Ok(Answer {
            answer,
            low_confidence,
            context_chars: if low_confidence { 0 } else { char_len(&context) },
            attempts,
        })
    }

    /// Summarize `text`, cutting it to the prompt ceiling first
    pub async fn summarize(&self, text: &str) -> Result<Summary> {
        if text.trim().is_empty() {
            return Err(AppError::invalid("text", "Nothing to summarize"));
        }

        let truncated = char_len(text) > self.options.prompt_ceiling_chars;
        let source = if truncated {
            self.assembler.truncate(text, self.options.prompt_ceiling_chars)
        } else {
            text.to_string()
        };

        let prompt = build_summary_prompt(&source);
        let (summary, attempts) = self.complete_with_retry(&prompt).await?;

        Ok(Summary {
            summary,
            source_chars: char_len(&source),
            truncated,
            attempts,
        })
    }

    /// Call the model under the per-call timeout, retrying transient failures
    async fn complete_with_retry(&self, prompt: &str) -> Result<(String, u32)> {
        let max_attempts = self.options.max_retries + 1;
        let timeout_ms = self.options.timeout.as_millis() as u64;
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.options.initial_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.options.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let start = Instant::now();

            let outcome = match tokio::time::timeout(self.options.timeout, self.model.complete(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout { timeout_ms }),
            };

            metrics::record_model_call(
                start.elapsed().as_secs_f64(),
                self.model.name(),
                outcome.is_ok(),
            );

            match outcome {
                Ok(text) => return Ok((text, attempt)),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.options.max_backoff);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    metrics::record_model_retry(self.model.name());
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempts = attempt, error = %e, "Model unavailable");
                    return Err(AppError::ModelUnavailable {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
