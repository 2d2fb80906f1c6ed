//! Answer requests end to end
//!
//! `AskService` admits a request through the concurrency gate, retrieves
//! context from the library when the caller supplied none, and hands the
//! question to the synthesizer under the optional whole-request deadline.
//! Summaries of an indexed book or a supplied text take the same path.

use crate::gate::AskGate;
use axiotome_common::config::AppConfig;
use axiotome_common::context::{char_len, ContextAssembler, ModelClient, SynthesisOptions, Synthesizer};
use axiotome_common::errors::{AppError, Result};
use axiotome_common::metrics;
use axiotome_common::models::{Answer, BookId, QuerySession, SearchResult, Summary};
use axiotome_search::SearchService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to summarize
#[derive(Debug, Clone)]
pub enum SummaryTarget {
    /// Indexed text of a registered book
    Book(BookId),
    Text(String),
}

/// `ask_ai` and `summarize` entry point
pub struct AskService {
    search: Arc<SearchService>,
    synthesizer: Synthesizer,
    assembler: ContextAssembler,
    gate: AskGate,
    retrieve_when_empty: bool,
    retrieval_top_k: usize,
    budget_chars: usize,
    max_question_chars: usize,
    deadline: Option<Duration>,
}

impl AskService {
    pub fn new(config: &AppConfig, search: Arc<SearchService>, model: Arc<dyn ModelClient>) -> Self {
        Self {
            search,
            synthesizer: Synthesizer::new(
                model,
                SynthesisOptions::from_config(&config.model, &config.context),
            ),
            assembler: ContextAssembler::new(),
            gate: AskGate::from_config(&config.ask),
            retrieve_when_empty: config.context.retrieve_when_empty,
            retrieval_top_k: config.context.retrieval_top_k,
            budget_chars: config.context.budget_chars,
            max_question_chars: config.context.max_question_chars,
            deadline: config.model.request_deadline(),
        }
    }

    /// Override the whole-request deadline
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn gate(&self) -> &AskGate {
        &self.gate
    }

    pub fn model_name(&self) -> &str {
        self.synthesizer.model_name()
    }

    /// Answer `question`, grounded in `context` or in retrieved passages
    pub async fn ask_ai(&self, question: &str, context: Option<&str>) -> Result<Answer> {
        let result = self.admit_and_answer(question, context).await;
        metrics::record_ask(outcome_label(&result));
        result
    }

    async fn admit_and_answer(&self, question: &str, context: Option<&str>) -> Result<Answer> {
        self.validate(question)?;

        let _permit = self.gate.acquire().await?;
        self.within_deadline(self.answer(question, context)).await
    }

    /// Summarize a book's indexed text or a supplied text
    pub async fn summarize(&self, target: SummaryTarget) -> Result<Summary> {
        let result = self.admit_and_summarize(target).await;
        metrics::record_summary(match &result {
            Ok(_) => "summarized",
            Err(e) => outcome_label_for(e),
        });
        result
    }

    async fn admit_and_summarize(&self, target: SummaryTarget) -> Result<Summary> {
        let (book_id, text) = match target {
            SummaryTarget::Book(book_id) => {
                let document = self
                    .search
                    .document(book_id)
                    .ok_or(AppError::BookNotFound { id: book_id })?;
                let lines: Vec<&str> = document.lines().iter().map(|l| l.text.as_str()).collect();
                (Some(book_id), lines.join("\n"))
            }
            SummaryTarget::Text(text) => (None, text),
        };
        if text.trim().is_empty() {
            return Err(AppError::invalid("text", "Nothing to summarize"));
        }

        let _permit = self.gate.acquire().await?;
        let summary = self.within_deadline(self.synthesizer.summarize(&text)).await?;

        info!(
            book_id,
            model = self.synthesizer.model_name(),
            source_chars = summary.source_chars,
            truncated = summary.truncated,
            attempts = summary.attempts,
            "Text summarized"
        );
        Ok(summary)
    }

    async fn within_deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, work).await.map_err(|_| {
                warn!(deadline_ms = deadline.as_millis() as u64, "Request deadline elapsed");
                AppError::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                }
            })?,
            None => work.await,
        }
    }

    async fn answer(&self, question: &str, context: Option<&str>) -> Result<Answer> {
        let supplied = context.filter(|c| !c.trim().is_empty());

        let (context, results) = match supplied {
            Some(context) => (context.to_string(), Vec::new()),
            None if self.retrieve_when_empty => self.retrieve(question),
            None => (String::new(), Vec::new()),
        };

        let answer = self.synthesizer.ask(question, &context).await?;

        let session = QuerySession::new(question, results).with_answer(answer.clone());
        info!(
            session_id = %session.id,
            model = self.synthesizer.model_name(),
            candidates = session.results.len(),
            context_chars = answer.context_chars,
            low_confidence = answer.low_confidence,
            attempts = answer.attempts,
            "Question answered"
        );

        Ok(answer)
    }

    /// Search the library with the question and pack the hits into the context budget
    fn retrieve(&self, question: &str) -> (String, Vec<SearchResult>) {
        let results = match self.search.search(question, Some(self.retrieval_top_k)) {
            Ok(response) => response.into_results(),
            Err(e) => {
                warn!(error = %e, "Context retrieval failed, answering without context");
                return (String::new(), Vec::new());
            }
        };

        let (context, used) = self.assembler.assemble(&results, self.budget_chars);
        debug!(
            candidates = results.len(),
            used,
            context_chars = char_len(&context),
            "Context assembled"
        );

        (context, results)
    }

    fn validate(&self, question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(AppError::invalid("question", "Question cannot be empty"));
        }
        let chars = char_len(question);
        if chars > self.max_question_chars {
            return Err(AppError::invalid(
                "question",
                format!(
                    "Question is {} characters, maximum is {}",
                    chars, self.max_question_chars
                ),
            ));
        }
        Ok(())
    }
}

fn outcome_label(result: &Result<Answer>) -> &'static str {
    match result {
        Ok(answer) if answer.low_confidence => "low_confidence",
        Ok(_) => "answered",
        Err(e) => outcome_label_for(e),
    }
}

fn outcome_label_for(error: &AppError) -> &'static str {
    match error {
        AppError::InvalidInput { .. } => "invalid_input",
        AppError::BookNotFound { .. } => "book_not_found",
        AppError::Busy { .. } => "busy",
        AppError::Timeout { .. } => "timeout",
        AppError::ModelUnavailable { .. } => "model_unavailable",
        _ => "error",
    }
}
