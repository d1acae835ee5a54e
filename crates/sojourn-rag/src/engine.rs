//! Answer engine.
//!
//! Orchestrates one answer:
//! 1. Detect the query language (fixes the answer language).
//! 2. Optionally translate the query to English for retrieval.
//! 3. Retrieve passages; failures degrade to no context.
//! 4. Gate passages by forced-general, required keywords, or pass focus.
//! 5. Clamp the surviving passages into one context block.
//! 6. Attempt a strictly grounded answer at temperature 0.
//! 7. On a miss, answer from general knowledge, with a notice when
//!    retrieved context was set aside.
//!
//! Completion failures are hard errors for the call; there is no retry.

use std::sync::Arc;

use sojourn_core::config::SojournConfig;
use sojourn_core::types::{AnswerResult, ChatMessage, Passage};

use crate::completion::CompletionClient;
use crate::context;
use crate::error::RagError;
use crate::index::PassageIndex;
use crate::lang::{Language, LanguageDetector};
use crate::prompts;
use crate::retriever::ContextRetriever;

/// Outcome of the grounded attempt.
#[derive(Debug, Clone, PartialEq)]
enum GroundedAttempt {
    Grounded(String),
    Insufficient,
}

/// Tuning copied out of [`SojournConfig`] at construction.
#[derive(Debug, Clone)]
struct EngineSettings {
    context_budget_chars: usize,
    translate_queries: bool,
    grounded_temperature: f32,
    fallback_temperature: f32,
    max_tokens: u32,
}

/// Retrieval-gated answering. Cheap to clone; share one per process.
#[derive(Clone)]
pub struct AnswerEngine {
    retriever: ContextRetriever,
    completion: Arc<dyn CompletionClient>,
    detector: LanguageDetector,
    settings: EngineSettings,
}

impl AnswerEngine {
    pub fn new(
        index: Arc<dyn PassageIndex>,
        completion: Arc<dyn CompletionClient>,
        config: &SojournConfig,
    ) -> Self {
        Self {
            retriever: ContextRetriever::new(index, config.retrieval.top_k),
            completion,
            detector: LanguageDetector::new(),
            settings: EngineSettings {
                context_budget_chars: config.answer.context_budget_chars,
                translate_queries: config.answer.translate_queries,
                grounded_temperature: config.answer.grounded_temperature,
                fallback_temperature: config.answer.fallback_temperature,
                max_tokens: config.completion.max_tokens,
            },
        }
    }

    /// Answer a free-text question with no gating constraints.
    pub async fn ask(&self, query: &str) -> Result<AnswerResult, RagError> {
        self.answer(query, &[], false).await
    }

    /// Answer `query`.
    ///
    /// `required_keywords` restricts grounding to passages mentioning at
    /// least one keyword; when none does, the answer is a fallback.
    /// `force_general` skips grounding entirely.
    pub async fn answer(
        &self,
        query: &str,
        required_keywords: &[&str],
        force_general: bool,
    ) -> Result<AnswerResult, RagError> {
        let lang = self.detector.detect(query);
        let retrieval_query = self.retrieval_query(query, lang).await;

        let retrieved = self.retriever.retrieve(&retrieval_query).await;
        let sources = retrieved.sources();

        let admitted =
            context::gate_passages(&retrieved.passages, query, required_keywords, force_general);

        tracing::debug!(
            lang = %lang,
            retrieved = retrieved.len(),
            admitted = admitted.len(),
            force_general,
            "Gated retrieved passages"
        );

        if !admitted.is_empty() {
            match self.grounded_attempt(query, &admitted, lang).await? {
                GroundedAttempt::Grounded(text) => {
                    tracing::info!(sources = sources.len(), "Answered from retrieved context");
                    return Ok(AnswerResult::grounded(text, sources));
                }
                GroundedAttempt::Insufficient => {
                    tracing::info!("Grounded attempt insufficient, falling back");
                }
            }
        }

        let general = self.general_answer(query, lang).await?;
        // Only when gating set retrieved context aside; never for forced-general calls.
        let notice = if !retrieved.is_empty() && !force_general {
            prompts::FALLBACK_NOTICE
        } else {
            ""
        };

        Ok(AnswerResult::fallback(format!("{}{}", notice, general), sources))
    }

    async fn retrieval_query(&self, query: &str, lang: Language) -> String {
        if !self.settings.translate_queries || lang == Language::English {
            return query.to_string();
        }

        let messages = [
            ChatMessage::system(prompts::translation_prompt(Language::English)),
            ChatMessage::user(query),
        ];
        match self
            .completion
            .complete(&messages, 0.0, self.settings.max_tokens)
            .await
        {
            Ok(text) if !text.is_empty() => {
                tracing::debug!(from = %lang, "Translated query for retrieval");
                text
            }
            Ok(_) => query.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Query translation failed, using original text");
                query.to_string()
            }
        }
    }

    async fn grounded_attempt(
        &self,
        query: &str,
        passages: &[Passage],
        lang: Language,
    ) -> Result<GroundedAttempt, RagError> {
        // Label each passage with its source so the model can cite it.
        let labelled: Vec<Passage> = passages
            .iter()
            .map(|p| Passage::new(format!("[{}]\n{}", p.source, p.text), p.source.clone()))
            .collect();
        let context_block = context::clamp(&labelled, self.settings.context_budget_chars);

        let messages = [
            ChatMessage::system(prompts::strict_prompt(&context_block, lang)),
            ChatMessage::user(query),
        ];
        let reply = self
            .completion
            .complete(
                &messages,
                self.settings.grounded_temperature,
                self.settings.max_tokens,
            )
            .await?;

        if prompts::is_insufficient(&reply) {
            Ok(GroundedAttempt::Insufficient)
        } else {
            Ok(GroundedAttempt::Grounded(reply))
        }
    }

    async fn general_answer(&self, query: &str, lang: Language) -> Result<String, RagError> {
        let messages = [
            ChatMessage::system(prompts::general_prompt(lang)),
            ChatMessage::user(query),
        ];
        self.completion
            .complete(
                &messages,
                self.settings.fallback_temperature,
                self.settings.max_tokens,
            )
            .await
    }
}
