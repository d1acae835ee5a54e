//! Guided dialogue flows.
//!
//! Defines the `DialogueFlow` async trait shared by the remittance,
//! financial-planning, and scam-safety flows, plus the small input
//! normalisers they have in common.

pub mod financial;
pub mod remittance;
pub mod scam;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use sojourn_core::types::AnswerResult;
use sojourn_rag::AnswerEngine;

use crate::error::ChatError;
use crate::intent::FlowKind;
use crate::session::FlowState;

pub use financial::FinancialFlow;
pub use remittance::RemittanceFlow;
pub use scam::ScamFlow;

/// Result of feeding one user turn to a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub reply: String,
    pub called_engine: bool,
    pub grounded: bool,
    pub sources: Vec<String>,
    pub done: bool,
}

impl StepOutcome {
    /// A flow prompt; the answer engine was not called.
    pub fn prompt(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            called_engine: false,
            grounded: false,
            sources: Vec::new(),
            done: false,
        }
    }

    /// A reply built around an answer engine result.
    pub fn answered(reply: impl Into<String>, answer: &AnswerResult) -> Self {
        Self {
            reply: reply.into(),
            called_engine: true,
            grounded: answer.used_rag,
            sources: answer.sources.clone(),
            done: false,
        }
    }

    /// Mark the flow as finished.
    pub fn finish(mut self) -> Self {
        self.done = true;
        self
    }
}

/// A turn-sequential finite-state dialogue.
///
/// `step` mutates `flow` in place. Callers that need all-or-nothing
/// semantics step a clone and commit it only on `Ok`.
#[async_trait]
pub trait DialogueFlow: Send + Sync {
    fn kind(&self) -> FlowKind;

    /// Whether free text should start this flow.
    fn detect_intent(&self, text: &str) -> bool {
        self.kind().matches(text)
    }

    /// Reset `flow` to this flow's first stage and return the opening prompt.
    fn start(&self, flow: &mut FlowState) -> String;

    /// The question for the current stage, or `None` if `flow` belongs to
    /// another flow.
    fn prompt(&self, flow: &FlowState) -> Option<String>;

    /// Consume one user turn. Reaching the terminal stage sets `flow` to idle.
    async fn step(
        &self,
        text: &str,
        flow: &mut FlowState,
        engine: &AnswerEngine,
    ) -> Result<StepOutcome, ChatError>;
}

/// The three flows in intent priority order.
pub fn default_flows() -> Vec<Box<dyn DialogueFlow>> {
    vec![
        Box::new(RemittanceFlow),
        Box::new(FinancialFlow),
        Box::new(ScamFlow),
    ]
}

// =============================================================================
// Shared input helpers
// =============================================================================

const YES_WORDS: &[&str] = &["yes", "y", "yeah", "ok", "okay", "sure"];

/// Affirmative reply to a yes/no question.
pub fn is_yes(text: &str) -> bool {
    YES_WORDS.contains(&text.trim().to_lowercase().as_str())
}

/// The literal `skip` for optional slots.
pub fn is_skip(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("skip")
}

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid number regex"));

/// First numeric token, after dropping thousands separators.
pub fn first_number(text: &str) -> Option<String> {
    let cleaned = text.replace(',', "");
    NUMBER_RE.find(&cleaned).map(|m| m.as_str().to_string())
}

/// Flow mismatch error for a flow stepped with another flow's state.
pub(crate) fn mismatch(expected: FlowKind, found: &FlowState) -> ChatError {
    ChatError::FlowMismatch {
        expected,
        found: found
            .kind()
            .map(|k| k.as_str().to_string())
            .unwrap_or_else(|| "idle".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        for word in ["yes", "Y", " okay ", "Sure", "yeah", "ok"] {
            assert!(is_yes(word), "{:?} should be yes", word);
        }
        for word in ["no", "", "yes please", "nope"] {
            assert!(!is_yes(word), "{:?} should not be yes", word);
        }
    }

    #[test]
    fn test_is_skip() {
        assert!(is_skip("skip"));
        assert!(is_skip(" SKIP "));
        assert!(!is_skip("skipping"));
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("about 1,200 a month").as_deref(), Some("1200"));
        assert_eq!(first_number("$350.50 or so").as_deref(), Some("350.50"));
        assert_eq!(first_number("200 then 300").as_deref(), Some("200"));
        assert_eq!(first_number("not much"), None);
    }

    #[test]
    fn test_default_flows_priority() {
        let kinds: Vec<FlowKind> = default_flows().iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, FlowKind::PRIORITY.to_vec());
    }

    #[test]
    fn test_outcome_constructors() {
        let answer = AnswerResult::grounded("a".into(), vec!["x.pdf".into()]);
        let outcome = StepOutcome::answered("reply", &answer).finish();
        assert!(outcome.called_engine);
        assert!(outcome.grounded);
        assert!(outcome.done);
        assert_eq!(outcome.sources, vec!["x.pdf"]);

        let prompt = StepOutcome::prompt("q");
        assert!(!prompt.called_engine);
        assert!(!prompt.done);
    }

    #[test]
    fn test_mismatch_names_found_flow() {
        let err = mismatch(FlowKind::Scam, &FlowState::Idle);
        assert_eq!(err.to_string(), "flow mismatch: expected scam, found idle");
    }
}
