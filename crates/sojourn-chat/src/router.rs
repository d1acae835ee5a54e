//! Turn router: the session boundary of the conversation layer.
//!
//! Validates the message, then either lets the active flow consume it,
//! starts a flow whose intent matches, or sends it to the answer engine.
//! Flow state changes and transcript entries are committed only when the
//! turn succeeds; a hard failure leaves the session as it was.

use sojourn_core::config::ChatConfig;
use sojourn_core::types::{ConversationTurn, GroundingLabel};
use sojourn_rag::AnswerEngine;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::flows::{default_flows, DialogueFlow, StepOutcome};
use crate::intent::FlowKind;
use crate::session::{FlowState, SessionState};

/// Words that end the active flow when sent on their own.
const ABANDON_WORDS: &[&str] = &["cancel", "stop", "exit", "quit flow"];

/// What the caller shows for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    pub display_text: String,
    pub grounding_label: GroundingLabel,
    pub sources: Vec<String>,
}

impl TurnOutput {
    fn conversational(text: impl Into<String>) -> Self {
        Self {
            display_text: text.into(),
            grounding_label: GroundingLabel::Conversational,
            sources: Vec::new(),
        }
    }

    fn from_outcome(outcome: StepOutcome) -> Self {
        let grounding_label = if outcome.called_engine {
            GroundingLabel::for_answer(outcome.grounded)
        } else {
            GroundingLabel::Conversational
        };
        Self {
            display_text: outcome.reply,
            grounding_label,
            sources: outcome.sources,
        }
    }
}

/// Routes user turns to flows or the answer engine.
pub struct ChatRouter {
    engine: AnswerEngine,
    flows: Vec<Box<dyn DialogueFlow>>,
    max_message_length: usize,
}

impl ChatRouter {
    /// Router with the remittance, financial, and scam flows.
    pub fn new(engine: AnswerEngine, config: &ChatConfig) -> Self {
        Self::with_flows(engine, default_flows(), config)
    }

    /// Router with a custom flow list, tested for intent in list order.
    pub fn with_flows(
        engine: AnswerEngine,
        flows: Vec<Box<dyn DialogueFlow>>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            engine,
            flows,
            max_message_length: config.max_message_length,
        }
    }

    fn flow_for(&self, kind: FlowKind) -> Option<&dyn DialogueFlow> {
        self.flows
            .iter()
            .find(|f| f.kind() == kind)
            .map(|f| f.as_ref())
    }

    /// Process one user turn against `session`.
    ///
    /// On error the session is unchanged: no transcript entries, no flow
    /// state writes. The same turn can be retried.
    pub async fn process_turn(
        &self,
        session: &mut SessionState,
        text: &str,
    ) -> Result<TurnOutput, ChatError> {
        let input = text.trim();
        if input.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        if input.is_empty() && !session.flow.is_active() {
            return Err(ChatError::EmptyMessage);
        }

        let mark = session.begin_turn(input);

        if session.flow.is_active() && is_abandon(input) {
            if let Some(kind) = session.abandon_flow() {
                info!(session = %session.id, flow = %kind, "Flow abandoned");
                let output = TurnOutput::conversational(format!(
                    "Okay, I’ve stopped the {} flow. Ask me anything else.",
                    kind
                ));
                session.resolve_turn(ConversationTurn::assistant(
                    output.display_text.clone(),
                    output.grounding_label,
                    Vec::new(),
                ));
                return Ok(output);
            }
        }

        match self.dispatch(&session.flow, input).await {
            Ok((output, next_flow)) => {
                if next_flow.kind() != session.flow.kind() {
                    info!(
                        session = %session.id,
                        from = ?session.flow.kind(),
                        to = ?next_flow.kind(),
                        "Flow changed"
                    );
                }
                session.flow = next_flow;
                session.resolve_turn(ConversationTurn::assistant(
                    output.display_text.clone(),
                    output.grounding_label,
                    output.sources.clone(),
                ));
                Ok(output)
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "Turn failed, session left unchanged");
                session.rollback_turn(mark);
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        flow: &FlowState,
        input: &str,
    ) -> Result<(TurnOutput, FlowState), ChatError> {
        if let Some(kind) = flow.kind() {
            match self.flow_for(kind) {
                Some(handler) => {
                    let mut next = flow.clone();
                    let outcome = handler.step(input, &mut next, &self.engine).await?;
                    return Ok((TurnOutput::from_outcome(outcome), next));
                }
                None => {
                    warn!(flow = %kind, "No handler registered for active flow, dropping it");
                }
            }
        }

        if let Some(handler) = self.flows.iter().find(|f| f.detect_intent(input)) {
            let mut next = FlowState::Idle;
            let prompt = handler.start(&mut next);
            return Ok((TurnOutput::conversational(prompt), next));
        }

        let result = self.engine.ask(input).await?;
        Ok((
            TurnOutput {
                display_text: result.answer,
                grounding_label: GroundingLabel::for_answer(result.used_rag),
                sources: result.sources,
            },
            FlowState::Idle,
        ))
    }
}

fn is_abandon(input: &str) -> bool {
    let low = input.trim().to_lowercase();
    ABANDON_WORDS.contains(&low.as_str())
}
