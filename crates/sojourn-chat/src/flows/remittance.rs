//! Remittance flow.
//!
//! ask_country → ask_method → ask_amount (optional) → show_options →
//! offer_budget → done. `show_options` runs in the same turn the amount is
//! given, so the session rests at `offer_budget` afterwards.

use async_trait::async_trait;
use sojourn_rag::AnswerEngine;

use super::{first_number, is_skip, is_yes, mismatch, DialogueFlow, StepOutcome};
use crate::error::ChatError;
use crate::intent::FlowKind;
use crate::session::{FlowState, RemittanceStage, RemittanceState};

/// Keywords a passage must mention to ground transfer guidance.
pub const OPTIONS_KEYWORDS: &[&str] = &[
    "remit",
    "remittance",
    "transfer",
    "send money",
    "fees",
    "exchange rate",
];

/// Keywords a passage must mention to ground budgeting tips.
pub const BUDGET_KEYWORDS: &[&str] = &["budget", "saving", "savings", "emergency fund", "remit"];

// Checked in order; the first key contained in the reply wins.
const METHOD_MAP: &[(&str, &str)] = &[
    ("bank", "bank transfer"),
    ("cash", "cash pickup"),
    ("pickup", "cash pickup"),
    ("wallet", "mobile wallet"),
    ("mobile", "mobile wallet"),
];

/// Canonical transfer method named in free text.
pub fn normalize_method(text: &str) -> Option<&'static str> {
    let low = text.trim().to_lowercase();
    METHOD_MAP
        .iter()
        .find(|(key, _)| low.contains(key))
        .map(|(_, method)| *method)
}

pub struct RemittanceFlow;

impl RemittanceFlow {
    fn stage_prompt(state: &RemittanceState) -> String {
        match state.stage {
            RemittanceStage::AskCountry => {
                "Which **country** do you usually send money to?".to_string()
            }
            RemittanceStage::AskMethod => {
                "Do you prefer **bank transfer**, **cash pickup**, or **mobile wallet**?".to_string()
            }
            RemittanceStage::AskAmount => "(Optional) About how much do you usually send **per month**? \
                 You can reply with an amount like `200` or say **skip**."
                .to_string(),
            RemittanceStage::OfferBudget => "Would you also like **simple budgeting tips** to help plan \
                 your remittances each month? (yes/no)"
                .to_string(),
            RemittanceStage::ShowOptions | RemittanceStage::Done => String::new(),
        }
    }

    fn options_query(state: &RemittanceState) -> String {
        let country = state.country.as_deref().unwrap_or("the destination country");
        let method = state.method.as_deref().unwrap_or("a suitable method");
        let mut focus = format!(" from Singapore to {} via {}", country, method);
        if let Some(amount) = &state.amount {
            focus.push_str(&format!(" for about SGD {} per month", amount));
        }
        format!(
            "Remittance guidance{}. Cover fees range if available, typical transfer times, \
             required documents/KYC, and safety tips. If context is insufficient, provide \
             high-level safe guidance. Be clear and simple.",
            focus
        )
    }

    fn budget_query(state: &RemittanceState) -> String {
        let country = state.country.as_deref().unwrap_or("home country");
        format!(
            "Budgeting tips for migrant workers in Singapore who remit monthly to {}. \
             Make it practical: % to save, small emergency fund, reminders for fee timing, \
             and caution against scams.",
            country
        )
    }

    async fn show_options(
        state: &mut RemittanceState,
        engine: &AnswerEngine,
    ) -> Result<StepOutcome, ChatError> {
        let result = engine
            .answer(&Self::options_query(state), OPTIONS_KEYWORDS, false)
            .await?;
        state.stage = RemittanceStage::ShowOptions.next();

        let reply = format!(
            "Here’s what to expect when sending money to **{}** via **{}**:\n\n{}\n\n{}",
            state.country.as_deref().unwrap_or("your destination"),
            state.method.as_deref().unwrap_or("your chosen method"),
            result.answer,
            Self::stage_prompt(state)
        );
        Ok(StepOutcome::answered(reply, &result))
    }
}

#[async_trait]
impl DialogueFlow for RemittanceFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Remittance
    }

    fn start(&self, flow: &mut FlowState) -> String {
        let state = RemittanceState::default();
        let prompt = Self::stage_prompt(&state);
        *flow = FlowState::Remittance(state);
        format!("Let’s sort out **remittance** ✨\n{}", prompt)
    }

    fn prompt(&self, flow: &FlowState) -> Option<String> {
        match flow {
            FlowState::Remittance(state) => Some(Self::stage_prompt(state)),
            _ => None,
        }
    }

    async fn step(
        &self,
        text: &str,
        flow: &mut FlowState,
        engine: &AnswerEngine,
    ) -> Result<StepOutcome, ChatError> {
        let state = match &mut *flow {
            FlowState::Remittance(state) => state,
            other => return Err(mismatch(FlowKind::Remittance, other)),
        };
        let input = text.trim();

        let outcome = match state.stage {
            RemittanceStage::AskCountry => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.country = Some(input.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(format!(
                    "Got it: **{}**. {}",
                    input,
                    Self::stage_prompt(state)
                ))
            }
            RemittanceStage::AskMethod => {
                let Some(method) = normalize_method(input) else {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                };
                state.method = Some(method.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(format!("Okay: **{}**. {}", method, Self::stage_prompt(state)))
            }
            RemittanceStage::AskAmount => {
                if is_skip(input) {
                    state.amount = None;
                } else if let Some(amount) = first_number(input) {
                    state.amount = Some(amount);
                } else {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.stage = state.stage.next();
                Self::show_options(state, engine).await?
            }
            RemittanceStage::ShowOptions => Self::show_options(state, engine).await?,
            RemittanceStage::OfferBudget => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.stage = RemittanceStage::Done;
                if is_yes(input) {
                    let result = engine
                        .answer(&Self::budget_query(state), BUDGET_KEYWORDS, false)
                        .await?;
                    StepOutcome::answered(
                        format!(
                            "Great, here are some budgeting tips:\n\n{}\n\nYou can ask another question anytime.",
                            result.answer
                        ),
                        &result,
                    )
                    .finish()
                } else {
                    StepOutcome::prompt("No worries. You can ask another question anytime.").finish()
                }
            }
            RemittanceStage::Done => {
                StepOutcome::prompt("Okay, ending this remittance flow. Ask me anything else.")
                    .finish()
            }
        };

        if outcome.done {
            *flow = FlowState::Idle;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sojourn_core::config::SojournConfig;
    use sojourn_core::types::{Passage, SourceId};
    use sojourn_rag::{ScriptedCompletion, StaticIndex};

    fn engine(passages: Vec<Passage>, completion: Arc<ScriptedCompletion>) -> AnswerEngine {
        AnswerEngine::new(
            Arc::new(StaticIndex::new(passages)),
            completion,
            &SojournConfig::default(),
        )
    }

    fn at_stage(stage: RemittanceStage) -> FlowState {
        FlowState::Remittance(RemittanceState {
            stage,
            country: Some("Vietnam".to_string()),
            method: Some("bank transfer".to_string()),
            amount: None,
        })
    }

    // ---- Method normalisation ----

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("I'll use my bank"), Some("bank transfer"));
        assert_eq!(normalize_method("Cash Pickup please"), Some("cash pickup"));
        assert_eq!(normalize_method("pickup"), Some("cash pickup"));
        assert_eq!(normalize_method("GCash wallet"), Some("cash pickup"));
        assert_eq!(normalize_method("mobile app"), Some("mobile wallet"));
        assert_eq!(normalize_method("pigeon"), None);
    }

    // ---- Stages ----

    #[test]
    fn test_start_resets_slots() {
        let flow_impl = RemittanceFlow;
        let mut flow = at_stage(RemittanceStage::OfferBudget);
        let reply = flow_impl.start(&mut flow);

        assert!(reply.ends_with("Which **country** do you usually send money to?"));
        assert_eq!(flow.stage_label(), Some("ask_country"));
        assert_eq!(flow.slot("country"), None);
    }

    #[tokio::test]
    async fn test_country_then_method() {
        let completion = Arc::new(ScriptedCompletion::new());
        let engine = engine(vec![], completion.clone());
        let flow_impl = RemittanceFlow;
        let mut flow = FlowState::Idle;
        flow_impl.start(&mut flow);

        let out = flow_impl.step("Vietnam", &mut flow, &engine).await.unwrap();
        assert!(out.reply.contains("**Vietnam**"));
        assert_eq!(flow.stage_label(), Some("ask_method"));

        let out = flow_impl.step("I'll use my bank", &mut flow, &engine).await.unwrap();
        assert!(!out.called_engine);
        assert_eq!(flow.slot("method").as_deref(), Some("bank transfer"));
        assert_eq!(flow.stage_label(), Some("ask_amount"));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_method_reprompts() {
        let engine = engine(vec![], Arc::new(ScriptedCompletion::new()));
        let flow_impl = RemittanceFlow;
        let mut flow = at_stage(RemittanceStage::AskMethod);
        let before = flow.clone();

        let out = flow_impl.step("carrier pigeon", &mut flow, &engine).await.unwrap();
        assert_eq!(flow, before);
        assert_eq!(Some(out.reply), flow_impl.prompt(&flow));
    }

    #[tokio::test]
    async fn test_amount_triggers_options_and_rests_at_offer_budget() {
        let completion = Arc::new(ScriptedCompletion::new().reply("Fees are low [remit.pdf]."));
        let engine = engine(
            vec![Passage::new(
                "Remittance fees depend on provider",
                SourceId::FileName("remit.pdf".to_string()),
            )],
            completion.clone(),
        );
        let flow_impl = RemittanceFlow;
        let mut flow = at_stage(RemittanceStage::AskAmount);

        let out = flow_impl.step("about 1,500", &mut flow, &engine).await.unwrap();
        assert!(out.called_engine);
        assert!(out.grounded);
        assert_eq!(out.sources, vec!["remit.pdf"]);
        assert!(out.reply.contains("Fees are low [remit.pdf]."));
        assert!(out.reply.ends_with("(yes/no)"));
        assert_eq!(flow.stage_label(), Some("offer_budget"));
        assert_eq!(flow.slot("amount").as_deref(), Some("1500"));

        let query = completion.calls()[0].user().unwrap().to_string();
        assert!(query.contains("to Vietnam via bank transfer for about SGD 1500 per month"));
    }

    #[tokio::test]
    async fn test_amount_skip_and_invalid() {
        let engine = engine(vec![], Arc::new(ScriptedCompletion::new()));
        let flow_impl = RemittanceFlow;

        let mut flow = at_stage(RemittanceStage::AskAmount);
        let out = flow_impl.step("not sure", &mut flow, &engine).await.unwrap();
        assert!(!out.called_engine);
        assert_eq!(flow.stage_label(), Some("ask_amount"));

        let out = flow_impl.step("skip", &mut flow, &engine).await.unwrap();
        assert!(out.called_engine);
        assert_eq!(flow.slot("amount"), None);
        assert_eq!(flow.stage_label(), Some("offer_budget"));
    }

    #[tokio::test]
    async fn test_budget_yes_finishes_with_tips() {
        let completion = Arc::new(ScriptedCompletion::new().reply("Save 10% monthly."));
        let engine = engine(vec![], completion.clone());
        let flow_impl = RemittanceFlow;
        let mut flow = at_stage(RemittanceStage::OfferBudget);

        let out = flow_impl.step("yes", &mut flow, &engine).await.unwrap();
        assert!(out.done);
        assert!(out.called_engine);
        assert!(out.reply.contains("Save 10% monthly."));
        assert_eq!(flow, FlowState::Idle);
        assert!(completion.calls()[0].user().unwrap().contains("remit monthly to Vietnam"));
    }

    #[tokio::test]
    async fn test_budget_no_finishes_without_engine() {
        let completion = Arc::new(ScriptedCompletion::new());
        let engine = engine(vec![], completion.clone());
        let flow_impl = RemittanceFlow;
        let mut flow = at_stage(RemittanceStage::OfferBudget);

        let out = flow_impl.step("no thanks", &mut flow, &engine).await.unwrap();
        assert!(out.done);
        assert!(!out.called_engine);
        assert_eq!(flow, FlowState::Idle);
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_step_with_other_flow_state_is_mismatch() {
        let engine = engine(vec![], Arc::new(ScriptedCompletion::new()));
        let mut flow = FlowState::Idle;
        let err = RemittanceFlow.step("x", &mut flow, &engine).await.unwrap_err();
        assert!(matches!(err, ChatError::FlowMismatch { .. }));
    }
}
