//! Financial-planning flow.
//!
//! ask_goal → ask_horizon → ask_income (optional) → ask_bank_path
//! (optional) → show_tips → done. Answering "no" at ask_bank_path produces
//! account-opening guidance and rests at show_tips, so the savings plan
//! arrives on the next turn. Otherwise the plan follows immediately.

use async_trait::async_trait;
use sojourn_rag::AnswerEngine;

use super::{first_number, is_skip, is_yes, mismatch, DialogueFlow, StepOutcome};
use crate::error::ChatError;
use crate::intent::FlowKind;
use crate::session::{BankPath, FinancialStage, FinancialState, FlowState};

/// Keywords a passage must mention to ground account-opening guidance.
pub const BANK_SETUP_KEYWORDS: &[&str] = &["bank account", "open an account", "bank", "atm"];

/// Keywords a passage must mention to ground the savings plan.
pub const TIPS_KEYWORDS: &[&str] = &["budget", "saving", "savings", "emergency fund", "financial"];

const NO_WORDS: &[&str] = &["no", "n", "nope", "not yet"];

fn parse_bank_path(text: &str) -> Option<BankPath> {
    let low = text.trim().to_lowercase();
    if is_skip(&low) {
        Some(BankPath::Skipped)
    } else if is_yes(&low) {
        Some(BankPath::HasAccount)
    } else if NO_WORDS.contains(&low.as_str()) {
        Some(BankPath::NeedsAccount)
    } else {
        None
    }
}

pub struct FinancialFlow;

impl FinancialFlow {
    fn stage_prompt(state: &FinancialState) -> String {
        match state.stage {
            FinancialStage::AskGoal => {
                "What’s your main **goal** (e.g., save for family, emergency fund, pay debt)?"
                    .to_string()
            }
            FinancialStage::AskHorizon => {
                "What’s your **time horizon**? (e.g., 3 months, 1 year)".to_string()
            }
            FinancialStage::AskIncome => "(Optional) Roughly how much do you earn **per month** in SGD? \
                 Reply with a number like `1800` or say **skip**."
                .to_string(),
            FinancialStage::AskBankPath => {
                "Do you already have a **bank account** in Singapore? (yes/no, or **skip**)".to_string()
            }
            FinancialStage::ShowTips => {
                "Say **continue** when you’re ready for your savings plan.".to_string()
            }
            FinancialStage::Done => String::new(),
        }
    }

    fn bank_setup_query() -> String {
        "How can a migrant worker in Singapore open a basic bank account? \
         Cover who is eligible, documents usually required, and safe use of ATMs and \
         online banking. Keep it simple."
            .to_string()
    }

    fn tips_query(state: &FinancialState) -> String {
        let mut query = format!(
            "Simple financial planning steps for a migrant worker in Singapore. \
             Goal: {}. Time horizon: {}.",
            state.goal.as_deref().unwrap_or("general savings"),
            state.horizon.as_deref().unwrap_or("not specified"),
        );
        if let Some(income) = &state.income {
            query.push_str(&format!(" Monthly income: about SGD {}.", income));
        }
        query.push_str(
            " Keep it practical: budgeting % split, emergency fund basics, \
             safe remittance timing, avoid scams.",
        );
        query
    }

    async fn show_tips(
        state: &mut FinancialState,
        engine: &AnswerEngine,
    ) -> Result<StepOutcome, ChatError> {
        let result = engine
            .answer(&Self::tips_query(state), TIPS_KEYWORDS, false)
            .await?;
        state.stage = FinancialStage::Done;
        Ok(StepOutcome::answered(
            format!(
                "Here’s a simple plan:\n\n{}\n\nYou can ask another question anytime.",
                result.answer
            ),
            &result,
        )
        .finish())
    }
}

#[async_trait]
impl DialogueFlow for FinancialFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Financial
    }

    fn start(&self, flow: &mut FlowState) -> String {
        let state = FinancialState::default();
        let prompt = Self::stage_prompt(&state);
        *flow = FlowState::Financial(state);
        format!("Let’s plan your money 📈 {}", prompt)
    }

    fn prompt(&self, flow: &FlowState) -> Option<String> {
        match flow {
            FlowState::Financial(state) => Some(Self::stage_prompt(state)),
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
            FlowState::Financial(state) => state,
            other => return Err(mismatch(FlowKind::Financial, other)),
        };
        let input = text.trim();

        let outcome = match state.stage {
            FinancialStage::AskGoal => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.goal = Some(input.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(Self::stage_prompt(state))
            }
            FinancialStage::AskHorizon => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.horizon = Some(input.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(Self::stage_prompt(state))
            }
            FinancialStage::AskIncome => {
                if is_skip(input) {
                    state.income = None;
                } else if let Some(income) = first_number(input) {
                    state.income = Some(income);
                } else {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.stage = state.stage.next();
                StepOutcome::prompt(Self::stage_prompt(state))
            }
            FinancialStage::AskBankPath => {
                let Some(path) = parse_bank_path(input) else {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                };
                state.bank_path = Some(path);
                state.stage = state.stage.next();

                if path == BankPath::NeedsAccount {
                    let result = engine
                        .answer(&Self::bank_setup_query(), BANK_SETUP_KEYWORDS, false)
                        .await?;
                    StepOutcome::answered(
                        format!(
                            "Here’s how to get started with a bank account:\n\n{}\n\n{}",
                            result.answer,
                            Self::stage_prompt(state)
                        ),
                        &result,
                    )
                } else {
                    Self::show_tips(state, engine).await?
                }
            }
            FinancialStage::ShowTips => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                Self::show_tips(state, engine).await?
            }
            FinancialStage::Done => {
                StepOutcome::prompt("Okay, ending this planning flow. Ask me anything else.").finish()
            }
        };

        if outcome.done {
            *flow = FlowState::Idle;
        }
        Ok(outcome)
    }
}
