//! Per-session conversation state.
//!
//! A [`SessionState`] owns the transcript and exactly one [`FlowState`].
//! Each flow variant carries its own stage enum and typed slots, so a
//! stage can never belong to a different flow than the one that is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sojourn_core::types::{ConversationTurn, GroundingLabel, Role};
use uuid::Uuid;

use crate::intent::FlowKind;

/// Content of the assistant turn shown while a reply is being produced.
pub const THINKING_PLACEHOLDER: &str = "Thinking…";

// =============================================================================
// Remittance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceStage {
    AskCountry,
    AskMethod,
    AskAmount,
    ShowOptions,
    OfferBudget,
    Done,
}

impl RemittanceStage {
    pub fn label(&self) -> &'static str {
        match self {
            RemittanceStage::AskCountry => "ask_country",
            RemittanceStage::AskMethod => "ask_method",
            RemittanceStage::AskAmount => "ask_amount",
            RemittanceStage::ShowOptions => "show_options",
            RemittanceStage::OfferBudget => "offer_budget",
            RemittanceStage::Done => "done",
        }
    }

    /// The following stage in flow order; `Done` is terminal.
    pub fn next(&self) -> Self {
        match self {
            RemittanceStage::AskCountry => RemittanceStage::AskMethod,
            RemittanceStage::AskMethod => RemittanceStage::AskAmount,
            RemittanceStage::AskAmount => RemittanceStage::ShowOptions,
            RemittanceStage::ShowOptions => RemittanceStage::OfferBudget,
            RemittanceStage::OfferBudget | RemittanceStage::Done => RemittanceStage::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceState {
    pub stage: RemittanceStage,
    pub country: Option<String>,
    pub method: Option<String>,
    pub amount: Option<String>,
}

impl Default for RemittanceState {
    fn default() -> Self {
        Self {
            stage: RemittanceStage::AskCountry,
            country: None,
            method: None,
            amount: None,
        }
    }
}

// =============================================================================
// Financial
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStage {
    AskGoal,
    AskHorizon,
    AskIncome,
    AskBankPath,
    ShowTips,
    Done,
}

impl FinancialStage {
    pub fn label(&self) -> &'static str {
        match self {
            FinancialStage::AskGoal => "ask_goal",
            FinancialStage::AskHorizon => "ask_horizon",
            FinancialStage::AskIncome => "ask_income",
            FinancialStage::AskBankPath => "ask_bank_path",
            FinancialStage::ShowTips => "show_tips",
            FinancialStage::Done => "done",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FinancialStage::AskGoal => FinancialStage::AskHorizon,
            FinancialStage::AskHorizon => FinancialStage::AskIncome,
            FinancialStage::AskIncome => FinancialStage::AskBankPath,
            FinancialStage::AskBankPath => FinancialStage::ShowTips,
            FinancialStage::ShowTips | FinancialStage::Done => FinancialStage::Done,
        }
    }
}

/// Answer to "do you already have a local bank account?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankPath {
    HasAccount,
    NeedsAccount,
    Skipped,
}

impl BankPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankPath::HasAccount => "has account",
            BankPath::NeedsAccount => "needs account",
            BankPath::Skipped => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialState {
    pub stage: FinancialStage,
    pub goal: Option<String>,
    pub horizon: Option<String>,
    pub income: Option<String>,
    pub bank_path: Option<BankPath>,
}

impl Default for FinancialState {
    fn default() -> Self {
        Self {
            stage: FinancialStage::AskGoal,
            goal: None,
            horizon: None,
            income: None,
            bank_path: None,
        }
    }
}

// =============================================================================
// Scam safety
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScamStage {
    AskScenario,
    AskChannel,
    AskRequests,
    SummarizeRisk,
    ProvideSteps,
    Done,
}

impl ScamStage {
    pub fn label(&self) -> &'static str {
        match self {
            ScamStage::AskScenario => "ask_scenario",
            ScamStage::AskChannel => "ask_channel",
            ScamStage::AskRequests => "ask_requests",
            ScamStage::SummarizeRisk => "summarize_risk",
            ScamStage::ProvideSteps => "provide_steps",
            ScamStage::Done => "done",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ScamStage::AskScenario => ScamStage::AskChannel,
            ScamStage::AskChannel => ScamStage::AskRequests,
            ScamStage::AskRequests => ScamStage::SummarizeRisk,
            ScamStage::SummarizeRisk => ScamStage::ProvideSteps,
            ScamStage::ProvideSteps | ScamStage::Done => ScamStage::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamState {
    pub stage: ScamStage,
    pub scenario: Option<String>,
    pub channel: Option<String>,
    pub requests: Option<Vec<String>>,
}

impl Default for ScamState {
    fn default() -> Self {
        Self {
            stage: ScamStage::AskScenario,
            scenario: None,
            channel: None,
            requests: None,
        }
    }
}

// =============================================================================
// FlowState
// =============================================================================

/// The single live flow of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    Remittance(RemittanceState),
    Financial(FinancialState),
    Scam(ScamState),
}

impl FlowState {
    /// Active flow, or `None` when idle.
    pub fn kind(&self) -> Option<FlowKind> {
        match self {
            FlowState::Idle => None,
            FlowState::Remittance(_) => Some(FlowKind::Remittance),
            FlowState::Financial(_) => Some(FlowKind::Financial),
            FlowState::Scam(_) => Some(FlowKind::Scam),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, FlowState::Idle)
    }

    /// Current stage label, undefined (`None`) when idle.
    pub fn stage_label(&self) -> Option<&'static str> {
        match self {
            FlowState::Idle => None,
            FlowState::Remittance(s) => Some(s.stage.label()),
            FlowState::Financial(s) => Some(s.stage.label()),
            FlowState::Scam(s) => Some(s.stage.label()),
        }
    }

    /// Collected value of a named slot of the active flow.
    pub fn slot(&self, name: &str) -> Option<String> {
        match self {
            FlowState::Idle => None,
            FlowState::Remittance(s) => match name {
                "country" => s.country.clone(),
                "method" => s.method.clone(),
                "amount" => s.amount.clone(),
                _ => None,
            },
            FlowState::Financial(s) => match name {
                "goal" => s.goal.clone(),
                "horizon" => s.horizon.clone(),
                "income" => s.income.clone(),
                "bank_path" => s.bank_path.map(|b| b.as_str().to_string()),
                _ => None,
            },
            FlowState::Scam(s) => match name {
                "scenario" => s.scenario.clone(),
                "channel" => s.channel.clone(),
                "requests" => s.requests.as_ref().map(|r| r.join(", ")),
                _ => None,
            },
        }
    }
}

// =============================================================================
// SessionState
// =============================================================================

/// Everything one conversation owns. Lives in memory for the session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub flow: FlowState,
    pub transcript: Vec<ConversationTurn>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            flow: FlowState::Idle,
            transcript: Vec::new(),
        }
    }

    /// Reset history and flow. The session id is kept.
    pub fn clear(&mut self) {
        self.flow = FlowState::Idle;
        self.transcript.clear();
        tracing::debug!(session = %self.id, "Session cleared");
    }

    /// End the active flow, if any, returning which one it was.
    pub fn abandon_flow(&mut self) -> Option<FlowKind> {
        let kind = self.flow.kind();
        self.flow = FlowState::Idle;
        kind
    }

    /// Record a user turn followed by a placeholder assistant turn.
    ///
    /// Returns the transcript length before the turn, for
    /// [`SessionState::rollback_turn`].
    pub fn begin_turn(&mut self, text: &str) -> usize {
        let mark = self.transcript.len();
        self.transcript.push(ConversationTurn::user(text));
        self.transcript.push(ConversationTurn::assistant(
            THINKING_PLACEHOLDER,
            GroundingLabel::Conversational,
            Vec::new(),
        ));
        mark
    }

    /// Replace the trailing placeholder with the resolved assistant turn.
    pub fn resolve_turn(&mut self, turn: ConversationTurn) {
        match self.transcript.last_mut() {
            Some(last) if is_placeholder(last) => *last = turn,
            _ => self.transcript.push(turn),
        }
    }

    /// Drop everything recorded since `mark`.
    pub fn rollback_turn(&mut self, mark: usize) {
        self.transcript.truncate(mark);
    }

    pub fn has_pending_placeholder(&self) -> bool {
        self.transcript.last().is_some_and(is_placeholder)
    }
}

fn is_placeholder(turn: &ConversationTurn) -> bool {
    turn.role == Role::Assistant && turn.content == THINKING_PLACEHOLDER
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Stage order ----

    #[test]
    fn test_remittance_stage_order() {
        let mut stage = RemittanceStage::AskCountry;
        let mut labels = vec![stage.label()];
        while stage != RemittanceStage::Done {
            stage = stage.next();
            labels.push(stage.label());
        }
        assert_eq!(
            labels,
            vec!["ask_country", "ask_method", "ask_amount", "show_options", "offer_budget", "done"]
        );
    }

    #[test]
    fn test_financial_stage_order() {
        assert_eq!(FinancialStage::AskGoal.next(), FinancialStage::AskHorizon);
        assert_eq!(FinancialStage::AskIncome.next(), FinancialStage::AskBankPath);
        assert_eq!(FinancialStage::AskBankPath.next(), FinancialStage::ShowTips);
        assert_eq!(FinancialStage::Done.next(), FinancialStage::Done);
    }

    #[test]
    fn test_scam_stage_order() {
        assert_eq!(ScamStage::AskRequests.next(), ScamStage::SummarizeRisk);
        assert_eq!(ScamStage::SummarizeRisk.next(), ScamStage::ProvideSteps);
        assert_eq!(ScamStage::ProvideSteps.next(), ScamStage::Done);
    }

    // ---- FlowState ----

    #[test]
    fn test_idle_has_no_stage_or_slots() {
        let flow = FlowState::Idle;
        assert_eq!(flow.kind(), None);
        assert_eq!(flow.stage_label(), None);
        assert_eq!(flow.slot("country"), None);
        assert!(!flow.is_active());
    }

    #[test]
    fn test_slots_are_per_flow() {
        let flow = FlowState::Remittance(RemittanceState {
            country: Some("Vietnam".to_string()),
            ..Default::default()
        });
        assert_eq!(flow.slot("country").as_deref(), Some("Vietnam"));
        assert_eq!(flow.slot("goal"), None);
        assert_eq!(flow.stage_label(), Some("ask_country"));

        let flow = FlowState::Scam(ScamState {
            requests: Some(vec!["otp".to_string(), "deposit".to_string()]),
            ..Default::default()
        });
        assert_eq!(flow.slot("requests").as_deref(), Some("otp, deposit"));
    }

    #[test]
    fn test_flow_state_serializes_tagged() {
        let flow = FlowState::Financial(FinancialState::default());
        let json = serde_json::to_value(&flow).unwrap();
        assert_eq!(json["flow"], "financial");
        assert_eq!(json["stage"], "ask_goal");
    }

    // ---- SessionState ----

    #[test]
    fn test_begin_and_resolve_turn() {
        let mut session = SessionState::new();
        let mark = session.begin_turn("hello");
        assert_eq!(mark, 0);
        assert_eq!(session.transcript.len(), 2);
        assert!(session.has_pending_placeholder());

        session.resolve_turn(ConversationTurn::assistant(
            "hi",
            GroundingLabel::Conversational,
            vec![],
        ));
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript[1].content, "hi");
        assert!(!session.has_pending_placeholder());
    }

    #[test]
    fn test_rollback_turn_removes_user_and_placeholder() {
        let mut session = SessionState::new();
        let mark = session.begin_turn("first");
        session.resolve_turn(ConversationTurn::assistant("ok", GroundingLabel::Grounded, vec![]));

        let mark2 = session.begin_turn("second");
        session.rollback_turn(mark2);
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript[0].content, "first");
        assert_eq!(mark, 0);
    }

    #[test]
    fn test_clear_resets_history_and_flow() {
        let mut session = SessionState::new();
        let id = session.id;
        session.begin_turn("x");
        session.flow = FlowState::Scam(ScamState::default());

        session.clear();
        assert!(session.transcript.is_empty());
        assert_eq!(session.flow, FlowState::Idle);
        assert_eq!(session.id, id);
    }

    #[test]
    fn test_abandon_flow_reports_kind() {
        let mut session = SessionState::new();
        assert_eq!(session.abandon_flow(), None);
        session.flow = FlowState::Remittance(RemittanceState::default());
        assert_eq!(session.abandon_flow(), Some(FlowKind::Remittance));
        assert!(!session.flow.is_active());
    }
}
