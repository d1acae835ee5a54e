//! Conversation layer for Sojourn.
//!
//! Routes each user turn either into a guided dialogue flow (remittance,
//! financial planning, scam safety) or straight to the answer engine, and
//! keeps the per-session transcript and flow state.

pub mod display;
pub mod error;
pub mod flows;
pub mod intent;
pub mod router;
pub mod session;

pub use display::display_sources;
pub use error::ChatError;
pub use flows::{DialogueFlow, FinancialFlow, RemittanceFlow, ScamFlow, StepOutcome};
pub use intent::FlowKind;
pub use router::{ChatRouter, TurnOutput};
pub use session::{
    BankPath, FinancialStage, FinancialState, FlowState, RemittanceStage, RemittanceState, ScamStage,
    ScamState, SessionState,
};
