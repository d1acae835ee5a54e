//! Scam-safety flow.
//!
//! ask_scenario → ask_channel → ask_requests → summarize_risk →
//! provide_steps → done. The risk summary is the only answer engine call;
//! reporting steps are static guidance.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use sojourn_rag::AnswerEngine;

use super::{is_yes, mismatch, DialogueFlow, StepOutcome};
use crate::error::ChatError;
use crate::intent::FlowKind;
use crate::session::{FlowState, ScamStage, ScamState};

/// Keywords a passage must mention to ground the risk summary.
pub const SCAM_KEYWORDS: &[&str] = &[
    "scam",
    "fraud",
    "phishing",
    "impersonation",
    "anti-scam",
    "report",
    "police",
    "otp",
    "password",
    "upfront fee",
    "deposit",
    "processing fee",
    "bank details",
    "account number",
];

// Checked in order; the first key contained in the reply wins.
const CHANNEL_MAP: &[(&str, &str)] = &[
    ("sms", "SMS"),
    ("text", "SMS"),
    ("whatsapp", "WhatsApp"),
    ("wechat", "WeChat"),
    ("telegram", "Telegram"),
    ("call", "Phone call"),
    ("phone", "Phone call"),
    ("email", "Email"),
    ("site", "Website"),
    ("web", "Website"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("tiktok", "TikTok"),
    ("agent", "In-person agent"),
    ("in person", "In-person agent"),
];

const REQUEST_KEYWORDS: &[&str] = &[
    "upfront fee",
    "processing fee",
    "deposit",
    "gift card",
    "crypto",
    "bitcoin",
    "bank transfer",
    "paynow",
    "otp",
    "one-time password",
    "password",
    "nric",
    "passport",
    "work permit",
    "bank details",
    "account number",
];

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:sgd|s\$|\$)?\s?\d{1,4}(?:[.,]\d{2})?\b").expect("Invalid amount regex")
});

const REPORTING_STEPS: &str = "Here are safe next steps:\n\n\
1) **Stop contact** with the sender/caller. Do not click links or scan QR codes.\n\
2) **Do not share** OTP, passwords, banking details, or ID images.\n\
3) **Verify independently** with official sources (e.g., the agency or bank’s official site, or the hotline listed there).\n\
4) **Document** the evidence (screenshots, phone numbers, usernames) in case you need to report.\n\
5) **Report** through official Singapore channels (e.g., national anti-scam resources or the police e-services portal). \
Use only contacts listed on the official websites.\n\
6) If you already sent money or shared details, **contact your bank immediately** to secure your account.\n";

/// Canonical channel named in free text.
pub fn normalize_channel(text: &str) -> Option<&'static str> {
    let low = text.trim().to_lowercase();
    CHANNEL_MAP
        .iter()
        .find(|(key, _)| low.contains(key))
        .map(|(_, channel)| *channel)
}

/// Requested items and money amounts mentioned in `text`, de-duplicated in
/// order of first appearance in the keyword list, then amounts.
pub fn extract_requests(text: &str) -> Vec<String> {
    let low = text.to_lowercase();
    let mut hits: Vec<String> = REQUEST_KEYWORDS
        .iter()
        .filter(|k| low.contains(*k))
        .map(|k| k.to_string())
        .collect();

    for m in AMOUNT_RE.find_iter(&low) {
        let amount = m.as_str().trim().to_string();
        if !hits.contains(&amount) {
            hits.push(amount);
        }
    }
    hits
}

pub struct ScamFlow;

impl ScamFlow {
    fn stage_prompt(state: &ScamState) -> String {
        match state.stage {
            ScamStage::AskScenario => {
                "**What happened?** Please describe the message, call, or offer in your own words."
                    .to_string()
            }
            ScamStage::AskChannel => "Where did this happen? (e.g., **SMS**, **WhatsApp**, \
                 **Phone call**, **Website**, **In-person agent**)"
                .to_string(),
            ScamStage::AskRequests => "Did they ask for anything like **money (upfront/fees)**, \
                 **bank details**, or your **OTP/passport**? Feel free to paste exact wording. \
                 If nothing specific, you can say **not sure**."
                .to_string(),
            ScamStage::ProvideSteps => "If you like, I can also show **how to report** and where \
                 to get official help. Would you like that? (yes/no)"
                .to_string(),
            ScamStage::SummarizeRisk | ScamStage::Done => String::new(),
        }
    }

    fn risk_query(state: &ScamState) -> String {
        let requests = state
            .requests
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(|r| r.join(", "))
            .unwrap_or_else(|| "No specific requests".to_string());
        format!(
            "Scam safety check for a migrant worker in Singapore. \
             Channel: {}. Key details: {}. Requests mentioned: {}. \
             Identify red flags in bullet points, then give clear DO/DON'T steps in simple English. \
             Emphasize: do not share OTP/password, do not pay upfront fees or deposits to strangers, \
             verify with official channels directly, and stop contact if pressured.",
            state.channel.as_deref().unwrap_or("Unknown channel"),
            state.scenario.as_deref().unwrap_or(""),
            requests
        )
    }

    async fn summarize_risk(
        state: &mut ScamState,
        engine: &AnswerEngine,
    ) -> Result<StepOutcome, ChatError> {
        let result = engine
            .answer(&Self::risk_query(state), SCAM_KEYWORDS, false)
            .await?;
        state.stage = ScamStage::SummarizeRisk.next();
        Ok(StepOutcome::answered(
            format!(
                "**Let’s review this safely:**\n\n{}\n\n{}",
                result.answer,
                Self::stage_prompt(state)
            ),
            &result,
        ))
    }
}

#[async_trait]
impl DialogueFlow for ScamFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Scam
    }

    fn start(&self, flow: &mut FlowState) -> String {
        let state = ScamState::default();
        let prompt = Self::stage_prompt(&state);
        *flow = FlowState::Scam(state);
        format!("I’m here to help you stay safe. 🛡️\n\n{}", prompt)
    }

    fn prompt(&self, flow: &FlowState) -> Option<String> {
        match flow {
            FlowState::Scam(state) => Some(Self::stage_prompt(state)),
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
            FlowState::Scam(state) => state,
            other => return Err(mismatch(FlowKind::Scam, other)),
        };
        let input = text.trim();

        let outcome = match state.stage {
            ScamStage::AskScenario => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.scenario = Some(input.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(Self::stage_prompt(state))
            }
            ScamStage::AskChannel => {
                let Some(channel) = normalize_channel(input) else {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                };
                state.channel = Some(channel.to_string());
                state.stage = state.stage.next();
                StepOutcome::prompt(format!("Thanks. {}", Self::stage_prompt(state)))
            }
            ScamStage::AskRequests => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                let hits = extract_requests(input);
                state.requests = Some(if hits.is_empty() && input.eq_ignore_ascii_case("not sure") {
                    vec!["not sure".to_string()]
                } else {
                    hits
                });
                state.stage = state.stage.next();
                Self::summarize_risk(state, engine).await?
            }
            ScamStage::SummarizeRisk => Self::summarize_risk(state, engine).await?,
            ScamStage::ProvideSteps => {
                if input.is_empty() {
                    return Ok(StepOutcome::prompt(Self::stage_prompt(state)));
                }
                state.stage = ScamStage::Done;
                if is_yes(input) {
                    StepOutcome::prompt(format!(
                        "{}\nStay safe. You can ask me anything else anytime.",
                        REPORTING_STEPS
                    ))
                    .finish()
                } else {
                    StepOutcome::prompt("No problem. Stay safe, and feel free to ask anything else.")
                        .finish()
                }
            }
            ScamStage::Done => {
                StepOutcome::prompt("Okay, ending this safety check. Ask me anything else.").finish()
            }
        };

        if outcome.done {
            *flow = FlowState::Idle;
        }
        Ok(outcome)
    }
}
