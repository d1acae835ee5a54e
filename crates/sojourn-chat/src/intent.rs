//! Regex intent detection for starting dialogue flows.
//!
//! Each flow has a static table of case-insensitive patterns. Detection is
//! a pure function of the text; [`classify`] applies the fixed priority
//! order remittance, financial, scam.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The guided dialogue flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Remittance,
    Financial,
    Scam,
}

impl FlowKind {
    /// All flows in intent priority order.
    pub const PRIORITY: [FlowKind; 3] = [FlowKind::Remittance, FlowKind::Financial, FlowKind::Scam];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Remittance => "remittance",
            FlowKind::Financial => "financial",
            FlowKind::Scam => "scam",
        }
    }

    /// Whether `text` should start this flow.
    pub fn matches(&self, text: &str) -> bool {
        let table: &[Regex] = match self {
            FlowKind::Remittance => REMITTANCE_PATTERNS.as_slice(),
            FlowKind::Financial => FINANCIAL_PATTERNS.as_slice(),
            FlowKind::Scam => SCAM_PATTERNS.as_slice(),
        };
        !text.trim().is_empty() && table.iter().any(|re| re.is_match(text))
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Pattern tables
// =============================================================================

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("Invalid intent regex"))
        .collect()
}

static REMITTANCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:remit|remittance|send money|transfer (?:money|funds)?)\b",
        r"(?i)\b(?:remesa|remitir)\b",
    ])
});

static FINANCIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:budget|budgeting|save|savings|financial plan|planning|invest|investment)\b",
    ])
});

static SCAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\b(?:scam|scammer|suspicious|fraud|cheat(?:ed)?|fake|impersonat(?:e|or)|phishing)\b",
        r"(?i)\b(?:loan shark|ah long|moneylender scam|job scam|love scam|investment scam)\b",
        r"(?i)\b(?:agent fee|upfront fee|processing fee|deposit|gift card|crypto|bitcoin)\b",
        r"(?i)\b(?:otp|one[- ]time password|password|bank account|transfer now)\b",
        r"(?i)\b(?:mom|ica|police|bank) (?:call(?:ed)?|message(?:d)?|email(?:ed)?) me\b",
        r"(?i)\b(?:suspect|not sure|too good to be true)\b",
    ])
});

/// First flow whose intent matches `text`, in priority order.
pub fn classify(text: &str) -> Option<FlowKind> {
    FlowKind::PRIORITY.into_iter().find(|kind| kind.matches(text))
}
