//! Rule-based language detection.
//!
//! Classifies text by dominant Unicode script, then separates Latin-script
//! languages with diacritic and stop-word evidence. Pure and deterministic:
//! identical input always yields the same language. Anything ambiguous or
//! empty is English.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Languages the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Chinese,
    Hindi,
    Tamil,
    Malay,
    Vietnamese,
    Thai,
    Japanese,
    Korean,
}

impl Language {
    /// Short language code (`en`, `zh`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Malay => "ms",
            Language::Vietnamese => "vi",
            Language::Thai => "th",
            Language::Japanese => "ja",
            Language::Korean => "ko",
        }
    }

    /// Parse a language code. Chinese locale variants collapse to `zh`.
    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or("");
        match primary {
            "en" => Some(Language::English),
            "zh" => Some(Language::Chinese),
            "hi" => Some(Language::Hindi),
            "ta" => Some(Language::Tamil),
            "ms" => Some(Language::Malay),
            "vi" => Some(Language::Vietnamese),
            "th" => Some(Language::Thai),
            "ja" => Some(Language::Japanese),
            "ko" => Some(Language::Korean),
            _ => None,
        }
    }

    /// Name used in answer-language instructions.
    ///
    /// Only the languages the assistant is tuned for are named explicitly.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Chinese => "Chinese",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Malay => "Malay",
            _ => "the user's language",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Latin-script evidence
// =============================================================================

static LATIN_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Latin}+").expect("Invalid latin word regex"));

// Letters that only occur in Vietnamese among the Latin-script languages we see.
static VIETNAMESE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ơưđăạảấầẩẫậắằẳẵặẹẻẽếềểễệỉịọỏốồổỗộớờởỡợụủứừửữựỳỵỷỹ]")
        .expect("Invalid vietnamese regex")
});

static MALAY_WORDS: &[&str] = &[
    "saya", "anda", "awak", "yang", "dan", "untuk", "tidak", "ini", "itu", "dengan",
    "boleh", "bagaimana", "apa", "adalah", "kerja", "wang", "hantar", "berapa", "mahu",
    "perlu", "sudah", "belum", "kami", "mereka", "dia", "ke", "dari", "pada", "akan",
    "cara", "tolong", "terima", "kasih",
];

static ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "i", "you", "to", "of", "and", "in", "for",
    "on", "with", "what", "how", "can", "do", "does", "my", "me", "it", "this", "that",
    "send", "money", "work", "pass", "need", "want", "please", "where", "when", "much",
];

// =============================================================================
// LanguageDetector
// =============================================================================

#[derive(Default)]
struct ScriptCounts {
    latin: usize,
    han: usize,
    kana: usize,
    hangul: usize,
    devanagari: usize,
    tamil: usize,
    thai: usize,
}

/// Deterministic best-effort language classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text`. Never fails; falls back to English.
    pub fn detect(&self, text: &str) -> Language {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::debug!("Empty text for language detection, defaulting to en");
            return Language::English;
        }

        let counts = count_scripts(trimmed);

        // Kana marks Japanese even when most characters are kanji.
        let cjk = if counts.kana > 0 {
            (counts.han + counts.kana, Language::Japanese)
        } else {
            (counts.han, Language::Chinese)
        };

        // Ties resolve to the earlier candidate.
        let candidates = [
            (counts.latin, Language::English),
            cjk,
            (counts.hangul, Language::Korean),
            (counts.devanagari, Language::Hindi),
            (counts.tamil, Language::Tamil),
            (counts.thai, Language::Thai),
        ];

        let mut best = (0usize, Language::English);
        for (count, lang) in candidates {
            if count > best.0 {
                best = (count, lang);
            }
        }

        match best {
            (0, _) => Language::English,
            (_, Language::English) => classify_latin(trimmed),
            (_, lang) => lang,
        }
    }
}

fn count_scripts(text: &str) -> ScriptCounts {
    let mut counts = ScriptCounts::default();
    for c in text.chars() {
        match c {
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' => {
                counts.han += 1
            }
            '\u{3040}'..='\u{30FF}' => counts.kana += 1,
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => counts.hangul += 1,
            '\u{0900}'..='\u{097F}' => counts.devanagari += 1,
            '\u{0B80}'..='\u{0BFF}' => counts.tamil += 1,
            '\u{0E00}'..='\u{0E7F}' => counts.thai += 1,
            c if is_latin_letter(c) => counts.latin += 1,
            _ => {}
        }
    }
    counts
}

fn is_latin_letter(c: char) -> bool {
    c.is_alphabetic()
        && (c.is_ascii()
            || ('\u{00C0}'..='\u{024F}').contains(&c)
            || ('\u{1E00}'..='\u{1EFF}').contains(&c))
}

// Words spelled the same in English and Malay ("bank", "permit") stay out of
// MALAY_WORDS so short English queries are not read as Malay.
fn classify_latin(text: &str) -> Language {
    let lower = text.to_lowercase();
    if VIETNAMESE_RE.is_match(&lower) {
        return Language::Vietnamese;
    }

    let mut malay = 0usize;
    let mut english = 0usize;
    for word in LATIN_WORD_RE.find_iter(&lower).map(|m| m.as_str()) {
        if MALAY_WORDS.contains(&word) {
            malay += 1;
        }
        if ENGLISH_WORDS.contains(&word) {
            english += 1;
        }
    }

    if malay > english {
        Language::Malay
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Language {
        LanguageDetector::new().detect(text)
    }

    // ---- Defaults ----

    #[test]
    fn test_empty_defaults_to_english() {
        assert_eq!(detect(""), Language::English);
        assert_eq!(detect("   \n"), Language::English);
    }

    #[test]
    fn test_digits_and_punctuation_default_to_english() {
        assert_eq!(detect("12345 ?!"), Language::English);
    }

    // ---- Scripts ----

    #[test]
    fn test_english_sentence() {
        assert_eq!(detect("What documents do I need for an S Pass?"), Language::English);
    }

    #[test]
    fn test_chinese_sentence() {
        assert_eq!(detect("我想寄钱回家"), Language::Chinese);
    }

    #[test]
    fn test_chinese_with_latin_acronym() {
        assert_eq!(detect("S Pass 需要什么文件？"), Language::Chinese);
    }

    #[test]
    fn test_japanese_uses_kana() {
        assert_eq!(detect("日本に送金したいです"), Language::Japanese);
    }

    #[test]
    fn test_hindi_sentence() {
        assert_eq!(detect("मुझे पैसे भेजने हैं"), Language::Hindi);
    }

    #[test]
    fn test_tamil_sentence() {
        assert_eq!(detect("நான் பணம் அனுப்ப வேண்டும்"), Language::Tamil);
    }

    #[test]
    fn test_korean_and_thai() {
        assert_eq!(detect("송금하고 싶어요"), Language::Korean);
        assert_eq!(detect("ฉันต้องการส่งเงิน"), Language::Thai);
    }

    // ---- Latin-script languages ----

    #[test]
    fn test_malay_sentence() {
        assert_eq!(
            detect("Bagaimana saya boleh hantar wang ke Indonesia?"),
            Language::Malay
        );
    }

    #[test]
    fn test_vietnamese_diacritics() {
        assert_eq!(detect("Tôi muốn gửi tiền về nhà"), Language::Vietnamese);
    }

    #[test]
    fn test_shared_loanwords_are_english() {
        assert_eq!(detect("bank transfer fees"), Language::English);
        assert_eq!(detect("Permit renewal"), Language::English);
        assert_eq!(detect("Bank account opening hours?"), Language::English);
    }

    #[test]
    fn test_latin_letter_ranges() {
        assert!(is_latin_letter('a'));
        assert!(is_latin_letter('é'));
        assert!(is_latin_letter('ệ'));
        assert!(!is_latin_letter('7'));
        assert!(!is_latin_letter('中'));
    }

    #[test]
    fn test_ambiguous_latin_is_english() {
        assert_eq!(detect("Jakarta Manila"), Language::English);
    }

    // ---- Determinism ----

    #[test]
    fn test_detection_is_deterministic() {
        let samples = [
            "I want to send money overseas",
            "我想寄钱",
            "Saya mahu hantar wang",
            "S Pass",
        ];
        for s in samples {
            let first = detect(s);
            for _ in 0..50 {
                assert_eq!(detect(s), first, "detection changed for {:?}", s);
            }
        }
    }

    // ---- Codes ----

    #[test]
    fn test_chinese_variants_normalize() {
        assert_eq!(Language::from_code("zh-cn"), Some(Language::Chinese));
        assert_eq!(Language::from_code("zh-TW"), Some(Language::Chinese));
        assert_eq!(Language::from_code("zh_Hant"), Some(Language::Chinese));
        assert_eq!(Language::from_code("zh"), Some(Language::Chinese));
        assert_eq!(Language::Chinese.code(), "zh");
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn test_prompt_names() {
        assert_eq!(Language::English.prompt_name(), "English");
        assert_eq!(Language::Malay.prompt_name(), "Malay");
        assert_eq!(Language::Korean.prompt_name(), "the user's language");
    }
}
