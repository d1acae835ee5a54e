//! Passage gating, keyword filtering, and context clamping.
//!
//! Everything here is pure: the answer engine decides which retrieved
//! passages are admissible and how much of them fit into one prompt.

use sojourn_core::types::Passage;

/// Appended to the last passage when it had to be cut to fit the budget.
pub const TRUNCATION_MARKER: &str = " ...[truncated]...";

/// Visible separator between passages in the context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

// =============================================================================
// Keyword filter
// =============================================================================

/// Whether any keyword occurs (case-insensitively) in any passage.
pub fn any_keyword_present(passages: &[Passage], keywords: &[&str]) -> bool {
    let keys = lowered(keywords);
    passages.iter().any(|p| mentions_any(&p.text, &keys))
}

/// Keep passages that mention at least one keyword.
///
/// Returns the original set when no keyword is given or nothing matches;
/// callers that need "no match means drop everything" check
/// [`any_keyword_present`] first.
pub fn filter_by_keywords(passages: &[Passage], keywords: &[&str]) -> Vec<Passage> {
    if keywords.is_empty() {
        return passages.to_vec();
    }
    let keys = lowered(keywords);
    let selected: Vec<Passage> = passages
        .iter()
        .filter(|p| mentions_any(&p.text, &keys))
        .cloned()
        .collect();

    if selected.is_empty() {
        passages.to_vec()
    } else {
        selected
    }
}

fn lowered(keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn mentions_any(text: &str, keys: &[String]) -> bool {
    let low = text.to_lowercase();
    keys.iter().any(|k| low.contains(k.as_str()))
}

// =============================================================================
// Gating
// =============================================================================

/// Work-pass terms to focus on when the raw query names a pass type.
///
/// Empty when the query is about anything else.
pub fn focus_terms(query: &str) -> Vec<&'static str> {
    let low = query.to_lowercase();
    let padded = format!(" {} ", low);
    let mut terms: Vec<&'static str> = Vec::new();

    if low.contains("s pass") || low.contains("spass") || padded.contains(" s-pass") {
        terms.extend(["s pass", "employment pass", "ep"]);
    }
    if low.contains("employment pass") || padded.contains(" ep ") {
        terms.extend(["employment pass", "ep", "s pass"]);
    }

    let mut seen = Vec::with_capacity(terms.len());
    for t in terms {
        if !seen.contains(&t) {
            seen.push(t);
        }
    }
    seen
}

/// Decide which retrieved passages are admissible for a query.
///
/// - `force_general` discards everything.
/// - Non-empty `required` keywords keep only matching passages, and discard
///   everything when no passage mentions any of them.
/// - Otherwise, queries about a specific work pass keep only passages that
///   mention pass terms (or all passages if none do).
pub fn gate_passages(
    passages: &[Passage],
    query: &str,
    required: &[&str],
    force_general: bool,
) -> Vec<Passage> {
    if force_general {
        return Vec::new();
    }

    if !required.is_empty() {
        if !any_keyword_present(passages, required) {
            tracing::debug!(
                passages = passages.len(),
                "No passage mentions a required keyword, dropping context"
            );
            return Vec::new();
        }
        return filter_by_keywords(passages, required);
    }

    let terms = focus_terms(query);
    if terms.is_empty() {
        passages.to_vec()
    } else {
        filter_by_keywords(passages, &terms)
    }
}

// =============================================================================
// Clamp
// =============================================================================

/// Join passage texts in ranked order within `max_chars` characters.
///
/// Blank passages are skipped. The passage that would overflow is cut to the
/// remaining budget and marked; nothing after it is included. The budget
/// counts passage characters only, not separators.
pub fn clamp(passages: &[Passage], max_chars: usize) -> String {
    let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
    clamp_texts(&texts, max_chars)
}

/// [`clamp`] over plain strings.
pub fn clamp_texts(texts: &[&str], max_chars: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut total = 0usize;

    for raw in texts {
        let chunk = raw.trim();
        if chunk.is_empty() {
            continue;
        }
        let len = chunk.chars().count();
        if total + len > max_chars {
            let rest = max_chars - total;
            if rest > 0 {
                let cut: String = chunk.chars().take(rest).collect();
                out.push(format!("{}{}", cut, TRUNCATION_MARKER));
            }
            break;
        }
        out.push(chunk.to_string());
        total += len;
    }

    out.join(PASSAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sojourn_core::types::SourceId;

    fn p(text: &str) -> Passage {
        Passage::new(text, SourceId::FileName(format!("{}.pdf", text.len())))
    }

    fn texts(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.text.as_str()).collect()
    }

    // ---- filter_by_keywords ----

    #[test]
    fn test_filter_keeps_matching_subset() {
        let ps = vec![p("Remittance fees vary"), p("Weather today"), p("Exchange RATE info")];
        let out = filter_by_keywords(&ps, &["fees", "exchange rate"]);
        assert_eq!(texts(&out), vec!["Remittance fees vary", "Exchange RATE info"]);
    }

    #[test]
    fn test_filter_returns_original_when_nothing_matches() {
        let ps = vec![p("alpha"), p("beta")];
        let out = filter_by_keywords(&ps, &["gamma"]);
        assert_eq!(out, ps);
    }

    #[test]
    fn test_filter_no_keywords_is_identity() {
        let ps = vec![p("alpha")];
        assert_eq!(filter_by_keywords(&ps, &[]), ps);
    }

    #[test]
    fn test_any_keyword_present_case_insensitive() {
        let ps = vec![p("Never share your OTP")];
        assert!(any_keyword_present(&ps, &["otp"]));
        assert!(!any_keyword_present(&ps, &["scam"]));
    }

    // ---- gate_passages ----

    #[test]
    fn test_gate_force_general_discards_all() {
        let ps = vec![p("s pass documents")];
        assert!(gate_passages(&ps, "s pass", &[], true).is_empty());
    }

    #[test]
    fn test_gate_required_keywords_absent_discards_all() {
        let ps = vec![p("Housing rules"), p("Public holidays")];
        assert!(gate_passages(&ps, "random question", &["scam", "otp"], false).is_empty());
    }

    #[test]
    fn test_gate_required_keywords_keeps_subset() {
        let ps = vec![p("Scam alert"), p("Housing rules"), p("OTP safety")];
        let out = gate_passages(&ps, "anything", &["scam", "otp"], false);
        assert_eq!(texts(&out), vec!["Scam alert", "OTP safety"]);
    }

    #[test]
    fn test_gate_s_pass_focus() {
        let ps = vec![p("Dormitory rules"), p("S Pass supporting documents")];
        let out = gate_passages(&ps, "What do I need for S Pass?", &[], false);
        assert_eq!(texts(&out), vec!["S Pass supporting documents"]);
    }

    #[test]
    fn test_gate_unrelated_query_keeps_all() {
        let ps = vec![p("Dormitory rules"), p("Public holidays")];
        let out = gate_passages(&ps, "when is the next holiday", &[], false);
        assert_eq!(out, ps);
    }

    // ---- focus_terms ----

    #[test]
    fn test_focus_terms_variants() {
        assert_eq!(focus_terms("spass renewal"), vec!["s pass", "employment pass", "ep"]);
        assert_eq!(focus_terms("my EP application"), vec!["employment pass", "ep", "s pass"]);
        assert!(focus_terms("deep cleaning").is_empty());
        assert!(focus_terms("hello").is_empty());
    }

    // ---- clamp ----

    #[test]
    fn test_clamp_under_budget_is_unchanged() {
        let ps = vec![p("first"), p("second")];
        let out = clamp(&ps, 100);
        assert_eq!(out, "first\n\n---\n\nsecond");
        assert!(!out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_clamp_is_idempotent_under_budget() {
        let once = clamp_texts(&["alpha", "beta"], 100);
        let twice = clamp_texts(&[once.as_str()], 100);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clamp_truncates_overflowing_passage() {
        let out = clamp_texts(&["abcde", "fghij", "klmno"], 8);
        assert_eq!(out, format!("abcde{}fgh{}", PASSAGE_SEPARATOR, TRUNCATION_MARKER));
    }

    #[test]
    fn test_clamp_exact_budget_drops_rest_without_marker() {
        let out = clamp_texts(&["abcde", "fghij"], 5);
        assert_eq!(out, "abcde");
    }

    #[test]
    fn test_clamp_skips_blank_and_trims() {
        let out = clamp_texts(&["  one  ", "   ", "two"], 100);
        assert_eq!(out, "one\n\n---\n\ntwo");
    }

    #[test]
    fn test_clamp_counts_characters_not_bytes() {
        let out = clamp_texts(&["签证文件", "工作准证"], 6);
        assert_eq!(out, format!("签证文件{}工作{}", PASSAGE_SEPARATOR, TRUNCATION_MARKER));
    }

    #[test]
    fn test_clamp_empty() {
        assert_eq!(clamp(&[], 100), "");
    }
}
