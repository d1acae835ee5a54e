//! System instructions and grounding-miss detection.

use crate::lang::Language;

/// Exact reply the model must give when the context cannot answer.
pub const NOT_FOUND_SENTINEL: &str = "<<NOT_FOUND>>";

/// Phrasings that mean the grounded attempt declined to answer.
///
/// Matched as lowercase substrings. English only: a refusal written in the
/// answer language is not recognised and passes as a grounded answer.
pub const REFUSAL_PATTERNS: &[&str] = &[
    "does not contain",
    "not contain information",
    "outside the scope",
    "not present in the context",
    "context focuses on",
    "cannot find",
    "insufficient",
    "<<>>",
    "<>",
];

/// Prepended to a fallback answer when retrieved context was set aside.
pub const FALLBACK_NOTICE: &str = "\n⚠️ *Fallback Notice:*\n\
The uploaded context did not contain enough information to fully answer your question.\n\
Here’s a **general overview** based on public knowledge instead:\n\n";

/// Whether a grounded reply is a miss: empty, the sentinel, or a refusal.
pub fn is_insufficient(reply: &str) -> bool {
    let text = reply.trim();
    if text.is_empty() || text == NOT_FOUND_SENTINEL {
        return true;
    }
    let low = text.to_lowercase();
    REFUSAL_PATTERNS.iter().any(|pat| low.contains(pat))
}

/// Strict instruction for the grounded attempt.
pub fn strict_prompt(context: &str, lang: Language) -> String {
    format!(
        "You are helping immigrants in Singapore. Follow these STRICT rules:\n\
         1) Use ONLY the provided CONTEXT below for all facts. If a detail is not in CONTEXT, do not infer it.\n\
         2) If the user's request is outside the scope of the CONTEXT, or the CONTEXT is insufficient to answer exactly, \
         respond EXACTLY with: {sentinel} (no extra words).\n\
         3) For EP/S Pass topics, answer only what the document actually covers (e.g., supporting documents) unless steps are explicitly present.\n\
         4) If you do answer, include at least one short quote from CONTEXT in double quotes to show grounding.\n\
         5) Be concise and precise. Cite filenames inline like [filename]. No invented links, numbers, or dates.\n\n\
         Answer in {lang}.\n\n\
         CONTEXT:\n{context}\n",
        sentinel = NOT_FOUND_SENTINEL,
        lang = lang.prompt_name(),
        context = context,
    )
}

/// General-knowledge instruction for the fallback attempt.
pub fn general_prompt(lang: Language) -> String {
    format!(
        "You are a helpful, concise assistant. Answer in {}. \
         For Singapore immigration/work passes, you may give general guidance and suggest checking ICA/MOM. \
         Put safety first. Avoid hallucinating links or specific numbers if unsure.",
        lang.prompt_name()
    )
}

/// Instruction for translating a query before retrieval.
pub fn translation_prompt(target: Language) -> String {
    format!(
        "You are a precise translator into {}. Output ONLY the translation. No preface, no quotes, no notes.",
        target.prompt_name()
    )
}
