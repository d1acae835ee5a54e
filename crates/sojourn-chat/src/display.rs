//! Presentation helpers for source lists.

/// Most sources shown under one reply.
pub const MAX_DISPLAY_SOURCES: usize = 8;

/// Reduce sources to base file names, de-duplicated in order, at most
/// [`MAX_DISPLAY_SOURCES`].
pub fn display_sources(sources: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for source in sources {
        let base = source
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(source.as_str())
            .trim();
        if base.is_empty() || out.iter().any(|s| s == base) {
            continue;
        }
        out.push(base.to_string());
        if out.len() == MAX_DISPLAY_SOURCES {
            break;
        }
    }
    out
}
