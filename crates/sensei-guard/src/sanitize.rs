//! Input sanitization for user-supplied text.

use sensei_types::util::truncate_chars;

/// Character cap for AI-bound message content.
pub const AI_MESSAGE_MAX_CHARS: usize = 5000;

/// Replacement token for scrubbed phrases.
const FILTERED: &str = "[filtered]";

/// Lowercase phrases scrubbed from AI-bound text.
///
/// A denylist is best-effort by nature: rephrased attacks get through, and
/// legitimate text can be caught. This is a client-side UX measure, not a
/// security control — the authoritative filtering is server-side. Keep the
/// list small; do not grow it into a policy engine.
const INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore prior instructions",
    "ignore all previous instructions",
    "ignore all prior instructions",
    "disregard your training",
    "disregard your guidelines",
    "you are now",
    "pretend to be",
    "pretend you are",
    "act as",
    "roleplay as",
    "jailbreak",
    "bypass",
    "override",
];

/// Clean a raw string: strip NUL and control characters (keeping newline
/// and tab), trim surrounding whitespace, cap at `max_chars`.
///
/// Pure and total, and idempotent: applying it twice equals applying it
/// once.
pub fn sanitize_input(raw: &str, max_chars: usize) -> String {
    let stripped: String = raw.chars().filter(|c| !is_stripped_control(*c)).collect();
    // Truncation can expose trailing whitespace, so trim again after it.
    truncate_chars(stripped.trim(), max_chars).trim().to_string()
}

fn is_stripped_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

/// Sanitize a message bound for the AI endpoint: general cleaning at the
/// AI cap, then the injection-phrase scrub.
pub fn sanitize_ai_message(message: &str) -> String {
    scrub_injection_phrases(&sanitize_input(message, AI_MESSAGE_MAX_CHARS))
}

/// Replace denylisted phrases, case-insensitively and at word boundaries.
///
/// Phrases are ASCII, so `to_ascii_lowercase` keeps byte offsets aligned
/// with the original string.
fn scrub_injection_phrases(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < text.len() {
        let matched = boundary_before(&lower, pos)
            .then(|| {
                INJECTION_PHRASES.iter().find_map(|phrase| {
                    (lower[pos..].starts_with(phrase)
                        && boundary_after(&lower, pos + phrase.len()))
                    .then_some(phrase.len())
                })
            })
            .flatten();

        match matched {
            Some(len) => {
                out.push_str(FILTERED);
                pos += len;
            }
            None => match text[pos..].chars().next() {
                Some(ch) => {
                    out.push(ch);
                    pos += ch.len_utf8();
                }
                None => break,
            },
        }
    }

    out
}

fn boundary_before(s: &str, pos: usize) -> bool {
    pos == 0
        || s[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
}

fn boundary_after(s: &str, pos: usize) -> bool {
    pos >= s.len()
        || s[pos..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric())
}
