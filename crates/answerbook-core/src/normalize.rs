//! Utterance normalisation applied before any scoring.
//!
//! Both the classifier and the semantic index see the output of
//! [`normalize_utterance`], never the raw request text.
//!
//! # Rules
//!
//! - Lower-case first: `"HELLO"` → `"hello"`
//! - Keep only `a`-`z` and whitespace: digits, punctuation and accented
//!   letters are dropped, not transliterated (`"café"` → `"caf"`)
//! - Collapse whitespace runs to one space and trim both ends

/// Normalise a raw utterance.
///
/// Input: `"  HELLO there!! 123  "`
/// Output: `"hello there"`
///
/// Never fails; the result may be empty.
pub fn normalize_utterance(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // A separator is owed once a word has been emitted and whitespace follows.
    let mut pending_space = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if is_separator(c) {
            pending_space = !out.is_empty();
        } else if c.is_ascii_lowercase() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }

    out
}

/// Unicode whitespace plus the ASCII information separators (U+001C..U+001F),
/// which many regex engines also treat as `\s`.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}
