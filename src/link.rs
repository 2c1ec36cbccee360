//! Wiki-link tokens (`[[label|ref]]`) and their parsed form.
//!
//! The same parser backs dangling-reference detection in [crate::cache] and link rewriting in
//! [crate::rewrite], so both agree on what a token's reference is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Divider between an explicit display label and the reference inside a link token.
pub const LABEL_DIVIDER: char = '|';

/// `[[ ... ]]` where the inner text holds no literal brackets.
pub static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("wikilink pattern is valid"));

/// A parsed link token.
///
/// `reference` is the lookup key used for resolution, `label` is the display text and equals the
/// reference when the token carries no explicit label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteRef {
    pub reference: String,
    pub label: String,
}

impl NoteRef {
    /// Split once on the first `|`. Both halves are trimmed.
    ///
    /// ```
    /// use arbor_core::link::NoteRef;
    ///
    /// let plain = NoteRef::parse(" foo.bar ");
    /// assert_eq!(plain.reference, "foo.bar");
    /// assert_eq!(plain.label, "foo.bar");
    ///
    /// let labeled = NoteRef::parse("Display | foo.bar");
    /// assert_eq!(labeled.label, "Display");
    /// assert_eq!(labeled.reference, "foo.bar");
    /// ```
    pub fn parse(raw: &str) -> NoteRef {
        match raw.split_once(LABEL_DIVIDER) {
            Some((label, reference)) => NoteRef {
                reference: reference.trim().to_string(),
                label: label.trim().to_string(),
            },
            None => {
                let trimmed = raw.trim().to_string();
                NoteRef {
                    reference: trimmed.clone(),
                    label: trimmed,
                }
            }
        }
    }

    pub fn has_custom_label(&self) -> bool {
        self.label != self.reference
    }
}

/// Every link token in `content`, in order of appearance, with its 0-based line number.
///
/// Tokens never span lines. Tokens with an empty reference are skipped.
pub fn extract_refs(content: &str) -> Vec<(usize, NoteRef)> {
    content
        .lines()
        .enumerate()
        .flat_map(|(line_no, line)| {
            WIKILINK_RE
                .captures_iter(line)
                .filter_map(|cap| cap.get(1))
                .map(|inner| NoteRef::parse(inner.as_str()))
                .filter(|note_ref| !note_ref.reference.is_empty())
                .map(move |note_ref| (line_no, note_ref))
                .collect::<Vec<_>>()
        })
        .collect()
}
