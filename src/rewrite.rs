//! Batch link rewriting for note renames.
//!
//! Every `[[old]]` / `[[label|old]]` token (case-insensitive, surrounding whitespace allowed
//! inside the brackets) becomes `[[new]]` / `[[label|new]]`. Renames apply in the order supplied,
//! each to the output of the previous one.

use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{error::ArborError, link::LABEL_DIVIDER};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefRename {
    pub old: String,
    pub new: String,
}

impl RefRename {
    pub fn new<O: Into<String>, N: Into<String>>(old: O, new: N) -> Self {
        RefRename {
            old: old.into(),
            new: new.into(),
        }
    }

    fn is_noop(&self) -> bool {
        self.old.trim() == self.new.trim()
    }

    fn pattern(&self) -> Result<Regex, ArborError> {
        let pattern = format!(
            r"\[\[\s*(?:([^\[\]{div}]+?)\s*\{div}\s*)?{old}\s*\]\]",
            div = LABEL_DIVIDER,
            old = regex::escape(self.old.trim())
        );
        Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
    }
}

/// Outcome of [rewrite]. `Unchanged` means no rename matched anything, which callers use to skip
/// the write entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Changed(String),
    Unchanged,
}

impl Rewrite {
    pub fn is_changed(&self) -> bool {
        matches!(self, Rewrite::Changed(_))
    }
}

/// Side-effect hooks fired while rewriting.
pub trait RewriteHooks {
    /// Once per rename that matched at least one token.
    fn on_first_match(&mut self, _rename: &RefRename) {}
    /// Once per replaced token.
    fn on_replace(&mut self, _rename: &RefRename) {}
}

impl RewriteHooks for () {}

/// Hooks that tally what a rewrite did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteTally {
    pub matched: Vec<RefRename>,
    pub replacements: usize,
}

impl RewriteHooks for RewriteTally {
    fn on_first_match(&mut self, rename: &RefRename) {
        self.matched.push(rename.clone());
    }

    fn on_replace(&mut self, _rename: &RefRename) {
        self.replacements += 1;
    }
}

pub fn rewrite(
    content: &str,
    renames: &[RefRename],
    hooks: &mut dyn RewriteHooks,
) -> Result<Rewrite, ArborError> {
    let mut current = content.to_string();
    let mut any_match = false;
    for rename in renames.iter().filter(|r| !r.is_noop()) {
        let re = rename.pattern()?;
        let mut matched = false;
        let replaced = re.replace_all(&current, |caps: &Captures<'_>| {
            if !matched {
                matched = true;
                hooks.on_first_match(rename);
            }
            hooks.on_replace(rename);
            match caps.get(1) {
                Some(label) => format!("[[{}{LABEL_DIVIDER}{}]]", label.as_str(), rename.new),
                None => format!("[[{}]]", rename.new),
            }
        });
        if matched {
            current = replaced.into_owned();
            any_match = true;
        }
    }
    if any_match {
        Ok(Rewrite::Changed(current))
    } else {
        Ok(Rewrite::Unchanged)
    }
}
