use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

use crate::paths::{leaf, parent_fname};

/// Hierarchical name of the vault's mandatory root note and root schema module.
pub const ROOT_FNAME: &str = "root";

/// Opaque frontmatter fields the engine carries but does not interpret.
pub type CustomProps = BTreeMap<String, serde_yaml::Value>;

/// Generate a fresh, stable note id.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Milliseconds since the unix epoch, 0 if the clock is before it.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A node of the note hierarchy.
///
/// Real notes are backed by a file in the vault. Stub notes (`stub == true`) are synthesized by
/// [crate::hierarchy::NoteTree] to fill a missing ancestor; they share the same identity and
/// child-list shape but carry no body and no custom metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub fname: String,
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub created: i64,
    pub updated: i64,
    /// Parent id, None only for the root note.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub stub: bool,
    #[serde(default)]
    pub custom: CustomProps,
    #[serde(default)]
    pub body: String,
}

impl Note {
    /// Create a new, file-backed note with a generated id.
    pub fn new<S: Into<String>>(fname: S) -> Note {
        let fname = fname.into();
        let now = now_millis();
        Note {
            id: generate_id(),
            title: default_title(&fname),
            fname,
            desc: String::new(),
            created: now,
            updated: now,
            parent: None,
            children: Vec::new(),
            stub: false,
            custom: CustomProps::new(),
            body: String::new(),
        }
    }

    /// Create a placeholder for a missing ancestor.
    pub fn stub<S: Into<String>>(fname: S) -> Note {
        Note {
            stub: true,
            ..Note::new(fname)
        }
    }

    pub fn with_body<S: Into<String>>(mut self, body: S) -> Note {
        self.body = body.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.fname == ROOT_FNAME
    }

    /// Last dot-delimited segment of the fname.
    pub fn leaf(&self) -> &str {
        leaf(&self.fname)
    }

    pub fn parent_fname(&self) -> Option<&str> {
        parent_fname(&self.fname)
    }

    /// Number of dot-delimited segments.
    pub fn depth(&self) -> usize {
        self.fname.split('.').count()
    }
}

/// Title derived from the leaf segment, `foo.bar-baz` -> `Bar-baz`.
pub fn default_title(fname: &str) -> String {
    let leaf = leaf(fname);
    let mut chars = leaf.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
