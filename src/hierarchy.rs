//! The note hierarchy.
//!
//! [NoteTree] is keyed by note id with a secondary fname index. It maintains the invariant that
//! every ancestor prefix of every note's fname exists as a node, synthesizing stub notes to fill
//! any gap, and that parent/children links agree with fnames.

use std::collections::BTreeMap;

use crate::{
    error::ArborError,
    note::{generate_id, Note, ROOT_FNAME},
    paths::{ancestors, parent_fname, shallow_first_fname},
};

/// What [NoteTree::upsert] did with the incoming note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    /// A stub at the same fname became file-backed.
    Promoted,
    Replaced,
}

/// What [NoteTree::remove] did with the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// Descendants still need the node, so it stays as a stub.
    Demoted,
}

#[derive(Debug, Clone, Default)]
pub struct NoteTree {
    notes: BTreeMap<String, Note>,
    by_fname: BTreeMap<String, String>,
}

impl NoteTree {
    /// Assemble the tree from loaded notes, synthesizing stubs for missing ancestors.
    ///
    /// Children are linked in the order their fnames are first encountered while walking the
    /// input. Fails with [ArborError::NoRootNoteFound] when no loaded note is named `root`, and
    /// with [ArborError::DuplicateNote] when two loaded notes share an fname.
    pub fn build(loaded: Vec<Note>) -> Result<NoteTree, ArborError> {
        let mut tree = NoteTree::default();
        let mut order = Vec::with_capacity(loaded.len());
        for mut note in loaded {
            if tree.by_fname.contains_key(&note.fname) {
                return Err(ArborError::DuplicateNote(note.fname));
            }
            if tree.notes.contains_key(&note.id) {
                tracing::warn!(
                    "Note {} reuses id {} already claimed by another file, assigning a new id",
                    note.fname,
                    note.id
                );
                note.id = generate_id();
            }
            note.parent = None;
            note.children.clear();
            note.stub = false;
            order.push(note.fname.clone());
            tree.insert_unlinked(note);
        }

        if !tree.by_fname.contains_key(ROOT_FNAME) {
            return Err(ArborError::NoRootNoteFound);
        }

        for fname in order.iter().filter(|f| f.as_str() != ROOT_FNAME) {
            tree.ensure_linked(fname);
        }
        tracing::debug!(
            "[NoteTree::build] {} loaded notes, {} stubs synthesized",
            order.len(),
            tree.stubs().count()
        );
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn get_by_fname(&self, fname: &str) -> Option<&Note> {
        self.by_fname.get(fname).and_then(|id| self.notes.get(id))
    }

    pub fn contains_fname(&self, fname: &str) -> bool {
        self.by_fname.contains_key(fname)
    }

    pub fn root(&self) -> Option<&Note> {
        self.get_by_fname(ROOT_FNAME)
    }

    /// All notes, shallow-first by fname.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        let mut fnames = self.by_fname.keys().collect::<Vec<_>>();
        fnames.sort_by(|a, b| shallow_first_fname(a, b));
        fnames.into_iter().filter_map(|f| self.get_by_fname(f))
    }

    pub fn stubs(&self) -> impl Iterator<Item = &Note> {
        self.notes.values().filter(|n| n.stub)
    }

    pub fn children_of(&self, id: &str) -> Vec<&Note> {
        self.notes
            .get(id)
            .map(|n| n.children.iter().filter_map(|c| self.notes.get(c)).collect())
            .unwrap_or_default()
    }

    /// Insert or replace a file-backed note, keeping the tree gap-free.
    ///
    /// An existing node at the same fname keeps its id, parent and children; only its content is
    /// replaced. Callers that persist the note should first align its id with
    /// [NoteTree::resolve_id] so the file and the tree agree.
    pub fn upsert(&mut self, mut note: Note) -> Upsert {
        note.stub = false;
        let existing = self
            .by_fname
            .get(&note.fname)
            .and_then(|id| self.notes.get_mut(id));
        if let Some(existing) = existing {
            let outcome = if existing.stub {
                Upsert::Promoted
            } else {
                Upsert::Replaced
            };
            note.id = existing.id.clone();
            note.parent = existing.parent.take();
            note.children = std::mem::take(&mut existing.children);
            *existing = note;
            return outcome;
        }

        if self.notes.contains_key(&note.id) {
            note.id = generate_id();
        }
        note.parent = None;
        note.children.clear();
        let fname = note.fname.clone();
        self.insert_unlinked(note);
        if fname != ROOT_FNAME {
            self.ensure_linked(&fname);
        }
        Upsert::Created
    }

    /// The id a note written at `fname` ends up with: the existing node's id when one is present
    /// (real or stub), otherwise `proposed` unless another note already uses it.
    pub fn resolve_id(&self, fname: &str, proposed: &str) -> String {
        match self.get_by_fname(fname) {
            Some(existing) => existing.id.clone(),
            None if self.notes.contains_key(proposed) => generate_id(),
            None => proposed.to_string(),
        }
    }

    /// Remove the note at `fname`. The root note cannot be removed.
    pub fn remove(&mut self, fname: &str) -> Result<(Note, Removal), ArborError> {
        if fname == ROOT_FNAME {
            return Err(ArborError::Command(
                "the root note cannot be removed".to_string(),
            ));
        }
        let id = self
            .by_fname
            .get(fname)
            .cloned()
            .ok_or_else(|| ArborError::NotFound(format!("note '{fname}'")))?;
        let note = self.notes.get(&id).cloned().ok_or_else(|| {
            ArborError::NotFound(format!("note '{fname}' is indexed but missing"))
        })?;

        if !note.children.is_empty() {
            if let Some(node) = self.notes.get_mut(&id) {
                let mut stub = Note::stub(fname);
                stub.id = node.id.clone();
                stub.parent = node.parent.take();
                stub.children = std::mem::take(&mut node.children);
                *node = stub;
            }
            return Ok((note, Removal::Demoted));
        }

        self.detach(&id);
        Ok((note, Removal::Deleted))
    }

    /// Move a note to a new fname, keeping its id and content.
    ///
    /// Descendants keep their own fnames; if any exist the old position is refilled with a stub.
    /// A stub already sitting at the new fname is replaced, its children adopted.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<Note, ArborError> {
        if old == ROOT_FNAME || new == ROOT_FNAME {
            return Err(ArborError::Command(
                "the root note cannot be renamed".to_string(),
            ));
        }
        if let Some(target) = self.get_by_fname(new) {
            if !target.stub {
                return Err(ArborError::DuplicateNote(new.to_string()));
            }
        }
        let id = self
            .by_fname
            .get(old)
            .cloned()
            .ok_or_else(|| ArborError::NotFound(format!("note '{old}'")))?;
        let Some(mut moved) = self.notes.get(&id).cloned() else {
            return Err(ArborError::NotFound(format!("note '{old}'")));
        };

        if moved.children.is_empty() {
            self.detach(&id);
        } else {
            self.swap_node(&id, Note::stub(old));
        }

        moved.fname = new.to_string();
        moved.parent = None;
        moved.children.clear();
        match self.by_fname.get(new).cloned() {
            Some(stub_id) => self.swap_node(&stub_id, moved.clone()),
            None => {
                self.insert_unlinked(moved.clone());
                self.ensure_linked(new);
            }
        }
        self.notes
            .get(&id)
            .cloned()
            .ok_or_else(|| ArborError::NotFound(format!("note '{new}'")))
    }

    /// Structural self-check, returns a description of every broken invariant.
    pub fn built_in_test(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.root().is_none() {
            errors.push("no root note".to_string());
        }
        for (fname, id) in self.by_fname.iter() {
            let Some(note) = self.notes.get(id) else {
                errors.push(format!("fname {fname} indexes missing id {id}"));
                continue;
            };
            if &note.fname != fname {
                errors.push(format!("fname {fname} indexes note named {}", note.fname));
            }
            for ancestor in ancestors(fname) {
                if !self.by_fname.contains_key(ancestor) {
                    errors.push(format!("{fname} is missing ancestor {ancestor}"));
                }
            }
            if fname != ROOT_FNAME {
                let expected_parent = parent_fname(fname).unwrap_or(ROOT_FNAME);
                match note.parent.as_ref().and_then(|p| self.notes.get(p)) {
                    Some(parent) if parent.fname == expected_parent => {
                        if !parent.children.contains(id) {
                            errors.push(format!("{} does not list child {fname}", parent.fname));
                        }
                    }
                    Some(parent) => errors.push(format!(
                        "{fname} has parent {} instead of {expected_parent}",
                        parent.fname
                    )),
                    None => errors.push(format!("{fname} has no parent")),
                }
            }
            if note.stub && note.children.is_empty() {
                errors.push(format!("stub {fname} has no children"));
            }
        }
        if self.by_fname.len() != self.notes.len() {
            errors.push(format!(
                "{} fnames indexed for {} notes",
                self.by_fname.len(),
                self.notes.len()
            ));
        }
        errors
    }

    fn insert_unlinked(&mut self, note: Note) {
        self.by_fname.insert(note.fname.clone(), note.id.clone());
        self.notes.insert(note.id.clone(), note);
    }

    /// Walk from the shortest prefix down to `fname`, creating stubs where nothing exists and
    /// linking each level to the next. Returns the id at `fname`.
    fn ensure_linked(&mut self, fname: &str) -> Option<String> {
        let mut parent_id = self.by_fname.get(ROOT_FNAME)?.clone();
        let mut prefixes = ancestors(fname);
        prefixes.push(fname);
        for prefix in prefixes {
            let id = match self.by_fname.get(prefix) {
                Some(id) => id.clone(),
                None => {
                    let stub = Note::stub(prefix);
                    tracing::debug!("[NoteTree] synthesizing stub for {prefix}");
                    let id = stub.id.clone();
                    self.insert_unlinked(stub);
                    id
                }
            };
            if id != parent_id {
                self.link_child(&parent_id, &id);
            }
            parent_id = id;
        }
        Some(parent_id)
    }

    fn link_child(&mut self, parent_id: &str, child_id: &str) {
        if let Some(child) = self.notes.get_mut(child_id) {
            child.parent = Some(parent_id.to_string());
        }
        if let Some(parent) = self.notes.get_mut(parent_id) {
            if !parent.children.iter().any(|c| c == child_id) {
                parent.children.push(child_id.to_string());
            }
        }
    }

    /// Remove a childless node and prune stub ancestors left without children.
    fn detach(&mut self, id: &str) {
        let mut current = id.to_string();
        loop {
            let Some(note) = self.notes.remove(&current) else {
                return;
            };
            self.by_fname.remove(&note.fname);
            let Some(parent_id) = note.parent else {
                return;
            };
            let Some(parent) = self.notes.get_mut(&parent_id) else {
                return;
            };
            parent.children.retain(|c| c != &current);
            if parent.stub && parent.children.is_empty() {
                current = parent_id;
            } else {
                return;
            }
        }
    }

    /// Put `replacement` where `old_id` sits: same parent slot, same children.
    fn swap_node(&mut self, old_id: &str, mut replacement: Note) {
        let Some(old) = self.notes.remove(old_id) else {
            return;
        };
        self.by_fname.remove(&old.fname);
        let new_id = replacement.id.clone();
        replacement.parent = old.parent.clone();
        replacement.children = old.children.clone();
        for child in old.children.iter() {
            if let Some(child) = self.notes.get_mut(child) {
                child.parent = Some(new_id.clone());
            }
        }
        if let Some(parent) = old.parent.as_ref().and_then(|p| self.notes.get_mut(p)) {
            for slot in parent.children.iter_mut().filter(|c| c.as_str() == old_id) {
                *slot = new_id.clone();
            }
        }
        self.insert_unlinked(replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(fnames: &[&str]) -> NoteTree {
        NoteTree::build(fnames.iter().map(|f| Note::new(*f)).collect()).unwrap()
    }

    fn fnames(tree: &NoteTree) -> Vec<String> {
        tree.iter().map(|n| n.fname.clone()).collect()
    }

    #[test]
    fn missing_root_is_fatal() {
        let res = NoteTree::build(vec![Note::new("foo"), Note::new("foo.bar")]);
        assert_eq!(res.unwrap_err(), ArborError::NoRootNoteFound);
    }

    #[test]
    fn duplicate_fname_is_rejected() {
        let res = NoteTree::build(vec![Note::new("root"), Note::new("a"), Note::new("a")]);
        assert_eq!(res.unwrap_err(), ArborError::DuplicateNote("a".to_string()));
    }

    #[test]
    fn stubs_fill_exactly_the_gaps() {
        let t = tree(&["root", "a.b.c.d", "a.b"]);
        let mut stubs = t.stubs().map(|n| n.fname.clone()).collect::<Vec<_>>();
        stubs.sort();
        assert_eq!(stubs, vec!["a", "a.b.c"]);
        assert_eq!(t.len(), 5);
        assert!(!t.get_by_fname("a.b").unwrap().stub);
        assert!(t.built_in_test().is_empty(), "{:?}", t.built_in_test());
    }

    #[test]
    fn children_follow_first_appearance() {
        let t = tree(&["root", "b.x", "a", "b.w", "b"]);
        let root = t.root().unwrap();
        let top = t
            .children_of(&root.id)
            .iter()
            .map(|n| n.fname.clone())
            .collect::<Vec<_>>();
        assert_eq!(top, vec!["b", "a"]);
        let b = t.get_by_fname("b").unwrap();
        assert!(!b.stub);
        let under_b = t
            .children_of(&b.id)
            .iter()
            .map(|n| n.fname.clone())
            .collect::<Vec<_>>();
        assert_eq!(under_b, vec!["b.x", "b.w"]);
    }

    #[test]
    fn upsert_promotes_stub_in_place() {
        let mut t = tree(&["root", "foo.ch1"]);
        let stub = t.get_by_fname("foo").unwrap().clone();
        assert!(stub.stub);

        let outcome = t.upsert(Note::new("foo").with_body("now real"));
        assert_eq!(outcome, Upsert::Promoted);
        let promoted = t.get_by_fname("foo").unwrap();
        assert!(!promoted.stub);
        assert_eq!(promoted.id, stub.id);
        assert_eq!(promoted.children, stub.children);
        assert_eq!(promoted.body, "now real");
        assert!(t.built_in_test().is_empty());
    }

    #[test]
    fn upsert_new_deep_note_creates_stubs() {
        let mut t = tree(&["root"]);
        assert_eq!(t.upsert(Note::new("x.y.z")), Upsert::Created);
        assert_eq!(fnames(&t), vec!["root", "x", "x.y", "x.y.z"]);
        assert_eq!(t.stubs().count(), 2);
        assert_eq!(t.upsert(Note::new("x.y.z")), Upsert::Replaced);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn remove_prunes_or_demotes() {
        let mut t = tree(&["root", "a.b.c", "a.b"]);
        let (_, removal) = t.remove("a.b").unwrap();
        assert_eq!(removal, Removal::Demoted);
        assert!(t.get_by_fname("a.b").unwrap().stub);

        let (_, removal) = t.remove("a.b.c").unwrap();
        assert_eq!(removal, Removal::Deleted);
        assert_eq!(fnames(&t), vec!["root"]);
        assert!(t.built_in_test().is_empty(), "{:?}", t.built_in_test());

        assert!(matches!(t.remove("root"), Err(ArborError::Command(_))));
        assert!(matches!(t.remove("nope"), Err(ArborError::NotFound(_))));
    }

    #[test]
    fn rename_keeps_id_and_leaves_stub_for_children() {
        let mut t = tree(&["root", "foo", "foo.ch1", "bar.baz"]);
        let foo_id = t.get_by_fname("foo").unwrap().id.clone();
        let moved = t.rename("foo", "bar").unwrap();
        assert_eq!(moved.id, foo_id);
        assert_eq!(moved.fname, "bar");
        assert!(!moved.stub);

        let bar = t.get_by_fname("bar").unwrap();
        assert_eq!(bar.id, foo_id);
        assert_eq!(t.children_of(&bar.id)[0].fname, "bar.baz");

        let old = t.get_by_fname("foo").unwrap();
        assert!(old.stub);
        assert_eq!(t.children_of(&old.id)[0].fname, "foo.ch1");
        assert!(t.built_in_test().is_empty(), "{:?}", t.built_in_test());

        assert!(matches!(
            t.rename("foo.ch1", "bar"),
            Err(ArborError::DuplicateNote(_))
        ));
    }
}
