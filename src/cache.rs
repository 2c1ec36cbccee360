//! Cross-reference cache: which link tokens in which files resolve to no known note.
//!
//! [WorkspaceCache] is derived state. [compute_dangling_refs] rebuilds it from scratch; the
//! engine patches a single file's row after a write with [WorkspaceCache::set_file] and
//! [WorkspaceCache::remove_file], each of which re-derives the global list.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use crate::{
    error::ArborError,
    hierarchy::NoteTree,
    link::extract_refs,
    paths::{os_path_to_string, shallow_first, strip_extension},
    store::{LiveContent, VaultStore},
};

/// Case-insensitive lookup of reference text against the note set.
///
/// A reference resolves when it equals a note's full fname, or else a note's leaf segment. When
/// several notes share a leaf, the shallowest (then lexically first) fname wins. Stub notes count
/// as known.
#[derive(Debug, Clone, Default)]
pub struct KnownNotes {
    note_ext: String,
    by_fname: HashMap<String, String>,
    by_leaf: HashMap<String, String>,
}

impl KnownNotes {
    pub fn new(tree: &NoteTree, note_ext: &str) -> Self {
        let mut known = KnownNotes {
            note_ext: note_ext.to_string(),
            ..Default::default()
        };
        for note in tree.iter() {
            known
                .by_fname
                .insert(note.fname.to_lowercase(), note.fname.clone());
            known
                .by_leaf
                .entry(note.leaf().to_lowercase())
                .or_insert_with(|| note.fname.clone());
        }
        known
    }

    /// The fname a reference resolves to, if any.
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        let key = strip_extension(reference.trim(), &self.note_ext).to_lowercase();
        self.by_fname
            .get(&key)
            .or_else(|| self.by_leaf.get(&key))
            .map(String::as_str)
    }

    pub fn is_dangling(&self, reference: &str) -> bool {
        self.resolve(reference).is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceCache {
    /// Every note file in the vault, shallow-first.
    pub files: Vec<PathBuf>,
    /// Files holding at least one dangling reference, with the distinct references.
    pub dangling_by_file: BTreeMap<PathBuf, BTreeSet<String>>,
    /// Distinct dangling references vault-wide, ordered by the shallowest file holding them,
    /// then lexically.
    pub dangling: Vec<String>,
}

impl WorkspaceCache {
    pub fn dangling_in<P: AsRef<Path>>(&self, path: P) -> Option<&BTreeSet<String>> {
        self.dangling_by_file.get(path.as_ref())
    }

    /// Replace one file's row. An empty set clears the row but keeps the file listed.
    pub fn set_file(&mut self, path: PathBuf, dangling: BTreeSet<String>) {
        if !self.files.contains(&path) {
            self.files.push(path.clone());
            sort_paths(&mut self.files);
        }
        if dangling.is_empty() {
            self.dangling_by_file.remove(&path);
        } else {
            self.dangling_by_file.insert(path, dangling);
        }
        self.derive_global();
    }

    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) {
        self.files.retain(|f| f != path.as_ref());
        self.dangling_by_file.remove(path.as_ref());
        self.derive_global();
    }

    /// Drop references that now resolve. Adding notes can only shrink dangling sets, so this
    /// needs no rescan.
    pub fn prune_resolved(&mut self, known: &KnownNotes) {
        for refs in self.dangling_by_file.values_mut() {
            refs.retain(|r| known.is_dangling(r));
        }
        self.dangling_by_file.retain(|_, refs| !refs.is_empty());
        self.derive_global();
    }

    fn derive_global(&mut self) {
        let mut paths = self.dangling_by_file.keys().collect::<Vec<_>>();
        paths.sort_by(|a, b| shallow_first(&os_path_to_string(a), &os_path_to_string(b)));
        let mut seen = BTreeSet::new();
        self.dangling = paths
            .into_iter()
            .filter_map(|p| self.dangling_by_file.get(p))
            .flatten()
            .filter(|r| seen.insert(*r))
            .cloned()
            .collect();
    }
}

fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| shallow_first(&os_path_to_string(a), &os_path_to_string(b)));
}

/// Dangling references of one file, `None` when the file is skipped (missing, a directory, or not
/// a note file). A live editor buffer wins over the stored copy.
pub async fn scan_file(
    store: &dyn VaultStore,
    live: &dyn LiveContent,
    known: &KnownNotes,
    path: &Path,
) -> Result<Option<BTreeSet<String>>, ArborError> {
    if !store.is_note_path(path) {
        return Ok(None);
    }
    let content = match live.live_content(path).await {
        Some(buffer) => buffer,
        None => match store.read_text(path).await? {
            Some(text) => text,
            None => return Ok(None),
        },
    };
    Ok(Some(dangling_in_content(&content, known)))
}

pub fn dangling_in_content(content: &str, known: &KnownNotes) -> BTreeSet<String> {
    extract_refs(content)
        .into_iter()
        .map(|(_, note_ref)| note_ref.reference)
        .filter(|reference| known.is_dangling(reference))
        .collect()
}

/// Scan `files` concurrently and assemble a fresh cache.
///
/// Aggregation is keyed by path, so completion order does not affect the result. The global
/// list is derived once every scan has finished.
pub async fn compute_dangling_refs(
    store: &dyn VaultStore,
    live: &dyn LiveContent,
    known: &KnownNotes,
    files: Vec<PathBuf>,
) -> Result<WorkspaceCache, ArborError> {
    let scans = join_all(
        files
            .iter()
            .map(|path| async move { (path, scan_file(store, live, known, path).await) }),
    )
    .await;

    let mut cache = WorkspaceCache::default();
    for (path, scan) in scans {
        match scan? {
            Some(dangling) => {
                cache.files.push(path.clone());
                if !dangling.is_empty() {
                    cache.dangling_by_file.insert(path.clone(), dangling);
                }
            }
            None => tracing::debug!("[compute_dangling_refs] skipping {:?}", path),
        }
    }
    sort_paths(&mut cache.files);
    cache.derive_global();
    tracing::debug!(
        "[compute_dangling_refs] {} files scanned, {} dangling references",
        cache.files.len(),
        cache.dangling.len()
    );
    Ok(cache)
}
