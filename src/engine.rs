//! # Engine - the vault facade
//!
//! [`Engine`] owns the in-memory state of one vault (the [`NoteTree`], the [`SchemaStore`] and
//! the [`WorkspaceCache`]) and is the only thing that mutates it. Every operation persists through
//! a [`VaultStore`] first and patches the in-memory state second, so a failed write never leaves
//! the tree ahead of the disk.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --init--> Loading --ok--> Ready
//!                            |
//!                            +--err--> Failed --init--> Loading ...
//! ```
//!
//! A second `init` while one is `Loading` is rejected with [`ArborError::InitInProgress`]. Every
//! other operation requires `Ready` and returns [`ArborError::NotReady`] otherwise.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arbor_core::{config::EngineConfig, engine::Engine, note::Note};
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! # async fn run() -> Result<(), arbor_core::ArborError> {
//! let (tx, mut rx) = unbounded_channel();
//! let engine = Engine::for_config(EngineConfig::for_vault("/path/to/vault")?).with_events(tx);
//!
//! let report = engine.init().await?;
//! println!("{} notes, {} stubs", report.notes, report.stubs);
//!
//! engine.write_note(Note::new("projects.alpha").with_body("See [[roadmap]]\n")).await?;
//! for reference in engine.cache()?.dangling {
//!     println!("dangling: {reference}");
//! }
//! while let Ok(event) = rx.try_recv() {
//!     println!("{event}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Locking
//!
//! In-memory state sits behind `parking_lot` locks that are never held across an `.await`.
//! Writes to the same note are serialized by a per-note async mutex, so at most one write per
//! note is in flight while writes to different notes run concurrently. A rename also holds the
//! locks of every note whose links it rewrites, all taken in one sorted pass.

use futures::future::{join_all, try_join};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{mpsc::UnboundedSender, Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    cache::{compute_dangling_refs, scan_file, KnownNotes, WorkspaceCache},
    config::EngineConfig,
    error::ArborError,
    event::EngineEvent,
    hierarchy::{NoteTree, Removal, Upsert},
    note::{generate_id, now_millis, Note, ROOT_FNAME},
    paths::{is_valid_fname, os_path_to_string, path_to_fname, shallow_first},
    rewrite::{rewrite, RefRename, Rewrite, RewriteTally},
    schema::{SchemaFinding, SchemaModule, SchemaStore},
    store::{parse_note, FileStore, LiveContent, NoLiveContent, VaultStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// Summary of a successful [Engine::init].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitReport {
    /// Total notes in the tree, stubs included.
    pub notes: usize,
    pub stubs: usize,
    pub schema_modules: usize,
    /// Non-fatal schema findings, module linking first, then note validation.
    pub findings: Vec<SchemaFinding>,
    pub dangling: usize,
}

/// Result of [Engine::rename_note].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameReport {
    /// The renamed note, at its new fname.
    pub fname: String,
    /// Files whose links were rewritten, shallow-first.
    pub files: Vec<PathBuf>,
    pub replacements: usize,
}

struct Loaded {
    tree: NoteTree,
    schemas: SchemaStore,
    findings: Vec<SchemaFinding>,
    cache: WorkspaceCache,
}

pub struct Engine {
    store: Arc<dyn VaultStore>,
    live: Arc<dyn LiveContent>,
    tx: Option<UnboundedSender<EngineEvent>>,
    state: RwLock<EngineState>,
    notes: RwLock<NoteTree>,
    schemas: RwLock<SchemaStore>,
    cache: RwLock<WorkspaceCache>,
    write_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    /// Ids handed to in-flight writes that are not in the tree yet.
    reserved_ids: Mutex<HashSet<String>>,
}

impl Engine {
    pub fn new(store: Arc<dyn VaultStore>) -> Engine {
        Engine {
            store,
            live: Arc::new(NoLiveContent),
            tx: None,
            state: RwLock::new(EngineState::Uninitialized),
            notes: RwLock::new(NoteTree::default()),
            schemas: RwLock::new(SchemaStore::default()),
            cache: RwLock::new(WorkspaceCache::default()),
            write_locks: Mutex::new(HashMap::new()),
            reserved_ids: Mutex::new(HashSet::new()),
        }
    }

    /// An engine over the flat-file vault described by `config`.
    pub fn for_config(config: EngineConfig) -> Engine {
        Engine::new(Arc::new(FileStore::new(config)))
    }

    /// Prefer open editor buffers over stored text when scanning links.
    pub fn with_live_content(mut self, live: Arc<dyn LiveContent>) -> Engine {
        self.live = live;
        self
    }

    pub fn with_events(mut self, tx: UnboundedSender<EngineEvent>) -> Engine {
        self.tx = Some(tx);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.store.config()
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Load the vault: notes and schema modules are read concurrently, the hierarchy and schema
    /// trees are assembled, notes are validated and the cross-reference cache is computed.
    ///
    /// Any failure leaves the engine `Failed` with none of the partially loaded state visible.
    pub async fn init(&self) -> Result<InitReport, ArborError> {
        {
            let mut state = self.state.write();
            if *state == EngineState::Loading {
                tracing::warn!("[Engine::init] rejected, a load is already in progress");
                return Err(ArborError::InitInProgress);
            }
            *state = EngineState::Loading;
        }
        tracing::info!("[Engine::init] loading vault {:?}", self.config().vault);

        match self.load().await {
            Ok(loaded) => {
                let report = InitReport {
                    notes: loaded.tree.len(),
                    stubs: loaded.tree.stubs().count(),
                    schema_modules: loaded.schemas.len(),
                    findings: loaded.findings,
                    dangling: loaded.cache.dangling.len(),
                };
                *self.notes.write() = loaded.tree;
                *self.schemas.write() = loaded.schemas;
                *self.cache.write() = loaded.cache;
                *self.state.write() = EngineState::Ready;
                tracing::info!(
                    "[Engine::init] ready: {} notes ({} stubs), {} schema modules, {} findings",
                    report.notes,
                    report.stubs,
                    report.schema_modules,
                    report.findings.len()
                );
                for finding in report.findings.iter() {
                    tracing::warn!("[Engine::init] {finding}");
                    self.emit(EngineEvent::Finding(finding.clone()));
                }
                self.emit(EngineEvent::Ready(report.notes, report.schema_modules));
                Ok(report)
            }
            Err(e) => {
                *self.notes.write() = NoteTree::default();
                *self.schemas.write() = SchemaStore::default();
                *self.cache.write() = WorkspaceCache::default();
                *self.state.write() = EngineState::Failed;
                if e.is_fatal_to_init() {
                    tracing::error!("[Engine::init] vault cannot be loaded: {e}");
                } else {
                    tracing::warn!("[Engine::init] failed reading vault: {e}");
                }
                self.emit(EngineEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Loaded, ArborError> {
        let store = self.store.as_ref();
        let (note_files, schema_files) = try_join(store.list_notes(), store.list_schemas()).await?;
        tracing::debug!(
            "[Engine::load] {} note files, {} schema files",
            note_files.len(),
            schema_files.len()
        );

        let (note_reads, schema_reads) = futures::join!(
            join_all(note_files.iter().map(|path| store.read_note(path))),
            join_all(schema_files.iter().map(|path| store.read_schema(path)))
        );
        let notes = note_reads.into_iter().collect::<Result<Vec<_>, _>>()?;
        let tree = NoteTree::build(notes)?;
        let modules = schema_reads.into_iter().collect::<Result<Vec<_>, _>>()?;
        let (schemas, mut findings) = SchemaStore::load(modules)?;
        findings.extend(schemas.validate(&tree));

        let known = KnownNotes::new(&tree, &self.config().note_ext);
        let cache = compute_dangling_refs(store, self.live.as_ref(), &known, note_files).await?;
        Ok(Loaded {
            tree,
            schemas,
            findings,
            cache,
        })
    }

    fn ensure_ready(&self) -> Result<(), ArborError> {
        match *self.state.read() {
            EngineState::Ready => Ok(()),
            _ => Err(ArborError::NotReady),
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = self.tx.as_ref() {
            if let Err(e) = tx.send(event) {
                let e: ArborError = e.into();
                tracing::debug!("[Engine::emit] event dropped: {e}");
            }
        }
    }

    /// Record a failed operation on the event sink and hand the error back.
    fn fail(&self, op: &str, e: ArborError) -> ArborError {
        tracing::warn!("[Engine::{op}] {e}");
        self.emit(EngineEvent::Error(e.clone()));
        e
    }

    async fn lock_keys(&self, keys: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();
        let locks = {
            let mut map = self.write_locks.lock();
            keys.iter()
                .map(|k| map.entry(k.to_string()).or_default().clone())
                .collect::<Vec<_>>()
        };
        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    fn check_fname(&self, op: &str, fname: &str) -> Result<(), ArborError> {
        if is_valid_fname(fname) {
            Ok(())
        } else {
            Err(self.fail(
                op,
                ArborError::Command(format!("'{fname}' is not a valid note name")),
            ))
        }
    }

    /// Pick the id a note written at `fname` will carry and hold it until the note is in the
    /// tree, so concurrent writes at different fnames never persist the same id.
    fn reserve_id(&self, fname: &str, proposed: &str) -> String {
        let notes = self.notes.read();
        let mut reserved = self.reserved_ids.lock();
        let mut id = notes.resolve_id(fname, proposed);
        if !notes.contains_fname(fname) && reserved.contains(&id) {
            id = generate_id();
        }
        reserved.insert(id.clone());
        id
    }

    fn known_notes(&self) -> KnownNotes {
        KnownNotes::new(&self.notes.read(), &self.config().note_ext)
    }

    /// Persist a note and patch it into the tree.
    ///
    /// Writing at a stub's fname promotes the stub in place: same id, same children. Writing at a
    /// real note's fname replaces its content and keeps its id. Returns the note as stored in the
    /// tree.
    pub async fn write_note(&self, mut note: Note) -> Result<Note, ArborError> {
        self.ensure_ready()?;
        self.check_fname("write_note", &note.fname)?;
        let fname = note.fname.clone();
        let _guard = self.lock_keys(&[fname.as_str()]).await;

        note.id = self.reserve_id(&fname, &note.id);
        note.stub = false;
        note.updated = now_millis();
        let path = match self.store.write_note(&note).await {
            Ok(path) => path,
            Err(e) => {
                self.reserved_ids.lock().remove(&note.id);
                return Err(self.fail("write_note", e));
            }
        };

        let id = note.id.clone();
        let (outcome, stored) = {
            let mut notes = self.notes.write();
            let outcome = notes.upsert(note);
            self.reserved_ids.lock().remove(&id);
            let stored = notes
                .get_by_fname(&fname)
                .cloned()
                .ok_or_else(|| ArborError::NotFound(format!("note '{fname}'")))?;
            (outcome, stored)
        };
        tracing::debug!("[Engine::write_note] {fname} {outcome:?}");

        let known = self.known_notes();
        let dangling = scan_file(self.store.as_ref(), self.live.as_ref(), &known, &path).await?;
        {
            let mut cache = self.cache.write();
            if outcome == Upsert::Created {
                cache.prune_resolved(&known);
            }
            cache.set_file(path, dangling.unwrap_or_default());
        }
        self.emit(EngineEvent::NoteWritten(fname));
        Ok(stored)
    }

    /// Persist and register a schema module whose root id is new.
    ///
    /// Fails with [ArborError::DuplicateModuleRoot] before anything is written when the root id
    /// is taken. Returns the module's linking findings.
    pub async fn write_schema(&self, module: SchemaModule) -> Result<Vec<SchemaFinding>, ArborError> {
        self.ensure_ready()?;
        let key = format!("schema:{}", module.root);
        let _guard = self.lock_keys(&[key.as_str()]).await;

        if self.schemas.read().contains(&module.root) {
            return Err(self.fail(
                "write_schema",
                ArborError::DuplicateModuleRoot(module.root.clone()),
            ));
        }
        self.store
            .write_schema(&module)
            .await
            .map_err(|e| self.fail("write_schema", e))?;
        let root = module.root.clone();
        let findings = self.schemas.write().insert(module)?;
        self.report_findings("write_schema", &findings);
        self.emit(EngineEvent::SchemaWritten(root));
        Ok(findings)
    }

    /// Persist several new schema modules at once. Every root id is checked before any file is
    /// written; the files are then written concurrently.
    pub async fn write_schemas(
        &self,
        modules: Vec<SchemaModule>,
    ) -> Result<Vec<SchemaFinding>, ArborError> {
        self.ensure_ready()?;
        let keys = modules
            .iter()
            .map(|m| format!("schema:{}", m.root))
            .collect::<Vec<_>>();
        let _guard = self
            .lock_keys(&keys.iter().map(String::as_str).collect::<Vec<_>>())
            .await;

        let mut roots = BTreeSet::new();
        for module in modules.iter() {
            if !roots.insert(module.root.as_str()) || self.schemas.read().contains(&module.root) {
                return Err(self.fail(
                    "write_schemas",
                    ArborError::DuplicateModuleRoot(module.root.clone()),
                ));
            }
        }
        let store = self.store.as_ref();
        join_all(modules.iter().map(|module| store.write_schema(module)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.fail("write_schemas", e))?;

        let mut findings = Vec::new();
        for module in modules {
            let root = module.root.clone();
            findings.extend(self.schemas.write().insert(module)?);
            self.emit(EngineEvent::SchemaWritten(root));
        }
        self.report_findings("write_schemas", &findings);
        Ok(findings)
    }

    /// Replace the schema set of an existing module, matched by root id.
    pub async fn update_schema(
        &self,
        module: SchemaModule,
    ) -> Result<Vec<SchemaFinding>, ArborError> {
        self.ensure_ready()?;
        let key = format!("schema:{}", module.root);
        let _guard = self.lock_keys(&[key.as_str()]).await;

        if !self.schemas.read().contains(&module.root) {
            return Err(self.fail(
                "update_schema",
                ArborError::NotFound(format!("schema module '{}'", module.root)),
            ));
        }
        self.store
            .write_schema(&module)
            .await
            .map_err(|e| self.fail("update_schema", e))?;
        let root = module.root.clone();
        let findings = self.schemas.write().replace(module)?;
        self.report_findings("update_schema", &findings);
        self.emit(EngineEvent::SchemaWritten(root));
        Ok(findings)
    }

    fn report_findings(&self, op: &str, findings: &[SchemaFinding]) {
        for finding in findings {
            tracing::warn!("[Engine::{op}] {finding}");
            self.emit(EngineEvent::Finding(finding.clone()));
        }
    }

    /// Delete a note's file. A note with descendants stays in the tree as a stub.
    pub async fn delete_note(&self, fname: &str) -> Result<Removal, ArborError> {
        self.ensure_ready()?;
        let _guard = self.lock_keys(&[fname]).await;

        self.check_file_backed("delete_note", fname)?;
        self.store
            .delete_note(fname)
            .await
            .map_err(|e| self.fail("delete_note", e))?;
        let (_, removal) = self.notes.write().remove(fname)?;
        let path = self.store.note_path(fname);
        self.cache.write().remove_file(&path);
        if removal == Removal::Deleted {
            // the fname (and any pruned stub ancestors) left the known set
            self.rescan_cached_files().await?;
        }
        tracing::debug!("[Engine::delete_note] {fname} {removal:?}");
        self.emit(EngineEvent::NoteDeleted(fname.to_string()));
        Ok(removal)
    }

    fn check_file_backed(&self, op: &str, fname: &str) -> Result<(), ArborError> {
        if fname == ROOT_FNAME {
            return Err(self.fail(
                op,
                ArborError::Command("the root note cannot be moved or removed".to_string()),
            ));
        }
        let stub = self.notes.read().get_by_fname(fname).map(|note| note.stub);
        match stub {
            Some(false) => Ok(()),
            Some(true) => Err(self.fail(
                op,
                ArborError::NotFound(format!("note '{fname}' is a stub")),
            )),
            None => Err(self.fail(op, ArborError::NotFound(format!("note '{fname}'")))),
        }
    }

    /// Move a note to `new` and rewrite `[[old]]` links across the vault.
    ///
    /// The note keeps its id; descendants keep their fnames. Only files whose text
    /// actually changed are written back, each under its own write lock, and the tree picks up
    /// the rewritten bodies. When the old file cannot be removed the new one is removed again.
    pub async fn rename_note(&self, old: &str, new: &str) -> Result<RenameReport, ArborError> {
        self.ensure_ready()?;
        self.check_fname("rename_note", new)?;
        let renames = [RefRename::new(old, new)];
        let referrers = self
            .link_candidates(&renames, &self.store.note_path(old))
            .await
            .map_err(|e| self.fail("rename_note", e))?;
        let mut keys = vec![old, new];
        keys.extend(referrers.iter().map(|(_, fname)| fname.as_str()));
        let _guard = self.lock_keys(&keys).await;

        self.check_file_backed("rename_note", old)?;
        let moved = {
            let notes = self.notes.read();
            if notes.get_by_fname(new).is_some_and(|n| !n.stub) {
                None
            } else {
                notes.get_by_fname(old).cloned()
            }
        };
        let Some(mut moved) = moved else {
            return Err(self.fail("rename_note", ArborError::DuplicateNote(new.to_string())));
        };
        moved.fname = new.to_string();
        moved.updated = now_millis();
        let mut own = RewriteTally::default();
        match rewrite(&moved.body, &renames, &mut own) {
            Ok(Rewrite::Changed(body)) => moved.body = body,
            Ok(Rewrite::Unchanged) => {}
            Err(e) => return Err(self.fail("rename_note", e)),
        }

        let new_path = self
            .store
            .write_note(&moved)
            .await
            .map_err(|e| self.fail("rename_note", e))?;
        if let Err(e) = self.store.delete_note(old).await {
            if let Err(undo) = self.store.delete_note(new).await {
                tracing::error!("[Engine::rename_note] {new} left on disk next to {old}: {undo}");
            }
            return Err(self.fail("rename_note", e));
        }
        {
            let mut notes = self.notes.write();
            notes.rename(old, new)?;
            notes.upsert(moved);
        }

        let mut files = Vec::new();
        let mut replacements = own.replacements;
        if own.replacements > 0 {
            self.emit(EngineEvent::LinksRewritten(new_path.clone(), own.replacements));
            files.push(new_path);
        }
        let (rewritten, count) = self
            .rewrite_referrers(&renames, referrers)
            .await
            .map_err(|e| self.fail("rename_note", e))?;
        files.extend(rewritten);
        files.sort_by(|a, b| shallow_first(&os_path_to_string(a), &os_path_to_string(b)));
        replacements += count;

        self.rescan_all_files().await?;
        tracing::info!(
            "[Engine::rename_note] {old} -> {new}: {replacements} links in {} files",
            files.len()
        );
        Ok(RenameReport {
            fname: new.to_string(),
            files,
            replacements,
        })
    }

    /// Note files other than `skip` whose stored text holds a link the renames would rewrite,
    /// paired with their fnames.
    async fn link_candidates(
        &self,
        renames: &[RefRename],
        skip: &Path,
    ) -> Result<Vec<(PathBuf, String)>, ArborError> {
        let store = self.store.as_ref();
        let files = store
            .list_notes()
            .await?
            .into_iter()
            .filter(|path| path.as_path() != skip)
            .collect::<Vec<_>>();
        let texts = join_all(files.iter().map(|path| store.read_text(path))).await;

        let mut candidates = Vec::new();
        for (path, text) in files.into_iter().zip(texts) {
            let Some(text) = text? else {
                continue;
            };
            if !rewrite(&text, renames, &mut ())?.is_changed() {
                continue;
            }
            if let Some(fname) = path_to_fname(&path, &self.config().note_ext) {
                candidates.push((path, fname));
            }
        }
        Ok(candidates)
    }

    /// Rewrite links in `referrers`, whose write locks the caller holds. Texts are read again so
    /// writes that landed after the candidates were found are not lost.
    async fn rewrite_referrers(
        &self,
        renames: &[RefRename],
        referrers: Vec<(PathBuf, String)>,
    ) -> Result<(Vec<PathBuf>, usize), ArborError> {
        let store = self.store.as_ref();
        let texts = join_all(referrers.iter().map(|(path, _)| store.read_text(path))).await;

        let mut touched = Vec::new();
        for ((path, fname), text) in referrers.into_iter().zip(texts) {
            let Some(text) = text? else {
                continue;
            };
            let mut tally = RewriteTally::default();
            if let Rewrite::Changed(updated) = rewrite(&text, renames, &mut tally)? {
                touched.push((path, fname, updated, tally.replacements));
            }
        }

        let writes = join_all(
            touched
                .iter()
                .map(|(path, _, text, _)| store.write_text(path, text)),
        )
        .await;
        writes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mut replacements = 0;
        let mut paths = Vec::with_capacity(touched.len());
        for (path, fname, text, count) in touched {
            let note = parse_note(&fname, &os_path_to_string(&path), &text)?;
            self.notes.write().upsert(note);
            self.emit(EngineEvent::LinksRewritten(path.clone(), count));
            replacements += count;
            paths.push(path);
        }
        Ok((paths, replacements))
    }

    /// Recompute the cross-reference cache from a fresh enumeration of the vault.
    pub async fn refresh_cache(&self) -> Result<WorkspaceCache, ArborError> {
        self.ensure_ready()?;
        self.rescan_all_files().await
    }

    async fn rescan_all_files(&self) -> Result<WorkspaceCache, ArborError> {
        let files = self.store.list_notes().await?;
        self.rescan(files).await
    }

    async fn rescan_cached_files(&self) -> Result<WorkspaceCache, ArborError> {
        let files = self.cache.read().files.clone();
        self.rescan(files).await
    }

    async fn rescan(&self, files: Vec<PathBuf>) -> Result<WorkspaceCache, ArborError> {
        let known = self.known_notes();
        let cache = compute_dangling_refs(self.store.as_ref(), self.live.as_ref(), &known, files)
            .await
            .map_err(|e| self.fail("refresh_cache", e))?;
        *self.cache.write() = cache.clone();
        self.emit(EngineEvent::CacheRefreshed(cache.dangling.len()));
        Ok(cache)
    }

    /// Snapshot of the cross-reference cache.
    pub fn cache(&self) -> Result<WorkspaceCache, ArborError> {
        self.ensure_ready()?;
        Ok(self.cache.read().clone())
    }

    pub fn dangling_in<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, ArborError> {
        self.ensure_ready()?;
        Ok(self
            .cache
            .read()
            .dangling_in(path)
            .map(|refs| refs.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Validate every file-backed note against the loaded schema modules.
    pub fn validate(&self) -> Result<Vec<SchemaFinding>, ArborError> {
        self.ensure_ready()?;
        let findings = self.schemas.read().validate(&self.notes.read());
        self.report_findings("validate", &findings);
        Ok(findings)
    }

    pub fn get_note(&self, fname: &str) -> Result<Note, ArborError> {
        self.ensure_ready()?;
        self.notes
            .read()
            .get_by_fname(fname)
            .cloned()
            .ok_or_else(|| ArborError::NotFound(format!("note '{fname}'")))
    }

    /// Every note, stubs included, shallow-first.
    pub fn notes(&self) -> Result<Vec<Note>, ArborError> {
        self.ensure_ready()?;
        Ok(self.notes.read().iter().cloned().collect())
    }

    pub fn schema_modules(&self) -> Result<Vec<SchemaModule>, ArborError> {
        self.ensure_ready()?;
        Ok(self.schemas.read().modules().cloned().collect())
    }

    /// Structural self-check of the loaded tree.
    pub fn built_in_test(&self) -> Vec<String> {
        self.notes.read().built_in_test()
    }
}
