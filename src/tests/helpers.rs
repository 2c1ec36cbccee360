//! Shared test utilities for engine testing

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Notify;

use crate::{
    config::EngineConfig,
    engine::Engine,
    error::ArborError,
    note::Note,
    schema::{Schema, SchemaModule},
    store::{LiveContent, MemoryStore, VaultStore},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub const ROOT_SCHEMA: &str = "version: 1\nschemas:\n- id: root\n  parent: root\n";

/// A note file with an explicit id.
pub fn note_file(id: &str, body: &str) -> String {
    format!("---\nid: {id}\ntitle: {id}\n---\n{body}")
}

/// In-memory vault seeded with `root.md`, `root.schema.yml` and `files`.
pub fn test_vault(files: &[(&str, &str)]) -> MemoryStore {
    init_logging();
    let store = MemoryStore::new(EngineConfig::new("/vault"));
    store.insert_file("root.md", note_file("root-id", "# Root\n"));
    store.insert_file("root.schema.yml", ROOT_SCHEMA);
    for (name, text) in files {
        store.insert_file(name, *text);
    }
    store
}

/// Engine over `store`, initialized and expected to be ready.
pub async fn ready_engine(store: &MemoryStore) -> Engine {
    let engine = Engine::new(Arc::new(store.clone()));
    engine.init().await.expect("test vault should load");
    engine
}

/// Module rooted at `root` with one child schema per entry of `children`.
pub fn module(root: &str, children: &[&str]) -> SchemaModule {
    let mut module = SchemaModule::with_root(root);
    for child in children {
        module.add_child(root, Schema::new(*child));
    }
    module
}

/// A [MemoryStore] whose enumeration waits until [GatedStore::open] is called.
pub struct GatedStore {
    pub inner: MemoryStore,
    pub gate: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: MemoryStore) -> Self {
        GatedStore {
            inner,
            gate: Arc::new(Notify::new()),
        }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl VaultStore for GatedStore {
    fn config(&self) -> &EngineConfig {
        self.inner.config()
    }

    async fn list_notes(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.gate.notified().await;
        self.inner.list_notes().await
    }

    async fn list_schemas(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.inner.list_schemas().await
    }

    async fn read_note(&self, path: &Path) -> Result<Note, ArborError> {
        self.inner.read_note(path).await
    }

    async fn write_note(&self, note: &Note) -> Result<PathBuf, ArborError> {
        self.inner.write_note(note).await
    }

    async fn delete_note(&self, fname: &str) -> Result<(), ArborError> {
        self.inner.delete_note(fname).await
    }

    async fn read_schema(&self, path: &Path) -> Result<SchemaModule, ArborError> {
        self.inner.read_schema(path).await
    }

    async fn write_schema(&self, module: &SchemaModule) -> Result<PathBuf, ArborError> {
        self.inner.write_schema(module).await
    }

    async fn read_text(&self, path: &Path) -> Result<Option<String>, ArborError> {
        self.inner.read_text(path).await
    }

    async fn write_text(&self, path: &Path, text: &str) -> Result<(), ArborError> {
        self.inner.write_text(path, text).await
    }
}

/// Overlap counters kept by [TracedStore].
#[derive(Debug, Default)]
pub struct WriteStats {
    /// Most note writes in flight at once for each fname.
    pub max_per_fname: BTreeMap<String, usize>,
    /// Most note writes in flight at once overall.
    pub max_overall: usize,
    in_flight: BTreeMap<String, usize>,
    total: usize,
}

/// A [MemoryStore] whose note writes yield mid-flight and record how many overlap. A write to
/// the held fname also waits until [TracedStore::release] is called.
pub struct TracedStore {
    pub inner: MemoryStore,
    pub stats: Arc<Mutex<WriteStats>>,
    pub gate: Arc<Notify>,
    held: Option<String>,
}

impl TracedStore {
    pub fn new(inner: MemoryStore) -> Self {
        TracedStore {
            inner,
            stats: Arc::new(Mutex::new(WriteStats::default())),
            gate: Arc::new(Notify::new()),
            held: None,
        }
    }

    pub fn holding(mut self, fname: &str) -> Self {
        self.held = Some(fname.to_string());
        self
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    fn enter(&self, fname: &str) {
        let mut guard = self.stats.lock();
        let stats = &mut *guard;
        stats.total += 1;
        stats.max_overall = stats.max_overall.max(stats.total);
        let count = stats.in_flight.entry(fname.to_string()).or_default();
        *count += 1;
        let max = stats.max_per_fname.entry(fname.to_string()).or_default();
        *max = (*max).max(*count);
    }

    fn leave(&self, fname: &str) {
        let mut stats = self.stats.lock();
        stats.total -= 1;
        if let Some(count) = stats.in_flight.get_mut(fname) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl VaultStore for TracedStore {
    fn config(&self) -> &EngineConfig {
        self.inner.config()
    }

    async fn list_notes(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.inner.list_notes().await
    }

    async fn list_schemas(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.inner.list_schemas().await
    }

    async fn read_note(&self, path: &Path) -> Result<Note, ArborError> {
        self.inner.read_note(path).await
    }

    async fn write_note(&self, note: &Note) -> Result<PathBuf, ArborError> {
        self.enter(&note.fname);
        if self.held.as_deref() == Some(note.fname.as_str()) {
            self.gate.notified().await;
        }
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let res = self.inner.write_note(note).await;
        self.leave(&note.fname);
        res
    }

    async fn delete_note(&self, fname: &str) -> Result<(), ArborError> {
        self.inner.delete_note(fname).await
    }

    async fn read_schema(&self, path: &Path) -> Result<SchemaModule, ArborError> {
        self.inner.read_schema(path).await
    }

    async fn write_schema(&self, module: &SchemaModule) -> Result<PathBuf, ArborError> {
        self.inner.write_schema(module).await
    }

    async fn read_text(&self, path: &Path) -> Result<Option<String>, ArborError> {
        self.inner.read_text(path).await
    }

    async fn write_text(&self, path: &Path, text: &str) -> Result<(), ArborError> {
        self.inner.write_text(path, text).await
    }
}

/// Editor buffers keyed by path.
#[derive(Default)]
pub struct Buffers(pub BTreeMap<PathBuf, String>);

#[async_trait]
impl LiveContent for Buffers {
    async fn live_content(&self, path: &Path) -> Option<String> {
        self.0.get(path).cloned()
    }
}
