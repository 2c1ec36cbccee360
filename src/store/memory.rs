use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    config::EngineConfig,
    error::ArborError,
    note::Note,
    paths::{has_extension, os_path_to_string, path_to_fname, shallow_first},
    schema::{SchemaModule, SchemaModuleFile},
    store::{parse_note, render_note, VaultStore},
};

/// A [VaultStore] over an in-memory file map, keyed by the same paths [crate::store::FileStore]
/// would use. Clones share the same files.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    config: EngineConfig,
    files: Arc<RwLock<BTreeMap<PathBuf, String>>>,
    fail_writes: Arc<AtomicBool>,
    undeletable: Arc<RwLock<Option<String>>>,
}

impl MemoryStore {
    pub fn new(config: EngineConfig) -> Self {
        MemoryStore {
            config,
            files: Arc::new(RwLock::new(BTreeMap::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            undeletable: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed a file by name relative to the vault.
    pub fn insert_file<S: Into<String>>(&self, name: &str, text: S) {
        let path = self.config.vault.join(name);
        self.files.write().insert(path, text.into());
    }

    pub fn file(&self, name: &str) -> Option<String> {
        self.files.read().get(&self.config.vault.join(name)).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files
            .read()
            .keys()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect()
    }

    /// Make every subsequent write fail as if the disk were full.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make deleting the note at `fname` fail as if its file were read-only.
    pub fn set_undeletable(&self, fname: Option<&str>) {
        *self.undeletable.write() = fname.map(str::to_string);
    }

    fn check_writable(&self) -> Result<(), ArborError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ArborError::Storage("no space left on device".to_string()))
        } else {
            Ok(())
        }
    }

    fn list_with_ext(&self, ext: &str, exclude: Option<&str>) -> Vec<PathBuf> {
        let mut files = self
            .files
            .read()
            .keys()
            .filter(|p| has_extension(p, ext) && !exclude.is_some_and(|ex| has_extension(p, ex)))
            .cloned()
            .collect::<Vec<_>>();
        files.sort_by(|a, b| shallow_first(&os_path_to_string(a), &os_path_to_string(b)));
        files
    }

    fn read(&self, path: &Path) -> Result<String, ArborError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ArborError::NotFound(format!("{path:?}")))
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn list_notes(&self) -> Result<Vec<PathBuf>, ArborError> {
        Ok(self.list_with_ext(&self.config.note_ext, Some(&self.config.schema_ext)))
    }

    async fn list_schemas(&self) -> Result<Vec<PathBuf>, ArborError> {
        Ok(self.list_with_ext(&self.config.schema_ext, None))
    }

    async fn read_note(&self, path: &Path) -> Result<Note, ArborError> {
        let fname = path_to_fname(path, &self.config.note_ext)
            .ok_or_else(|| ArborError::NotFound(format!("{path:?} is not a note")))?;
        let content = self.read(path)?;
        parse_note(&fname, &os_path_to_string(path), &content)
    }

    async fn write_note(&self, note: &Note) -> Result<PathBuf, ArborError> {
        self.check_writable()?;
        let path = self.note_path(&note.fname);
        self.files.write().insert(path.clone(), render_note(note)?);
        Ok(path)
    }

    async fn delete_note(&self, fname: &str) -> Result<(), ArborError> {
        self.check_writable()?;
        if self.undeletable.read().as_deref() == Some(fname) {
            return Err(ArborError::PermissionDenied);
        }
        let path = self.note_path(fname);
        self.files
            .write()
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| ArborError::NotFound(format!("{path:?}")))
    }

    async fn read_schema(&self, path: &Path) -> Result<SchemaModule, ArborError> {
        let fname = path_to_fname(path, &self.config.schema_ext)
            .ok_or_else(|| ArborError::NotFound(format!("{path:?} is not a schema module")))?;
        let content = self.read(path)?;
        let file: SchemaModuleFile =
            serde_yaml::from_str(&content).map_err(|e| ArborError::BadParseForSchema {
                path: os_path_to_string(path),
                reason: e.to_string(),
            })?;
        SchemaModule::new(fname, file)
    }

    async fn write_schema(&self, module: &SchemaModule) -> Result<PathBuf, ArborError> {
        self.check_writable()?;
        let path = self.schema_path(&module.fname);
        let yaml = serde_yaml::to_string(&module.to_file())?;
        self.files.write().insert(path.clone(), yaml);
        Ok(path)
    }

    async fn read_text(&self, path: &Path) -> Result<Option<String>, ArborError> {
        if !self.is_note_path(path) {
            return Ok(None);
        }
        Ok(self.files.read().get(path).cloned())
    }

    async fn write_text(&self, path: &Path, text: &str) -> Result<(), ArborError> {
        self.check_writable()?;
        self.files.write().insert(path.to_path_buf(), text.to_string());
        Ok(())
    }
}
