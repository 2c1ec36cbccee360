//! Persistence boundary between the engine and a vault.
//!
//! ## Key Components
//!
//! - [`VaultStore`] - enumerate, read and write notes and schema modules. Stateless per call.
//! - [`FileStore`] - flat-file implementation over a vault directory (`a.b.c.md`,
//!   `foo.schema.yml`).
//! - [`MemoryStore`] - in-memory implementation for tests and embedding.
//! - [`LiveContent`] - hook for unsaved editor buffers, preferred over disk when scanning links.
//!
//! Storage failures (permission denied, disk full) surface as [ArborError::Storage] or
//! [ArborError::PermissionDenied]; only content that cannot be decoded becomes
//! [ArborError::BadParseForNote] / [ArborError::BadParseForSchema].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::EngineConfig,
    error::ArborError,
    note::Note,
    paths::{fname_to_path, has_extension, os_path_to_string, path_to_fname, shallow_first},
    schema::{SchemaModule, SchemaModuleFile},
};

pub mod frontmatter;
pub mod memory;

pub use frontmatter::{parse_note, render_note};
pub use memory::MemoryStore;

#[async_trait]
pub trait VaultStore: Send + Sync {
    fn config(&self) -> &EngineConfig;

    /// Note files in the vault, shallow-first.
    async fn list_notes(&self) -> Result<Vec<PathBuf>, ArborError>;

    /// Schema module files in the vault, shallow-first.
    async fn list_schemas(&self) -> Result<Vec<PathBuf>, ArborError>;

    async fn read_note(&self, path: &Path) -> Result<Note, ArborError>;

    /// Persist a note, returning the file it was written to.
    async fn write_note(&self, note: &Note) -> Result<PathBuf, ArborError>;

    async fn delete_note(&self, fname: &str) -> Result<(), ArborError>;

    async fn read_schema(&self, path: &Path) -> Result<SchemaModule, ArborError>;

    async fn write_schema(&self, module: &SchemaModule) -> Result<PathBuf, ArborError>;

    /// Raw text of a note file. `None` when the path does not exist, is a directory, or is not a
    /// note file.
    async fn read_text(&self, path: &Path) -> Result<Option<String>, ArborError>;

    /// Overwrite a note file's raw text.
    async fn write_text(&self, path: &Path, text: &str) -> Result<(), ArborError>;

    fn note_path(&self, fname: &str) -> PathBuf {
        fname_to_path(&self.config().vault, fname, &self.config().note_ext)
    }

    fn schema_path(&self, fname: &str) -> PathBuf {
        fname_to_path(&self.config().vault, fname, &self.config().schema_ext)
    }

    fn is_note_path(&self, path: &Path) -> bool {
        let config = self.config();
        has_extension(path, &config.note_ext) && !has_extension(path, &config.schema_ext)
    }
}

/// Editor-integration hook: the in-memory buffer for `path`, if one is open.
#[async_trait]
pub trait LiveContent: Send + Sync {
    async fn live_content(&self, path: &Path) -> Option<String>;
}

/// No editor attached, always read from the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLiveContent;

#[async_trait]
impl LiveContent for NoLiveContent {
    async fn live_content(&self, _path: &Path) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    config: EngineConfig,
}

impl FileStore {
    pub fn new(config: EngineConfig) -> Self {
        FileStore { config }
    }

    /// Top-level files of the vault carrying `ext`, shallow-first.
    fn list_with_ext(&self, ext: &str, exclude: Option<&str>) -> Result<Vec<PathBuf>, ArborError> {
        fn is_hidden(entry: &DirEntry) -> bool {
            entry
                .file_name()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        }
        let skip_hidden = self.config.skip_hidden;
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.config.vault)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_entry(|e| !(skip_hidden && is_hidden(e)))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if has_extension(&path, ext) && !exclude.is_some_and(|ex| has_extension(&path, ex)) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| shallow_first(&os_path_to_string(a), &os_path_to_string(b)));
        Ok(files)
    }

    fn fname_of(&self, path: &Path, ext: &str) -> Result<String, ArborError> {
        path_to_fname(path, ext)
            .ok_or_else(|| ArborError::NotFound(format!("{path:?} is not a .{ext} file")))
    }
}

#[async_trait]
impl VaultStore for FileStore {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn list_notes(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.list_with_ext(&self.config.note_ext, Some(&self.config.schema_ext))
    }

    async fn list_schemas(&self) -> Result<Vec<PathBuf>, ArborError> {
        self.list_with_ext(&self.config.schema_ext, None)
    }

    async fn read_note(&self, path: &Path) -> Result<Note, ArborError> {
        tracing::debug!("Reading note {:?}", path);
        let fname = self.fname_of(path, &self.config.note_ext)?;
        let content = tokio::fs::read_to_string(path).await?;
        parse_note(&fname, &os_path_to_string(path), &content)
    }

    async fn write_note(&self, note: &Note) -> Result<PathBuf, ArborError> {
        let path = self.note_path(&note.fname);
        tracing::debug!("Writing note {:?}", path);
        tokio::fs::write(&path, render_note(note)?).await?;
        Ok(path)
    }

    async fn delete_note(&self, fname: &str) -> Result<(), ArborError> {
        let path = self.note_path(fname);
        tracing::debug!("Deleting note {:?}", path);
        Ok(tokio::fs::remove_file(path).await?)
    }

    async fn read_schema(&self, path: &Path) -> Result<SchemaModule, ArborError> {
        tracing::debug!("Reading schema module {:?}", path);
        let fname = self.fname_of(path, &self.config.schema_ext)?;
        let content = tokio::fs::read_to_string(path).await?;
        let file: SchemaModuleFile =
            serde_yaml::from_str(&content).map_err(|e| ArborError::BadParseForSchema {
                path: os_path_to_string(path),
                reason: e.to_string(),
            })?;
        SchemaModule::new(fname, file)
    }

    async fn write_schema(&self, module: &SchemaModule) -> Result<PathBuf, ArborError> {
        let path = self.schema_path(&module.fname);
        tracing::debug!("Writing schema module {:?}", path);
        let yaml = serde_yaml::to_string(&module.to_file())?;
        tokio::fs::write(&path, yaml).await?;
        Ok(path)
    }

    async fn read_text(&self, path: &Path) -> Result<Option<String>, ArborError> {
        if !self.is_note_path(path) {
            return Ok(None);
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => return Ok(None),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        Ok(Some(tokio::fs::read_to_string(path).await?))
    }

    async fn write_text(&self, path: &Path, text: &str) -> Result<(), ArborError> {
        Ok(tokio::fs::write(path, text).await?)
    }
}
