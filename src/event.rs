use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::{error::ArborError, schema::SchemaFinding};

/// Notifications the [crate::engine::Engine] pushes to its reporting sink.
///
/// The engine never formats or presents these; whoever owns the receiving end of the channel
/// (an editor plugin, a server, the CLI) decides what the user sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A structural error surfaced by an engine operation.
    Error(ArborError),
    /// A non-fatal schema validation finding.
    Finding(SchemaFinding),
    /// Engine finished loading, with (note count, schema module count)
    Ready(usize, usize),
    /// Note persisted and patched into the tree, fname
    NoteWritten(String),
    /// Note file removed, fname
    NoteDeleted(String),
    /// Schema module persisted or replaced, root id
    SchemaWritten(String),
    /// A file's links were rewritten by a rename, path and replacement count
    LinksRewritten(PathBuf, usize),
    /// Workspace cache recomputed, with the global dangling count
    CacheRefreshed(usize),
}

impl Display for EngineEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::Error(e) => write!(f, "error: {e}"),
            EngineEvent::Finding(finding) => write!(f, "finding: {finding}"),
            EngineEvent::Ready(notes, modules) => {
                write!(f, "ready: {notes} notes, {modules} schema modules")
            }
            EngineEvent::NoteWritten(fname) => write!(f, "note written: {fname}"),
            EngineEvent::NoteDeleted(fname) => write!(f, "note deleted: {fname}"),
            EngineEvent::SchemaWritten(id) => write!(f, "schema written: {id}"),
            EngineEvent::LinksRewritten(path, count) => {
                write!(f, "{count} links rewritten in {path:?}")
            }
            EngineEvent::CacheRefreshed(count) => {
                write!(f, "cache refreshed: {count} dangling references")
            }
        }
    }
}
