//! # arbor-core
//!
//! A Rust library for keeping a local vault of hierarchically named Markdown notes consistent:
//! the note tree, the schemas that govern it, and the wiki-links between notes.
//!
//! ## Overview
//!
//! A vault is a flat directory of note files whose names encode a hierarchy with dots:
//! `projects.alpha.tasks.md` is a child of `projects.alpha`, which is a child of `projects`, which
//! hangs off the mandatory `root` note. Schema modules (`*.schema.yml`) describe which names are
//! expected where. Notes link to each other with `[[reference]]` or `[[label|reference]]` tokens.
//!
//! ### Key Features
//!
//! - **Gap-free hierarchy**: missing intermediate names are filled with *stub* notes, which are
//!   promoted in place (same id, same children) once a real file is written at their name
//! - **Schema validation**: notes without a governing schema and schemas naming missing children
//!   are reported as non-fatal findings
//! - **Dangling-link cache**: which `[[references]]` in which files resolve to no note, kept current
//!   across writes
//! - **Rename with link rewriting**: moving a note rewrites `[[old]]` and `[[label|old]]` across the
//!   vault, touching only files that change
//! - **Event streaming**: engine notifications go to an optional channel, never to stdout
//!
//! ## Architecture
//!
//! - **[`engine`]**: [`engine::Engine`], the facade that owns the loaded state and sequences
//!   persist-then-patch for every write
//! - **[`hierarchy`]**: [`hierarchy::NoteTree`], stub synthesis and promotion
//! - **[`schema`]**: schema modules, pattern matching and findings
//! - **[`cache`]**: cross-reference cache of dangling references
//! - **[`rewrite`]**: batch link rewriting for renames
//! - **[`store`]**: the [`store::VaultStore`] persistence boundary, with file and in-memory
//!   implementations
//! - **[`link`]**, **[`note`]**, **[`paths`]**: link tokens, the note record, name and path helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arbor_core::{config::EngineConfig, engine::Engine};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::for_config(EngineConfig::for_vault("./vault")?);
//!     let report = engine.init().await?;
//!     for finding in report.findings {
//!         println!("{finding}");
//!     }
//!
//!     let renamed = engine.rename_note("ideas.old", "ideas.new").await?;
//!     println!("{} links rewritten", renamed.replacements);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `arbor` command line tool (`check`, `dangling`, `rename`)

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod link;
pub mod note;
pub mod paths;
pub mod rewrite;
pub mod schema;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
