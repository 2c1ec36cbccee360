//! Schema modules and note validation.
//!
//! A schema module is one `<name>.schema.yml` file holding a flat list of [Schema] nodes. One
//! node, the module root, has `parent: root`; the rest hang off it through `children` id lists.
//! Each schema's `pattern` (its id when absent) matches one or more hierarchical segments, `*`
//! standing for any run of characters within a single segment.
//!
//! Unlike notes, schemas are never stubbed. Broken child references are reported as
//! [SchemaFinding]s and otherwise left alone.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::{error::ArborError, hierarchy::NoteTree, note::ROOT_FNAME, paths::HIERARCHY_SEP};

pub const SCHEMA_VERSION: u32 = 1;

/// Non-fatal validation results. Collected and returned next to otherwise successful results.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Error)]
pub enum SchemaFinding {
    #[error("note '{fname}' has no governing schema")]
    NoMatchingSchema { fname: String },
    #[error("schema '{schema}' in module '{module}' lists missing child '{child}'")]
    MissingChildSchema {
        module: String,
        schema: String,
        child: String,
    },
    #[error("schema id '{id}' appears more than once in module '{module}'")]
    DuplicateSchemaId { module: String, id: String },
    #[error("root pattern '{pattern}' of module '{module}' does not match its name")]
    RootPatternMismatch { module: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl Schema {
    pub fn new<S: Into<String>>(id: S) -> Schema {
        Schema {
            id: id.into(),
            title: String::new(),
            desc: String::new(),
            pattern: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_pattern<S: Into<String>>(mut self, pattern: S) -> Schema {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_parent<S: Into<String>>(mut self, parent: S) -> Schema {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// Pattern text, the id when no explicit pattern is set.
    pub fn pattern(&self) -> &str {
        self.pattern.as_deref().unwrap_or(&self.id)
    }

    /// Number of hierarchical segments the pattern consumes.
    pub fn width(&self) -> usize {
        self.pattern().split(HIERARCHY_SEP).count()
    }

    /// True when the pattern matches `segments` exactly (case-insensitive).
    pub fn matches(&self, segments: &[&str]) -> bool {
        let pattern_segments = self.pattern().split(HIERARCHY_SEP).collect::<Vec<_>>();
        pattern_segments.len() == segments.len()
            && pattern_segments
                .iter()
                .zip(segments)
                .all(|(pattern, segment)| {
                    segment_glob(pattern).is_some_and(|glob| glob.is_match(segment))
                })
    }
}

/// Compile one pattern segment, `*` matching any run of non-separator characters.
fn segment_glob(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[^.]*");
    RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// On-disk shape of a `*.schema.yml` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModuleFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// A loaded schema module with its designated root schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModule {
    pub version: u32,
    /// File stem, `foo` for `foo.schema.yml`.
    pub fname: String,
    pub schemas: Vec<Schema>,
    /// Id of the root schema.
    pub root: String,
}

impl SchemaModule {
    /// Designate the module root: the `root` schema in the root module, elsewhere the first
    /// schema whose parent is `root`.
    ///
    /// Direct children of the `root` schema also carry `parent: root` once linked, so the root
    /// module is always designated by id.
    pub fn new<S: Into<String>>(fname: S, file: SchemaModuleFile) -> Result<SchemaModule, ArborError> {
        let fname = fname.into();
        let by_id = || file.schemas.iter().find(|s| s.id == ROOT_FNAME);
        let by_parent = || {
            file.schemas
                .iter()
                .find(|s| s.parent.as_deref() == Some(ROOT_FNAME) && s.id != ROOT_FNAME)
        };
        let root = if fname == ROOT_FNAME {
            by_id().or_else(by_parent)
        } else {
            by_parent().or_else(by_id)
        }
        .map(|s| s.id.clone())
            .ok_or_else(|| ArborError::BadParseForSchema {
                path: fname.clone(),
                reason: "no schema has `parent: root`".to_string(),
            })?;
        Ok(SchemaModule {
            version: file.version,
            fname,
            schemas: file.schemas,
            root,
        })
    }

    /// Module with only a root schema, whose id doubles as the module name.
    pub fn with_root<S: Into<String>>(id: S) -> SchemaModule {
        let id = id.into();
        let mut root = Schema::new(id.clone());
        if id != ROOT_FNAME {
            root.parent = Some(ROOT_FNAME.to_string());
        }
        SchemaModule {
            version: SCHEMA_VERSION,
            fname: id.clone(),
            schemas: vec![root],
            root: id,
        }
    }

    /// Append a schema as a child of `parent`.
    pub fn add_child(&mut self, parent: &str, mut schema: Schema) {
        schema.parent = Some(parent.to_string());
        if let Some(p) = self.schemas.iter_mut().find(|s| s.id == parent) {
            if !p.children.contains(&schema.id) {
                p.children.push(schema.id.clone());
            }
        }
        self.schemas.push(schema);
    }

    pub fn to_file(&self) -> SchemaModuleFile {
        SchemaModuleFile {
            version: self.version,
            schemas: self.schemas.clone(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.id == id)
    }

    pub fn root_schema(&self) -> Option<&Schema> {
        self.get(&self.root)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Derive parent links from `children` lists, reporting what cannot be linked.
    pub fn link(&mut self) -> Vec<SchemaFinding> {
        let mut findings = Vec::new();
        let mut seen = BTreeSet::new();
        for schema in self.schemas.iter() {
            if !seen.insert(schema.id.clone()) {
                findings.push(SchemaFinding::DuplicateSchemaId {
                    module: self.root.clone(),
                    id: schema.id.clone(),
                });
            }
        }

        let mut parents = BTreeMap::new();
        for schema in self.schemas.iter() {
            for child in schema.children.iter() {
                if seen.contains(child) {
                    parents
                        .entry(child.clone())
                        .or_insert_with(|| schema.id.clone());
                } else {
                    findings.push(SchemaFinding::MissingChildSchema {
                        module: self.root.clone(),
                        schema: schema.id.clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        for schema in self.schemas.iter_mut() {
            if let Some(parent) = parents.remove(&schema.id) {
                schema.parent = Some(parent);
            }
        }

        if let Some(root) = self.root_schema() {
            let top = self.fname.split(HIERARCHY_SEP).collect::<Vec<_>>();
            let width = root.width().min(top.len());
            if !root.matches(&top[..width]) {
                findings.push(SchemaFinding::RootPatternMismatch {
                    module: self.root.clone(),
                    pattern: root.pattern().to_string(),
                });
            }
        }
        findings
    }

    /// Descend from the module root, consuming segments; the schema that consumes the last one
    /// governs the name.
    pub fn match_segments(&self, segments: &[&str]) -> Option<&Schema> {
        let mut visited = BTreeSet::new();
        self.root_schema()
            .and_then(|root| self.match_from(root, segments, &mut visited))
    }

    fn match_from<'a>(
        &'a self,
        schema: &'a Schema,
        segments: &[&str],
        visited: &mut BTreeSet<String>,
    ) -> Option<&'a Schema> {
        let width = schema.width();
        if width > segments.len() || !schema.matches(&segments[..width]) {
            return None;
        }
        let rest = &segments[width..];
        if rest.is_empty() {
            return Some(schema);
        }
        if !visited.insert(schema.id.clone()) {
            return None;
        }
        let found = schema
            .children
            .iter()
            .filter_map(|child| self.get(child))
            .find_map(|child| self.match_from(child, rest, visited));
        visited.remove(&schema.id);
        found
    }
}

/// All loaded schema modules, keyed by module root id.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    modules: BTreeMap<String, SchemaModule>,
}

impl SchemaStore {
    /// Link every module and require the `root` module. Two modules sharing a root id fail with
    /// [ArborError::DuplicateModuleRoot].
    pub fn load(modules: Vec<SchemaModule>) -> Result<(SchemaStore, Vec<SchemaFinding>), ArborError> {
        let mut store = SchemaStore::default();
        let mut findings = Vec::new();
        for mut module in modules {
            if store.modules.contains_key(&module.root) {
                return Err(ArborError::DuplicateModuleRoot(module.root));
            }
            findings.extend(module.link());
            store.modules.insert(module.root.clone(), module);
        }
        if !store.modules.contains_key(ROOT_FNAME) {
            return Err(ArborError::NoSchemaFound);
        }
        Ok((store, findings))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, root_id: &str) -> bool {
        self.modules.contains_key(root_id)
    }

    pub fn get(&self, root_id: &str) -> Option<&SchemaModule> {
        self.modules.get(root_id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &SchemaModule> {
        self.modules.values()
    }

    /// Add a module that does not exist yet.
    pub fn insert(&mut self, mut module: SchemaModule) -> Result<Vec<SchemaFinding>, ArborError> {
        if self.modules.contains_key(&module.root) {
            return Err(ArborError::DuplicateModuleRoot(module.root));
        }
        let findings = module.link();
        self.modules.insert(module.root.clone(), module);
        Ok(findings)
    }

    /// Replace the schema set of an existing module, matched by root id.
    pub fn replace(&mut self, mut module: SchemaModule) -> Result<Vec<SchemaFinding>, ArborError> {
        let Some(slot) = self.modules.get_mut(&module.root) else {
            return Err(ArborError::NotFound(format!(
                "schema module '{}'",
                module.root
            )));
        };
        let findings = module.link();
        *slot = module;
        Ok(findings)
    }

    /// The module root id and schema governing `fname`, first module in root-id order wins.
    pub fn governing(&self, fname: &str) -> Option<(&SchemaModule, &Schema)> {
        let segments = fname.split(HIERARCHY_SEP).collect::<Vec<_>>();
        self.modules
            .values()
            .find_map(|module| module.match_segments(&segments).map(|s| (module, s)))
    }

    /// Every file-backed note without a governing schema. Stubs are skipped.
    pub fn validate(&self, notes: &NoteTree) -> Vec<SchemaFinding> {
        notes
            .iter()
            .filter(|note| !note.stub)
            .filter(|note| self.governing(&note.fname).is_none())
            .map(|note| SchemaFinding::NoMatchingSchema {
                fname: note.fname.clone(),
            })
            .collect()
    }
}
