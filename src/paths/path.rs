use std::{
    borrow::Cow,
    cmp::Ordering,
    path::{Component, Path, PathBuf},
};

/// Separator between segments of a hierarchical name (`a.b.c`).
pub const HIERARCHY_SEP: char = '.';

/// Utility function to replace separators and convert to unicode (via to_string_lossy) on os path.
pub fn os_path_to_string<P: AsRef<Path>>(os_path_ref: P) -> String {
    let res = os_path_ref
        .as_ref()
        .components()
        .map(|c| match c {
            Component::RootDir => Cow::from("".to_string()),
            _ => c.as_os_str().to_string_lossy(),
        })
        .collect::<Vec<_>>()
        .join("/");
    tracing::trace!(
        "os_path_to_string: turned {:?} into {}",
        os_path_ref.as_ref(),
        res
    );
    res
}

/// Turn windows style separators into forward slashes.
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Case-insensitive check that `path` ends in `.{ext}`.
///
/// `ext` may itself contain dots (`schema.yml`).
pub fn has_extension<P: AsRef<Path>>(path: P, ext: &str) -> bool {
    let name = match path.as_ref().file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    let suffix = format!(".{}", ext.trim_start_matches('.')).to_lowercase();
    let lower = name.to_lowercase();
    lower.len() > suffix.len() && lower.ends_with(&suffix)
}

/// Strip a trailing `.{ext}` (case-insensitive), if present.
pub fn strip_extension<'a>(name: &'a str, ext: &str) -> &'a str {
    let suffix_len = ext.trim_start_matches('.').len() + 1;
    if name.len() > suffix_len
        && name.is_char_boundary(name.len() - suffix_len)
        && name[name.len() - suffix_len..]
            .eq_ignore_ascii_case(&format!(".{}", ext.trim_start_matches('.')))
    {
        &name[..name.len() - suffix_len]
    } else {
        name
    }
}

/// Map a hierarchical name to the flat file holding it: `a.b.c` -> `{vault}/a.b.c.{ext}`.
pub fn fname_to_path<P: AsRef<Path>>(vault: P, fname: &str, ext: &str) -> PathBuf {
    vault
        .as_ref()
        .join(format!("{fname}.{}", ext.trim_start_matches('.')))
}

/// Inverse of [fname_to_path]. Returns None when the file does not carry `ext`.
pub fn path_to_fname<P: AsRef<Path>>(path: P, ext: &str) -> Option<String> {
    if !has_extension(&path, ext) {
        return None;
    }
    let name = path.as_ref().file_name()?.to_string_lossy().to_string();
    Some(strip_extension(&name, ext).to_string())
}

/// True when `fname` can name a flat note file: at least one segment, no empty segments (so no
/// leading, trailing or doubled dots) and no path separators.
pub fn is_valid_fname(fname: &str) -> bool {
    !fname.is_empty()
        && !fname.contains(['/', '\\'])
        && fname.split(HIERARCHY_SEP).all(|segment| !segment.trim().is_empty())
}

/// Every strict ancestor of a hierarchical name, shortest first.
///
/// `a.b.c` yields `["a", "a.b"]`; a single segment name has no ancestors.
pub fn ancestors(fname: &str) -> Vec<&str> {
    fname
        .match_indices(HIERARCHY_SEP)
        .map(|(idx, _)| &fname[..idx])
        .collect()
}

/// The immediate parent name, if the name has more than one segment.
pub fn parent_fname(fname: &str) -> Option<&str> {
    fname.rfind(HIERARCHY_SEP).map(|idx| &fname[..idx])
}

/// Last segment of a hierarchical name.
pub fn leaf(fname: &str) -> &str {
    fname
        .rfind(HIERARCHY_SEP)
        .map(|idx| &fname[idx + 1..])
        .unwrap_or(fname)
}

/// Hierarchical depth of a vault path: directory components plus dot-delimited segments of the
/// file stem. `a.md` is 1, `a/b.md` and `a.b.md` are 2.
pub fn hierarchy_depth(path: &str) -> usize {
    let path = normalize_slashes(path);
    let path = path.trim_matches('/');
    if path.is_empty() {
        return 0;
    }
    let (dir, file) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };
    let dir_depth = if dir.is_empty() {
        0
    } else {
        dir.split('/').count()
    };
    dir_depth + stem.split(HIERARCHY_SEP).count()
}

/// Shallow-first comparator: fewer hierarchical segments sort first, ties broken lexically.
pub fn shallow_first(a: &str, b: &str) -> Ordering {
    hierarchy_depth(a)
        .cmp(&hierarchy_depth(b))
        .then_with(|| normalize_slashes(a).cmp(&normalize_slashes(b)))
}

/// [shallow_first] for bare hierarchical names, which carry no file extension: `a` < `root` <
/// `a.b`.
pub fn shallow_first_fname(a: &str, b: &str) -> Ordering {
    let depth = |fname: &str| fname.split(HIERARCHY_SEP).count();
    depth(a).cmp(&depth(b)).then_with(|| a.cmp(b))
}

pub fn sort_shallow_first<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| shallow_first(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_checks() {
        assert!(has_extension("vault/foo.md", "md"));
        assert!(has_extension("vault/foo.MD", ".md"));
        assert!(has_extension("vault/foo.schema.yml", "schema.yml"));
        assert!(!has_extension("vault/foo.yml", "schema.yml"));
        assert!(!has_extension("vault/.md", "md"));
        assert!(!has_extension("vault/foo", "md"));
    }

    #[test]
    fn fname_round_trip_through_flat_files() {
        let path = fname_to_path("/vault", "a.b.c", "md");
        assert_eq!(path, PathBuf::from("/vault/a.b.c.md"));
        assert_eq!(path_to_fname(&path, "md").as_deref(), Some("a.b.c"));
        assert_eq!(path_to_fname("/vault/a.schema.yml", "md"), None);
    }

    #[test]
    fn hierarchy_helpers() {
        assert_eq!(ancestors("a.b.c"), vec!["a", "a.b"]);
        assert!(ancestors("root").is_empty());
        assert_eq!(parent_fname("a.b.c"), Some("a.b"));
        assert_eq!(parent_fname("a"), None);
        assert_eq!(leaf("a.b.c"), "c");
        assert_eq!(leaf("a"), "a");
    }

    #[test]
    fn shallow_first_ordering() {
        let mut paths = vec!["a/b.md", "a.md", "a/b/c.md"];
        sort_shallow_first(&mut paths);
        assert_eq!(paths, vec!["a.md", "a/b.md", "a/b/c.md"]);

        let mut flat = vec!["foo.ch1.md", "root.md", "bar.md", "foo.md"];
        sort_shallow_first(&mut flat);
        assert_eq!(flat, vec!["bar.md", "foo.md", "root.md", "foo.ch1.md"]);

        let mut fnames = vec!["foo.ch1", "root", "foo"];
        fnames.sort_by(|a, b| shallow_first_fname(a, b));
        assert_eq!(fnames, vec!["foo", "root", "foo.ch1"]);
    }

    #[test]
    fn fname_validity() {
        assert!(is_valid_fname("a"));
        assert!(is_valid_fname("projects.alpha-2024.tasks"));
        for bad in ["", ".", "a..b", "a.", ".hidden", "../escape", "a/b", "a\\b", "a. .b"] {
            assert!(!is_valid_fname(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn slashes() {
        assert_eq!(normalize_slashes("a\\b\\c.md"), "a/b/c.md");
        assert_eq!(hierarchy_depth("a\\b\\c.md"), 3);
        assert_eq!(os_path_to_string(Path::new("a/b.md")), "a/b.md");
    }
}
