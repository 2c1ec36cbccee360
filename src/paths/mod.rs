pub mod path;

pub use path::{
    ancestors, fname_to_path, has_extension, hierarchy_depth, is_valid_fname, leaf,
    normalize_slashes, os_path_to_string, parent_fname, path_to_fname, shallow_first,
    shallow_first_fname, sort_shallow_first, strip_extension, HIERARCHY_SEP,
};
