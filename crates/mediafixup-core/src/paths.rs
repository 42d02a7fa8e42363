//! Translation of server-side media paths to local paths.

use crate::config::PathMapping;
use std::path::{PathBuf, MAIN_SEPARATOR};

/// Map `server_path` to a local path using the first mapping whose server
/// root is a prefix of it. Both sides may use either path separator; the
/// result uses the separator of the local OS.
pub fn local_path(server_path: &str, mappings: &[PathMapping]) -> Option<PathBuf> {
    let server_path = server_path.replace('\\', "/");
    mappings.iter().find_map(|mapping| {
        let mut root = mapping.server.replace('\\', "/");
        if !root.ends_with('/') {
            root.push('/');
        }
        let relative = server_path.strip_prefix(&root)?;

        let local_root = to_local_separators(&mapping.local);
        let relative = to_local_separators(relative);
        Some(PathBuf::from(local_root).join(relative))
    })
}

fn to_local_separators(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}
