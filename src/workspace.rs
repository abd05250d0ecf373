use std::env;
use std::path::{Path, PathBuf};

use crate::git;

/// Resolve a user-supplied document path against the current directory.
pub fn resolve_document(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Directory holding `file`.
pub fn document_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Workspace root for `file`: the enclosing git work tree, or the
/// document's own directory outside a repository.
pub fn root_for(file: &Path) -> PathBuf {
    git::discover(file)
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| document_dir(file))
}

/// Workspace root for the current directory (used by commands without a file).
pub fn current_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    git::discover(&cwd)
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or(cwd)
}

/// Path shown to the user: relative to `root` when inside it.
pub fn display_path(root: &Path, file: &Path) -> String {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let file_c = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    file_c
        .strip_prefix(&root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| file.to_string_lossy().to_string())
}
