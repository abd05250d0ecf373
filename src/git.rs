use std::path::{Path, PathBuf};

use git2::{Repository, Status};
use tracing::debug;

use crate::error::{Error, Result};

fn git_err(context: &str, e: git2::Error) -> Error {
    Error::Git(format!("{}: {}", context, e.message()))
}

/// Open the repository enclosing `path`, if any.
pub fn discover(path: &Path) -> Option<Repository> {
    let start = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(Path::new("."))
    };
    let start = if start.as_os_str().is_empty() {
        Path::new(".")
    } else {
        start
    };
    Repository::discover(start).ok()
}

/// Path of `file` relative to the repository work tree.
pub fn relative_path(repo: &Repository, file: &Path) -> Result<PathBuf> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| Error::Git("repository has no working directory".to_string()))?;
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    let file = file
        .canonicalize()
        .map_err(|e| Error::io(format!("resolving {}", file.display()), e))?;
    file.strip_prefix(&workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            Error::Git(format!(
                "{} is outside the repository at {}",
                file.display(),
                workdir.display()
            ))
        })
}

/// Check if a file has uncommitted changes (staged, unstaged, or untracked)
pub fn has_changes(repo: &Repository, rel_path: &Path) -> bool {
    match repo.status_file(rel_path) {
        Ok(status) => !status.is_empty() && status != Status::CURRENT,
        Err(e) => {
            // NotFound means untracked when the file exists on disk
            if e.code() == git2::ErrorCode::NotFound {
                let workdir = repo.workdir().unwrap_or(Path::new("."));
                workdir.join(rel_path).exists()
            } else {
                true
            }
        }
    }
}

/// Commit only `rel_path`, like `git commit -- <file>`. Other staged entries
/// stay staged.
pub fn commit_file(repo: &Repository, rel_path: &Path, message: &str) -> Result<()> {
    let sig = repo
        .signature()
        .map_err(|e| git_err("failed to get signature", e))?;

    let head_tree = match repo.head() {
        Ok(head) => Some(
            head.peel_to_tree()
                .map_err(|e| git_err("failed to get HEAD tree", e))?,
        ),
        Err(_) => None, // Initial commit
    };

    let mut index = repo.index().map_err(|e| git_err("failed to get index", e))?;
    let original_entries: Vec<_> = index.iter().collect();

    index.clear().map_err(|e| git_err("failed to clear index", e))?;
    if let Some(ref tree) = head_tree {
        index
            .read_tree(tree)
            .map_err(|e| git_err("failed to read HEAD tree", e))?;
    }
    index
        .add_path(rel_path)
        .map_err(|e| git_err(&format!("failed to add {}", rel_path.display()), e))?;

    let tree_id = index
        .write_tree()
        .map_err(|e| git_err("failed to write tree", e))?;
    let tree = repo
        .find_tree(tree_id)
        .map_err(|e| git_err("failed to find tree", e))?;

    let parent_commit = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| git_err("failed to get HEAD commit", e))?,
        ),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(|e| git_err("failed to create commit", e))?;

    // Rebuild the index from the new HEAD, then put back unrelated staged entries
    let new_head_tree = repo
        .head()
        .and_then(|h| h.peel_to_tree())
        .map_err(|e| git_err("failed to get new HEAD tree", e))?;
    index
        .read_tree(&new_head_tree)
        .map_err(|e| git_err("failed to read new HEAD tree", e))?;

    for entry in original_entries {
        let entry_path = Path::new(std::str::from_utf8(&entry.path).unwrap_or(""));
        if entry_path != rel_path {
            index
                .add(&entry)
                .map_err(|e| git_err("failed to restore staged entry", e))?;
        }
    }
    index.write().map_err(|e| git_err("failed to write index", e))?;

    debug!(path = %rel_path.display(), "committed document");
    Ok(())
}

/// Default commit message for an action on a document.
pub fn commit_message(action: &str, file: &Path) -> String {
    let name = file
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());
    format!("automove: {} in {}", action, name)
}

/// Commit `file` if it has changes. Returns whether a commit was made.
pub fn commit_document(file: &Path, message: &str) -> Result<bool> {
    let repo = discover(file).ok_or_else(|| {
        Error::Git(format!("{} is not inside a git repository", file.display()))
    })?;
    let rel_path = relative_path(&repo, file)?;

    if !has_changes(&repo, &rel_path) {
        debug!(path = %rel_path.display(), "nothing to commit");
        return Ok(false);
    }
    commit_file(&repo, &rel_path, message)?;
    Ok(true)
}
