pub mod clear;
pub mod config_cmd;
pub mod move_cmd;
pub mod scan;
pub mod watch;

use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::workspace;

/// Resolved target document plus the configuration that applies to it.
pub struct Context {
    pub file: PathBuf,
    pub root: PathBuf,
    pub config: Config,
}

impl Context {
    pub fn for_document(path: &Path) -> Self {
        let file = workspace::resolve_document(path);
        let root = workspace::root_for(&file);
        let loaded = config::load_config(&root, &workspace::document_dir(&file));
        Self {
            file,
            root,
            config: loaded.config,
        }
    }

    /// Document path relative to the workspace root, for messages.
    pub fn display(&self) -> String {
        workspace::display_path(&self.root, &self.file)
    }
}
