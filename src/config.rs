//! Configuration system for automove.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (AUTOMOVE_*)
//! 3. Project manifests (.automove/config.yaml, walked from workspace root to the document)
//! 4. User global (~/.config/automove/config.yaml)
//! 5. Built-in defaults (lowest priority)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Task marker settings
    pub tasks: TasksConfig,
    /// Archive section settings
    pub archive: ArchiveConfig,
    /// Behavior settings
    pub behavior: BehaviorConfig,
    /// View-mode convenience switches for editor hosts
    pub view: ViewConfig,
}

/// Completion marker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TasksConfig {
    /// Moment-style timestamp pattern (YYYY, MM, DD, HH, mm, ss, ...)
    pub date_format: String,
    /// Icon placed before the completion timestamp
    pub completion_icon: String,
    /// Icon used by reminder tags; lines carrying it plus a stamp are never touched
    pub reminder_icon: String,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            date_format: "YYYY-MM-DD HH:mm:ss".to_string(),
            completion_icon: "✅".to_string(),
            reminder_icon: "🔔".to_string(),
        }
    }
}

/// Archive section settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Heading line identifying the section (exact match after trimming)
    pub heading: String,
    /// Create the section at the end of the document when missing
    pub auto_create: bool,
    /// Put a `---` line under a newly created heading
    pub add_separator: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            heading: "## Completed Tasks".to_string(),
            auto_create: true,
            add_separator: true,
        }
    }
}

/// Behavior defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Run cycles automatically on change (watch mode)
    pub auto_move: bool,
    /// Debounce before a triggered cycle starts, in milliseconds
    pub trigger_delay_ms: u64,
    /// Commit the document after mutations
    pub auto_commit: bool,
    /// Suppress hints
    pub quiet: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            auto_move: true,
            trigger_delay_ms: 500,
            auto_commit: false,
            quiet: false,
        }
    }
}

/// View-mode switches (no effect for hosts without view modes).
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ViewConfig {
    /// Switch to source mode before editing
    pub switch_to_source: bool,
    /// Restore the previous mode afterwards
    pub restore_previous: bool,
}

impl Config {
    pub fn trigger_delay(&self) -> Duration {
        Duration::from_millis(self.behavior.trigger_delay_ms)
    }
}

// ============================================================================
// Config Source Tracking
// ============================================================================

/// Source of a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// User global config (~/.config/automove/config.yaml)
    UserGlobal,
    /// Project manifest (.automove/config.yaml)
    ProjectManifest(String),
    /// Environment variable
    EnvVar(String),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::UserGlobal => write!(f, "~/.config/automove/config.yaml"),
            ConfigSource::ProjectManifest(path) => write!(f, "{}", path),
            ConfigSource::EnvVar(name) => write!(f, "${}", name),
        }
    }
}

// ============================================================================
// Environment Variable Registry
// ============================================================================

/// Environment variable definition for documentation.
pub struct EnvVar {
    pub name: &'static str,
    pub description: &'static str,
    pub default: &'static str,
    pub config_path: &'static str,
    pub values: Option<&'static str>,
}

pub const ENV_VARS: &[EnvVar] = &[
    EnvVar {
        name: "NO_COLOR",
        description: "Disable colored output (standard)",
        default: "unset",
        config_path: "-",
        values: Some("any non-empty value"),
    },
    EnvVar {
        name: "AUTOMOVE_DATE_FORMAT",
        description: "Timestamp pattern for completion markers",
        default: "YYYY-MM-DD HH:mm:ss",
        config_path: "tasks.date_format",
        values: None,
    },
    EnvVar {
        name: "AUTOMOVE_ICON",
        description: "Completion icon",
        default: "✅",
        config_path: "tasks.completion_icon",
        values: None,
    },
    EnvVar {
        name: "AUTOMOVE_HEADING",
        description: "Archive section heading",
        default: "## Completed Tasks",
        config_path: "archive.heading",
        values: None,
    },
    EnvVar {
        name: "AUTOMOVE_TRIGGER_DELAY",
        description: "Debounce before a watched change triggers a cycle (ms)",
        default: "500",
        config_path: "behavior.trigger_delay_ms",
        values: Some("milliseconds"),
    },
    EnvVar {
        name: "AUTOMOVE_AUTO_COMMIT",
        description: "Commit the document after mutations",
        default: "false",
        config_path: "behavior.auto_commit",
        values: Some("1, true, yes"),
    },
    EnvVar {
        name: "AUTOMOVE_QUIET",
        description: "Suppress hint messages",
        default: "false",
        config_path: "behavior.quiet",
        values: Some("1, true, yes"),
    },
];

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Parse a boolean environment variable (1/true/yes, 0/false/no).
pub fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| {
        if v.is_empty() {
            return None;
        }
        match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    })
}

/// Parse a string environment variable; `None` if unset or empty.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn env_u64(name: &str) -> Option<u64> {
    env_string(name).and_then(|v| v.parse().ok())
}

// ============================================================================
// Config Loading
// ============================================================================

pub const MANIFEST_FILE: &str = "config.yaml";

pub const CONFIG_DIR: &str = ".automove";

/// Result of loading configuration with source tracking.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Sources that contributed, in order of application
    pub sources: Vec<ConfigSource>,
}

/// Load configuration from defaults, user global, manifests between `root` and
/// `dir`, and environment variables.
pub fn load_config(root: &Path, dir: &Path) -> LoadedConfig {
    let mut config = Config::default();
    let mut sources = vec![ConfigSource::Default];

    if let Some(user_config_path) = user_config_path()
        && let Some(user_config) = load_manifest(&user_config_path)
    {
        merge(&mut config, &user_config);
        sources.push(ConfigSource::UserGlobal);
    }

    for path in collect_manifest_paths(root, dir) {
        if let Some(manifest_config) = load_manifest(&path) {
            let rel_path = path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| path.to_string_lossy().to_string());
            merge(&mut config, &manifest_config);
            sources.push(ConfigSource::ProjectManifest(rel_path));
        }
    }

    sources.extend(apply_env(&mut config));

    LoadedConfig { config, sources }
}

/// Apply AUTOMOVE_* overrides, returning one source entry per variable used.
pub fn apply_env(config: &mut Config) -> Vec<ConfigSource> {
    let mut applied = Vec::new();

    if let Some(v) = env_string("AUTOMOVE_DATE_FORMAT") {
        config.tasks.date_format = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_DATE_FORMAT".to_string()));
    }
    if let Some(v) = env_string("AUTOMOVE_ICON") {
        config.tasks.completion_icon = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_ICON".to_string()));
    }
    if let Some(v) = env_string("AUTOMOVE_HEADING") {
        config.archive.heading = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_HEADING".to_string()));
    }
    if let Some(v) = env_u64("AUTOMOVE_TRIGGER_DELAY") {
        config.behavior.trigger_delay_ms = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_TRIGGER_DELAY".to_string()));
    }
    if let Some(v) = env_bool("AUTOMOVE_AUTO_COMMIT") {
        config.behavior.auto_commit = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_AUTO_COMMIT".to_string()));
    }
    if let Some(v) = env_bool("AUTOMOVE_QUIET") {
        config.behavior.quiet = v;
        applied.push(ConfigSource::EnvVar("AUTOMOVE_QUIET".to_string()));
    }

    applied
}

/// ~/.config/automove/config.yaml
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("automove").join("config.yaml"))
}

/// Load a manifest file, returning None if it doesn't exist or can't be parsed.
pub fn load_manifest(path: &Path) -> Option<Config> {
    let content = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("ignoring unparsable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Manifest paths from `root` down to `dir` (inclusive), root first.
fn collect_manifest_paths(root: &Path, dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

    if !dir.starts_with(&root) {
        let manifest = root.join(CONFIG_DIR).join(MANIFEST_FILE);
        if manifest.exists() {
            paths.push(manifest);
        }
        return paths;
    }

    let mut current = root.clone();
    let rel_path = dir.strip_prefix(&root).unwrap_or(Path::new(""));

    let manifest = current.join(CONFIG_DIR).join(MANIFEST_FILE);
    if manifest.exists() {
        paths.push(manifest);
    }

    for component in rel_path.components() {
        current = current.join(component);
        let manifest = current.join(CONFIG_DIR).join(MANIFEST_FILE);
        if manifest.exists() {
            paths.push(manifest);
        }
    }

    paths
}

/// Merge overlay config into base config. Non-default overlay values win.
pub fn merge(base: &mut Config, overlay: &Config) {
    let default_tasks = TasksConfig::default();
    if overlay.tasks.date_format != default_tasks.date_format {
        base.tasks.date_format = overlay.tasks.date_format.clone();
    }
    if overlay.tasks.completion_icon != default_tasks.completion_icon {
        base.tasks.completion_icon = overlay.tasks.completion_icon.clone();
    }
    if overlay.tasks.reminder_icon != default_tasks.reminder_icon {
        base.tasks.reminder_icon = overlay.tasks.reminder_icon.clone();
    }

    let default_archive = ArchiveConfig::default();
    if overlay.archive.heading != default_archive.heading {
        base.archive.heading = overlay.archive.heading.clone();
    }
    if overlay.archive.auto_create != default_archive.auto_create {
        base.archive.auto_create = overlay.archive.auto_create;
    }
    if overlay.archive.add_separator != default_archive.add_separator {
        base.archive.add_separator = overlay.archive.add_separator;
    }

    let default_behavior = BehaviorConfig::default();
    if overlay.behavior.auto_move != default_behavior.auto_move {
        base.behavior.auto_move = overlay.behavior.auto_move;
    }
    if overlay.behavior.trigger_delay_ms != default_behavior.trigger_delay_ms {
        base.behavior.trigger_delay_ms = overlay.behavior.trigger_delay_ms;
    }
    if overlay.behavior.auto_commit != default_behavior.auto_commit {
        base.behavior.auto_commit = overlay.behavior.auto_commit;
    }
    if overlay.behavior.quiet != default_behavior.quiet {
        base.behavior.quiet = overlay.behavior.quiet;
    }

    let default_view = ViewConfig::default();
    if overlay.view.switch_to_source != default_view.switch_to_source {
        base.view.switch_to_source = overlay.view.switch_to_source;
    }
    if overlay.view.restore_previous != default_view.restore_previous {
        base.view.restore_previous = overlay.view.restore_previous;
    }
}

/// Generate JSON schema for the config.
pub fn json_schema() -> String {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

/// Every setting as a dotted key and its rendered value, in manifest order.
pub fn settings(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("tasks.date_format", config.tasks.date_format.clone()),
        ("tasks.completion_icon", config.tasks.completion_icon.clone()),
        ("tasks.reminder_icon", config.tasks.reminder_icon.clone()),
        ("archive.heading", config.archive.heading.clone()),
        ("archive.auto_create", config.archive.auto_create.to_string()),
        ("archive.add_separator", config.archive.add_separator.to_string()),
        ("behavior.auto_move", config.behavior.auto_move.to_string()),
        ("behavior.trigger_delay_ms", config.behavior.trigger_delay_ms.to_string()),
        ("behavior.auto_commit", config.behavior.auto_commit.to_string()),
        ("behavior.quiet", config.behavior.quiet.to_string()),
        ("view.switch_to_source", config.view.switch_to_source.to_string()),
        ("view.restore_previous", config.view.restore_previous.to_string()),
    ]
}

/// Environment variable overriding the setting at `key`, if any.
pub fn env_var_for(key: &str) -> Option<&'static EnvVar> {
    ENV_VARS.iter().find(|v| v.config_path == key)
}

pub fn is_quiet(config: &Config) -> bool {
    config.behavior.quiet
}

/// Template manifest with comments.
pub fn template_manifest() -> String {
    r###"# automove configuration manifest
# Place in .automove/config.yaml

# Completion markers
# tasks:
#   date_format: "YYYY-MM-DD HH:mm:ss"
#   completion_icon: "✅"
#   reminder_icon: "🔔"

# Archive section
# archive:
#   heading: "## Completed Tasks"
#   auto_create: true
#   add_separator: true

# Behavior
# behavior:
#   auto_move: true         # allow `automove watch`
#   trigger_delay_ms: 500
#   auto_commit: false
#   quiet: false

# View-mode switches for editor hosts
# view:
#   switch_to_source: false
#   restore_previous: false
"###
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes env var tests
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_MUTEX.lock().unwrap();

        let originals: Vec<_> = vars
            .iter()
            .map(|(k, _)| (*k, std::env::var(*k).ok()))
            .collect();

        for (k, v) in vars {
            // SAFETY: env access is serialized by ENV_MUTEX
            unsafe {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }

        let result = f();

        for (k, original) in originals {
            unsafe {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }

        result
    }

    #[test]
    fn test_env_bool() {
        let cases = vec![
            (Some("1"), Some(true)),
            (Some("TRUE"), Some(true)),
            (Some("yes"), Some(true)),
            (Some("0"), Some(false)),
            (Some("no"), Some(false)),
            (Some(""), None),
            (Some("maybe"), None),
            (None, None),
        ];

        for (value, want) in cases {
            with_env(&[("AUTOMOVE_TEST_BOOL", value)], || {
                assert_eq!(env_bool("AUTOMOVE_TEST_BOOL"), want, "env_bool({:?})", value);
            });
        }
    }

    #[test]
    fn test_apply_env_overrides() {
        let vars = [
            ("AUTOMOVE_DATE_FORMAT", Some("YYYY-MM-DD")),
            ("AUTOMOVE_ICON", None),
            ("AUTOMOVE_HEADING", Some("## Done")),
            ("AUTOMOVE_TRIGGER_DELAY", Some("250")),
            ("AUTOMOVE_AUTO_COMMIT", None),
            ("AUTOMOVE_QUIET", Some("yes")),
        ];
        with_env(&vars, || {
            let mut config = Config::default();
            let sources = apply_env(&mut config);
            assert_eq!(config.tasks.date_format, "YYYY-MM-DD");
            assert_eq!(config.tasks.completion_icon, "✅");
            assert_eq!(config.archive.heading, "## Done");
            assert_eq!(config.trigger_delay(), Duration::from_millis(250));
            assert!(config.behavior.quiet);
            assert_eq!(sources.len(), 4);
        });
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.tasks.date_format, "YYYY-MM-DD HH:mm:ss");
        assert_eq!(config.tasks.completion_icon, "✅");
        assert_eq!(config.archive.heading, "## Completed Tasks");
        assert!(config.archive.auto_create);
        assert!(config.archive.add_separator);
        assert!(config.behavior.auto_move);
        assert_eq!(config.behavior.trigger_delay_ms, 500);
        assert!(!config.view.switch_to_source);
    }

    #[test]
    fn test_partial_manifest_parses_with_defaults() {
        let yaml = "archive:\n  heading: '## Done'\nbehavior:\n  trigger_delay_ms: 100\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.archive.heading, "## Done");
        assert!(config.archive.auto_create, "unset fields keep defaults");
        assert_eq!(config.behavior.trigger_delay_ms, 100);
        assert_eq!(config.tasks, TasksConfig::default());
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = Config::default();
        let mut overlay = Config::default();
        overlay.archive.heading = "## Archive".to_string();
        overlay.archive.add_separator = false;

        merge(&mut base, &overlay);

        assert_eq!(base.archive.heading, "## Archive");
        assert!(!base.archive.add_separator);
        assert_eq!(base.tasks.completion_icon, "✅");
    }

    #[test]
    fn test_merge_defaults_preserved() {
        let mut base = Config::default();
        base.tasks.completion_icon = "✔".to_string();
        merge(&mut base, &Config::default());
        assert_eq!(base.tasks.completion_icon, "✔", "default overlay changes nothing");
    }

    #[test]
    fn test_manifest_walk_from_root_to_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let nested = root.join("notes").join("work");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(root.join(CONFIG_DIR)).unwrap();
        fs::create_dir_all(nested.join(CONFIG_DIR)).unwrap();
        fs::write(
            root.join(CONFIG_DIR).join(MANIFEST_FILE),
            "archive:\n  heading: '## Root'\ntasks:\n  completion_icon: '✔'\n",
        )
        .unwrap();
        fs::write(
            nested.join(CONFIG_DIR).join(MANIFEST_FILE),
            "archive:\n  heading: '## Work'\n",
        )
        .unwrap();

        let paths = collect_manifest_paths(root, &nested);
        assert_eq!(paths.len(), 2);

        let mut config = Config::default();
        for path in &paths {
            merge(&mut config, &load_manifest(path).unwrap());
        }
        assert_eq!(config.archive.heading, "## Work", "deeper manifest wins");
        assert_eq!(config.tasks.completion_icon, "✔");
    }

    #[test]
    fn test_json_schema_generates() {
        let schema = json_schema();
        assert!(schema.contains("ArchiveConfig"));
        assert!(schema.contains("date_format"));
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Default.to_string(), "default");
        assert_eq!(
            ConfigSource::EnvVar("AUTOMOVE_ICON".to_string()).to_string(),
            "$AUTOMOVE_ICON"
        );
        assert_eq!(
            ConfigSource::ProjectManifest(".automove/config.yaml".to_string()).to_string(),
            ".automove/config.yaml"
        );
    }

    #[test]
    fn test_settings_cover_every_env_var() {
        let keys: Vec<&str> = settings(&Config::default()).iter().map(|(k, _)| *k).collect();
        for var in ENV_VARS.iter().filter(|v| v.config_path != "-") {
            assert!(
                keys.contains(&var.config_path),
                "{} maps to unknown key {}",
                var.name,
                var.config_path
            );
        }
        assert_eq!(
            env_var_for("archive.heading").map(|v| v.name),
            Some("AUTOMOVE_HEADING")
        );
        assert!(env_var_for("view.restore_previous").is_none());
    }

    #[test]
    fn test_template_manifest() {
        let template = template_manifest();
        assert!(template.contains("# automove configuration manifest"));
        assert!(template.contains("archive:"));
        assert!(
            template.contains("#   heading: \"## Completed Tasks\"\n#   auto_create: true"),
            "quoted heading survives intact"
        );
        assert!(template.contains("behavior:"));
    }
}
