//! Build settings.
//!
//! Handles loading, validating, and merging the project's `config.toml`.
//! Stock defaults describe the conventional directory layout; a user file
//! only needs the keys it wants to change.
//!
//! ## Default Layout
//!
//! ```text
//! project/
//! ├── config.toml                   # Build settings (optional)
//! └── src/
//!     ├── store/                    # Structured data (*.json, *.toml)
//!     └── theme/
//!         ├── markdown/
//!         │   ├── articles/         # One route per markdown file
//!         │   └── partials/         # Dot-keyed HTML fragments
//!         └── views/                # Template search root
//!             ├── home.jinja        # Route "" (optional)
//!             ├── pages/            # One route per template
//!             └── articles/         # layout.jinja per directory
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! output_dir = "dist"
//! template_search_roots = ["src/theme/views"]
//! orphan_directories = "error"   # or "descend"
//!
//! [feed]
//! enabled = true
//! title = "My Site"
//! link = "https://example.com"
//!
//! [document]
//! wrap = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the settings file at the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build settings loaded from `config.toml`.
///
/// All paths are relative to the project root passed to [`load_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Directory the finished site is published to.
    pub output_dir: String,
    /// Templates under this root become static page routes.
    pub pages_root: String,
    /// Markdown files under this root become article routes.
    pub articles_content_root: String,
    /// Mirror of the articles tree holding `layout.jinja` files.
    pub articles_views_root: String,
    /// Markdown fragments exposed to templates by dot-notation key.
    pub partials_root: String,
    /// Structured data merged into the global template scope.
    pub data_root: String,
    /// Template lookup roots; each is expanded to include every subdirectory.
    pub template_search_roots: Vec<String>,
    /// Template rendered at the site root, skipped when the file is absent.
    pub home_template: Option<String>,
    /// Origin prepended to article routes to build absolute links.
    pub url_origin: Option<String>,
    /// What to do with a pages subdirectory that has no sibling template.
    pub orphan_directories: OrphanPolicy,
    /// Render articles marked `draft` in their front matter.
    pub include_drafts: bool,
    pub feed: FeedConfig,
    pub document: DocumentConfig,
    pub processing: ProcessingConfig,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output_dir: "dist".to_string(),
            pages_root: "src/theme/views/pages".to_string(),
            articles_content_root: "src/theme/markdown/articles".to_string(),
            articles_views_root: "src/theme/views/articles".to_string(),
            partials_root: "src/theme/markdown/partials".to_string(),
            data_root: "src/store".to_string(),
            template_search_roots: vec!["src/theme/views".to_string()],
            home_template: Some("src/theme/views/home.jinja".to_string()),
            url_origin: None,
            orphan_directories: OrphanPolicy::default(),
            include_drafts: false,
            feed: FeedConfig::default(),
            document: DocumentConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl BuildSettings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.template_search_roots.is_empty() {
            return Err(ConfigError::Validation(
                "template_search_roots must not be empty".into(),
            ));
        }
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        if self.feed.max_items == Some(0) {
            return Err(ConfigError::Validation(
                "feed.max_items must be at least 1".into(),
            ));
        }
        let output = normalize(Path::new(&self.output_dir));
        if output.components().all(|c| c == Component::ParentDir) {
            return Err(ConfigError::Validation(format!(
                "output_dir \"{}\" is the project root or one of its parents",
                self.output_dir
            )));
        }
        self.roots(Path::new("")).check_output()
    }

    /// Resolve every configured path against the project root.
    pub fn roots(&self, project_root: &Path) -> SourceRoots {
        let join = |rel: &str| project_root.join(rel);
        SourceRoots {
            project: project_root.to_path_buf(),
            output: join(&self.output_dir),
            pages: join(&self.pages_root),
            articles_content: join(&self.articles_content_root),
            articles_views: join(&self.articles_views_root),
            partials: join(&self.partials_root),
            data: join(&self.data_root),
            template_search: self.template_search_roots.iter().map(|r| join(r)).collect(),
            home: self.home_template.as_deref().map(join),
        }
    }
}

/// Absolute (project-joined) locations of every source root.
#[derive(Debug, Clone)]
pub struct SourceRoots {
    pub project: PathBuf,
    pub output: PathBuf,
    pub pages: PathBuf,
    pub articles_content: PathBuf,
    pub articles_views: PathBuf,
    pub partials: PathBuf,
    pub data: PathBuf,
    pub template_search: Vec<PathBuf>,
    pub home: Option<PathBuf>,
}

impl SourceRoots {
    /// Every source root paired with its config key.
    fn sources(&self) -> Vec<(&'static str, &Path)> {
        let mut sources = vec![
            ("pages_root", self.pages.as_path()),
            ("articles_content_root", self.articles_content.as_path()),
            ("articles_views_root", self.articles_views.as_path()),
            ("partials_root", self.partials.as_path()),
            ("data_root", self.data.as_path()),
        ];
        sources.extend(
            self.template_search
                .iter()
                .map(|root| ("template_search_roots", root.as_path())),
        );
        if let Some(home) = &self.home {
            sources.push(("home_template", home.as_path()));
        }
        sources
    }

    /// Reject an output directory whose replacement on publish would
    /// delete the project or any source root.
    ///
    /// Paths are compared lexically; pass roots built from a canonical
    /// project path to also catch absolute `output_dir` values.
    pub fn check_output(&self) -> Result<(), ConfigError> {
        let output = normalize(&self.output);
        if normalize(&self.project).starts_with(&output) {
            return Err(ConfigError::Validation(format!(
                "output_dir {} contains the project root",
                self.output.display()
            )));
        }
        for (key, source) in self.sources() {
            let source = normalize(source);
            if source.starts_with(&output) || output.starts_with(&source) {
                return Err(ConfigError::Validation(format!(
                    "output_dir {} overlaps {key} {}",
                    self.output.display(),
                    source.display()
                )));
            }
        }
        Ok(())
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Policy for a pages subdirectory without a same-named sibling template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Fail the build with an ambiguous-route error.
    #[default]
    Error,
    /// Emit the nested routes and no index route for the directory.
    Descend,
}

/// Syndication feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub enabled: bool,
    /// Keep only the newest N items. Absent means no limit.
    pub max_items: Option<usize>,
    pub title: String,
    /// Absolute site link; item links are built by appending routes to it.
    pub link: String,
    pub description: String,
    pub language: String,
    /// Feed file location relative to the output directory.
    pub output: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_items: None,
            title: String::new(),
            link: String::new(),
            description: String::new(),
            language: "en".to_string(),
            output: "feed.xml".to_string(),
        }
    }
}

/// HTML document chrome wrapped around every rendered template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// When false, templates are written exactly as rendered.
    pub wrap: bool,
    pub styles_link: String,
    pub favicon_link: String,
    pub script_link: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            wrap: true,
            styles_link: "/static/styles/main.css".to_string(),
            favicon_link: "/favicon.ico".to_string(),
            script_link: "/static/scripts/main.js".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel scan/render workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Used as the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(BuildSettings::default())
        .map_err(|e| ConfigError::Validation(format!("default settings: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildSettings, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let settings: BuildSettings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load build settings for the project at `root`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<BuildSettings, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quire build settings
# ====================
# All settings are optional. Values shown below are the defaults.
# Paths are relative to the directory holding this file.
# Unknown keys will cause an error.

# Where the finished site is published. Builds render into a sibling
# staging directory and only replace this one when everything succeeded.
output_dir = "dist"

# Every template under pages_root becomes a route (extension stripped).
# A directory `blog/` needs a sibling `blog.jinja` acting as its index.
pages_root = "src/theme/views/pages"

# Every markdown file under articles_content_root becomes a route and is
# rendered through the nearest layout.jinja in the mirrored views tree.
articles_content_root = "src/theme/markdown/articles"
articles_views_root = "src/theme/views/articles"

# Markdown fragments, exposed as {{ collections.quotes.my_quote }}.
partials_root = "src/theme/markdown/partials"

# JSON/TOML files merged into the global scope (later paths win).
data_root = "src/store"

# Template lookup roots. Each is expanded to all of its subdirectories,
# so includes and imports resolve from anywhere below.
template_search_roots = ["src/theme/views"]

# Rendered to the site root when present.
home_template = "src/theme/views/home.jinja"

# Prefix for absolute article links (e.g. "https://example.com").
# url_origin = ""

# "error": a pages directory without a sibling template fails the build.
# "descend": its nested routes are emitted without an index page.
orphan_directories = "error"

# Render articles whose front matter sets "draft": true.
include_drafts = false

# ---------------------------------------------------------------------------
# RSS feed
# ---------------------------------------------------------------------------
[feed]
enabled = false
# Keep only the newest N items (omit for no limit).
# max_items = 20
title = ""
link = ""
description = ""
language = "en"
output = "feed.xml"

# ---------------------------------------------------------------------------
# Document chrome (doctype, <head>, closing script tag)
# ---------------------------------------------------------------------------
[document]
wrap = true
styles_link = "/static/styles/main.css"
favicon_link = "/favicon.ico"
script_link = "/static/scripts/main.js"

# ---------------------------------------------------------------------------
# Parallelism
# ---------------------------------------------------------------------------
[processing]
# Max parallel workers for scanning and rendering (omit for auto = CPU cores).
# max_processes = 4
"##
}
