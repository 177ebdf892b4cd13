//! Data store loading.
//!
//! Every `*.json` and `*.toml` file under the data root contributes its
//! top-level keys to one global [`DataMapping`]. Nested objects stay nested,
//! so templates reach them with dot notation (`{{ metadata.title }}`).
//!
//! ## Merge Order
//!
//! Files are parsed in parallel but merged sequentially in lexicographic
//! order of their root-relative path. The merge is a shallow overwrite: when
//! two files define the same top-level key, the later path's value replaces
//! the earlier one wholesale.
//!
//! ```text
//! store/
//! ├── a.json      {"metadata": {"title": "A", "lang": "en"}}
//! └── b.json      {"metadata": {"title": "B"}}
//!
//! result          {"metadata": {"title": "B"}}
//! ```

use rayon::prelude::*;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::error::SourceError;
use crate::scan::{self, SourceFile, SourceKind};

/// String-keyed tree of structured values handed to templates.
pub type DataMapping = Map<String, Value>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("data path `{path}` does not resolve to a sequence (found {found})")]
    Path { path: String, found: &'static str },
    #[error("invalid query: {0}")]
    Query(String),
}

/// Load and merge every data file under `dir`.
pub fn load(dir: &Path) -> Result<DataMapping, DataError> {
    let files = scan::scan_root(dir, SourceKind::DataSource)?;
    merge_sources(&files)
}

/// Parse the given data files and merge them in the order given.
///
/// Callers pass files sorted by relative path (the order the scan produces).
pub fn merge_sources(files: &[SourceFile]) -> Result<DataMapping, DataError> {
    let parsed: Vec<DataMapping> = files
        .par_iter()
        .map(|f| parse_file(&f.path))
        .collect::<Result<_, _>>()?;

    let mut merged = DataMapping::new();
    for (file, mapping) in files.iter().zip(parsed) {
        for (key, value) in mapping {
            if merged.contains_key(&key) {
                debug!(key = %key, path = %file.path.display(), "data key overwritten");
            }
            merged.insert(key, value);
        }
    }
    Ok(merged)
}

/// Parse one data file; its top level must be an object/table.
pub fn parse_file(path: &Path) -> Result<DataMapping, SourceError> {
    let content = fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .map_err(|e| SourceError::new(path, format!("invalid TOML: {e}")))?,
        _ => serde_json::from_str(&content)
            .map_err(|e| SourceError::new(path, format!("invalid JSON: {e}")))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SourceError::new(
            path,
            format!("top level must be an object, found {}", kind_name(&other)),
        )),
    }
}

/// Follow a dot-separated path (`metadata.links`) through nested objects.
///
/// Numeric segments index into arrays. An empty path yields `None`.
pub fn lookup<'a>(mapping: &'a DataMapping, dot_path: &str) -> Option<&'a Value> {
    let mut segments = dot_path.split('.').filter(|s| !s.is_empty());
    let mut current = mapping.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Human name for a JSON value's type, used in error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
