//! Flat-file example store.
//!
//! The serving path only reads. Writes come from the authoring command and
//! always replace the whole file through a temp file + rename.

use super::Example;
use crate::error::{Result, TldwError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Load all examples from `path`.
///
/// A missing file is [`TldwError::NotFound`]; malformed JSON is a parse error.
#[instrument]
pub fn load(path: &Path) -> Result<Vec<Example>> {
    if !path.exists() {
        return Err(TldwError::NotFound(format!(
            "No example store found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let examples: Vec<Example> = serde_json::from_str(&content)?;
    debug!("Loaded {} examples", examples.len());

    let mut seen = std::collections::HashSet::new();
    for example in &examples {
        if !seen.insert(example.link.as_str()) {
            warn!("Duplicate link in example store: {}", example.link);
        }
    }

    Ok(examples)
}

/// Load the store, treating a missing file as empty.
fn load_or_empty(path: &Path) -> Result<Vec<Example>> {
    match load(path) {
        Err(TldwError::NotFound(_)) => Ok(Vec::new()),
        other => other,
    }
}

/// Whether the store at `path` already holds `link`.
pub fn contains(path: &Path, link: &str) -> Result<bool> {
    Ok(load_or_empty(path)?.iter().any(|e| e.link == link))
}

/// Append one example, creating the store if needed.
///
/// A duplicate link fails with [`TldwError::DuplicateLink`] and leaves the
/// file untouched. Returns the new number of examples.
#[instrument(skip(example), fields(link = %example.link))]
pub fn append(path: &Path, example: Example) -> Result<usize> {
    let mut examples = load_or_empty(path)?;

    if examples.iter().any(|e| e.link == example.link) {
        return Err(TldwError::DuplicateLink(example.link));
    }

    examples.push(example);
    write_atomic(path, &examples)?;

    Ok(examples.len())
}

fn write_atomic(path: &Path, examples: &[Example]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    examples.serialize(&mut ser)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TldwError::Io(e.error))?;

    Ok(())
}
