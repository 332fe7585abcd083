//! Reading and writing raw lists and built indexes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::debug;

use specindex_shared::{RawSpec, Result, SpecEntry, SpecIndexError};

/// Load a raw input list (JSON array of locators or override objects).
pub fn load_raw_list(path: &Path) -> Result<Vec<RawSpec>> {
    read_json(path)
}

/// Load a previously built index.
pub fn load_index(path: &Path) -> Result<Vec<SpecEntry>> {
    read_json(path)
}

/// Serialize an index the way it is published: pretty JSON plus a trailing
/// newline. Identical indexes render to identical bytes.
pub fn render_index(index: &[SpecEntry]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(index)
        .map_err(|e| SpecIndexError::validation(format!("JSON serialization failed: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Write `content` to `path` through a synced temp file and a rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SpecIndexError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| SpecIndexError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = File::create(&temp).map_err(|e| SpecIndexError::io(&temp, e))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| SpecIndexError::io(&temp, e))?;
    drop(file);
    std::fs::rename(&temp, path).map_err(|e| SpecIndexError::io(path, e))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

/// SHA-256 hex digest of `content`.
pub fn digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| SpecIndexError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| SpecIndexError::parse(format!("invalid JSON in {}: {e}", path.display())))
}
