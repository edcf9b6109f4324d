//! Temp directory naming and housekeeping.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::config::TempDirNaming;
use super::error::PipelineError;
use crate::adapter::MediaMetadata;

/// Prefix of identifier-named temp directories.
pub const IDENTIFIER_PREFIX: &str = "yayd_temp_";
/// Prefix of title-named temp directories.
pub const TITLE_PREFIX: &str = "temp_";

/// Strips characters that are invalid in file names on common platforms.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    cleaned.trim().trim_end_matches('.').trim_end().to_string()
}

/// Temp directory for a probed item, inside `parent`.
///
/// Falls back to the other naming when the preferred key is missing.
/// Returns `None` when the probe produced neither an id nor a title.
pub fn temp_dir_for(
    parent: &Path,
    naming: TempDirNaming,
    metadata: &MediaMetadata,
) -> Option<PathBuf> {
    let id = metadata
        .id
        .as_deref()
        .map(sanitize_title)
        .filter(|s| !s.is_empty());
    let title = metadata
        .title
        .as_deref()
        .map(sanitize_title)
        .filter(|s| !s.is_empty());

    let name = match naming {
        TempDirNaming::Identifier => id
            .map(|id| format!("{}{}", IDENTIFIER_PREFIX, id))
            .or_else(|| title.map(|t| format!("{}{}", TITLE_PREFIX, t))),
        TempDirNaming::Title => title
            .map(|t| format!("{}{}", TITLE_PREFIX, t))
            .or_else(|| id.map(|id| format!("{}{}", IDENTIFIER_PREFIX, id))),
    }?;
    Some(parent.join(name))
}

fn is_temp_dir_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(IDENTIFIER_PREFIX) || n.starts_with(TITLE_PREFIX))
        .unwrap_or(false)
}

/// Removes a temp directory left behind by an interrupted job.
///
/// Refuses anything not named like a temp directory, paths with `..`, and
/// directories whose resolved parent is not one of `roots`.
pub async fn remove_stale_temp_dir(path: &Path, roots: &[PathBuf]) -> Result<(), PipelineError> {
    let has_parent_ref = path.components().any(|c| c == Component::ParentDir);
    if has_parent_ref || !is_temp_dir_name(path) {
        return Err(PipelineError::NotATempDir(path.to_path_buf()));
    }

    let resolved = match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PipelineError::TempDirNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    // A symlink named like a temp dir must not lead anywhere else.
    if !is_temp_dir_name(&resolved) || !tokio::fs::metadata(&resolved).await?.is_dir() {
        return Err(PipelineError::NotATempDir(path.to_path_buf()));
    }

    let parent = resolved.parent();
    let mut allowed = false;
    for root in roots {
        if let Ok(root) = tokio::fs::canonicalize(root).await {
            if parent == Some(root.as_path()) {
                allowed = true;
                break;
            }
        }
    }
    if !allowed {
        return Err(PipelineError::OutsideOutputDirs(path.to_path_buf()));
    }

    tokio::fs::remove_dir_all(&resolved).await?;
    info!(path = %resolved.display(), "Removed stale temp directory");
    Ok(())
}
