use anyhow::{bail, Context, Result};
use globset::GlobSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::models::{ContentLocator, Entry, EntryKind};

/// Walk a local directory and produce one [`Entry`] per file.
///
/// Depth-first, siblings in name order. Any walk error aborts the whole
/// walk, so a source either yields its full entry list or fails as a unit.
/// Files whose relative path matches `excludes` are left out.
///
/// Symlinks that resolve to a regular file count as files and are read
/// through the link. When `root` is itself a file, the single entry's path
/// is its file name.
pub fn walk_local(root: &Path, excludes: &GlobSet) -> Result<Vec<Entry>> {
    if !root.exists() {
        bail!("Local source does not exist: {}", root.display());
    }

    let mut entries = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = if relative.as_os_str().is_empty() {
            entry.file_name().to_string_lossy().to_string()
        } else {
            relative_slash_path(relative)
        };

        if excludes.is_match(&rel_str) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let kind = if entry.file_type().is_file() || resolves_to_file(&entry) {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        entries.push(Entry {
            name,
            path: rel_str,
            kind,
            locator: ContentLocator::Path(path.to_path_buf()),
        });
    }

    Ok(entries)
}

fn resolves_to_file(entry: &walkdir::DirEntry) -> bool {
    entry.path_is_symlink()
        && std::fs::metadata(entry.path())
            .map(|meta| meta.is_file())
            .unwrap_or(false)
}

/// Render a relative path with `/` separators regardless of platform.
fn relative_slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
