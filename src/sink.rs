//! Built-in [`Sink`] implementations.
//!
//! - [`FeedSink`] copies each match into a destination tree, swapping the
//!   matched suffix for a replacement (`x.repo.feed-out.md` →
//!   `x.feed-in.md`).
//! - [`ArchiveSink`] bundles matches into one zip, namespacing each entry
//!   under its source's display name (`<source>/<relative path>`).

use anyhow::{Context, Result};
use chrono::{Datelike, Timelike, Utc};
use std::fs::{File, Metadata};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::HarvestError;
use crate::models::{Content, Entry};
use crate::traits::Sink;

// ═══════════════════════════════════════════════════════════════════════
// Filesystem sink
// ═══════════════════════════════════════════════════════════════════════

/// Writes matches under `root`, renaming them on the way.
pub struct FeedSink {
    root: PathBuf,
    strip_suffix: String,
    append_suffix: String,
}

impl FeedSink {
    pub fn new(
        root: impl Into<PathBuf>,
        strip_suffix: impl Into<String>,
        append_suffix: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            strip_suffix: strip_suffix.into(),
            append_suffix: append_suffix.into(),
        }
    }

    /// Destination of a matched entry's relative path.
    ///
    /// # Errors
    ///
    /// [`HarvestError::MalformedMatch`] when `entry_path` does not end with
    /// the stripped suffix, [`HarvestError::UnsafePath`] when the renamed
    /// path would leave `root`.
    pub fn destination_for(&self, entry_path: &str) -> Result<PathBuf> {
        let base = entry_path.strip_suffix(&self.strip_suffix).ok_or_else(|| {
            HarvestError::MalformedMatch {
                path: entry_path.to_string(),
                suffix: self.strip_suffix.clone(),
            }
        })?;
        let renamed = format!("{}{}", base, self.append_suffix);

        let mut dest = self.root.clone();
        for segment in renamed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
            {
                return Err(HarvestError::UnsafePath { path: renamed }.into());
            }
            dest.push(segment);
        }
        Ok(dest)
    }
}

impl Sink for FeedSink {
    fn deliver(&mut self, _source: &str, entry: &Entry, content: &Content) -> Result<String> {
        let dest = self.destination_for(&entry.path)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&dest, &content.bytes)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(dest.display().to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Archive sink
// ═══════════════════════════════════════════════════════════════════════

/// Appends matches to one open zip archive.
///
/// Every entry is deflated. Entries read from disk keep the file's
/// modification time and Unix permissions; downloaded entries get a fixed
/// 1980-01-01 timestamp and no permissions so repeated bundles of the same
/// content are identical.
pub struct ArchiveSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    written: usize,
}

impl ArchiveSink<File> {
    /// Create (or truncate) the archive file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create archive {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek> ArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            written: 0,
        }
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Write the central directory and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .finish()
            .context("Failed to finalize archive")
    }
}

impl<W: Write + Seek + Send> Sink for ArchiveSink<W> {
    fn deliver(&mut self, source: &str, entry: &Entry, content: &Content) -> Result<String> {
        let name = archive_path(source, &entry.path);
        let options = entry_options(content.metadata.as_ref());

        self.writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("Failed to start archive entry {}", name))?;
        self.writer
            .write_all(&content.bytes)
            .with_context(|| format!("Failed to write archive entry {}", name))?;

        self.written += 1;
        Ok(name)
    }
}

/// `<source>/<relative path>`, always with `/` separators.
pub fn archive_path(source: &str, entry_path: &str) -> String {
    format!(
        "{}/{}",
        source.trim_end_matches('/'),
        entry_path.trim_start_matches('/')
    )
}

fn entry_options(metadata: Option<&Metadata>) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    match metadata {
        None => options.last_modified_time(zip::DateTime::default()),
        Some(meta) => with_permissions(options.last_modified_time(modified_time(meta)), meta),
    }
}

fn modified_time(meta: &Metadata) -> zip::DateTime {
    meta.modified()
        .ok()
        .map(chrono::DateTime::<Utc>::from)
        .and_then(|t| {
            zip::DateTime::from_date_and_time(
                u16::try_from(t.year()).ok()?,
                t.month() as u8,
                t.day() as u8,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

#[cfg(unix)]
fn with_permissions(options: SimpleFileOptions, meta: &Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn with_permissions(options: SimpleFileOptions, _meta: &Metadata) -> SimpleFileOptions {
    options
}
