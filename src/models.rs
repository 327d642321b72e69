//! Core data models used throughout the harvester.
//!
//! These types describe what a harvest reads (sources and the entries found
//! while walking them) and what it reports back ([`HarvestResult`]).

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::PathBuf;

/// Whether a walked node is a file, a directory, or something else the
/// hosted API reports (symlinks, submodules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// Where the bytes of an entry can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentLocator {
    /// Direct download URL for a remote entry.
    Url(String),
    /// Absolute (or caller-rooted) path of a local file.
    Path(PathBuf),
    /// The listing did not provide a location.
    Missing,
}

/// One node discovered during a tree walk.
///
/// `path` is slash-separated and relative to the walk root. It never starts
/// with the root's own name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub locator: ContentLocator,
}

impl Entry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One record of a hosted-API directory listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

impl From<RemoteEntry> for Entry {
    fn from(remote: RemoteEntry) -> Self {
        let kind = match remote.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            _ => EntryKind::Other,
        };
        let locator = match remote.download_url {
            Some(url) if !url.is_empty() => ContentLocator::Url(url),
            _ => ContentLocator::Missing,
        };
        Entry {
            name: remote.name,
            path: remote.path.trim_start_matches('/').to_string(),
            kind,
            locator,
        }
    }
}

/// Bytes of a matched entry, plus the file metadata when they came from disk.
#[derive(Debug)]
pub struct Content {
    pub bytes: Vec<u8>,
    pub metadata: Option<Metadata>,
}

impl Content {
    pub fn remote(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            metadata: None,
        }
    }

    pub fn local(bytes: Vec<u8>, metadata: Metadata) -> Self {
        Self {
            bytes,
            metadata: Some(metadata),
        }
    }
}

/// One user-specified origin tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A directory on the local filesystem.
    Local { root: PathBuf },
    /// An `org/repo` pair reachable through the hosted API.
    Remote { org: String, repo: String },
    /// A clonable URL; materialized into a `Local` source before walking.
    GitUrl { url: String },
}

impl Source {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Source::Local { .. } => "local",
            Source::Remote { .. } => "remote",
            Source::GitUrl { .. } => "git",
        }
    }

    /// The root reference as the user would recognise it.
    pub fn reference(&self) -> String {
        match self {
            Source::Local { root } => root.display().to_string(),
            Source::Remote { org, repo } => format!("{}/{}", org, repo),
            Source::GitUrl { url } => url.clone(),
        }
    }
}

/// A [`Source`] together with the name used for progress messages and as
/// its namespace inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSource {
    pub token: String,
    pub source: Source,
    pub display_name: String,
}

/// A source that failed as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

/// Process-wide tally of one harvest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestResult {
    /// Files handed to the sink successfully.
    pub delivered: usize,
    /// Matched files that were skipped after a fetch or sink failure.
    pub skipped_files: usize,
    pub failed_sources: Vec<SourceFailure>,
}

impl HarvestResult {
    pub fn record_source_failure(&mut self, source: &str, error: &anyhow::Error) {
        self.failed_sources.push(SourceFailure {
            source: source.to_string(),
            error: format!("{:#}", error),
        });
    }
}
