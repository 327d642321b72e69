//! Harvest orchestration.
//!
//! Drives classify → walk → filter → fetch → sink for each source in the
//! order given, and tallies the outcome in a [`HarvestResult`].
//!
//! Failures stay inside the unit where they happen:
//!
//! | Unit | Example | Effect |
//! |------|---------|--------|
//! | source | clone fails, root listing fails, local walk error | source skipped, recorded in `failed_sources` |
//! | file | download fails, sink write fails, malformed match | file skipped, counted in `skipped_files` |
//! | subtree | nested remote listing fails | subtree omitted silently (see [`walk_remote`]) |
//!
//! Nothing is retried, and [`Harvester::run`] itself never fails.
//!
//! Each source gets its own namespace for the run. When two sources share a
//! display name (`a/tools` and `b/tools`), the later ones become `tools-2`,
//! `tools-3`, and so on.

use anyhow::{Context, Result};
use globset::GlobSet;
use std::collections::HashSet;
use tempfile::TempDir;

use crate::connector_fs::walk_local;
use crate::connector_github::walk_remote;
use crate::error::HarvestError;
use crate::filter::SuffixFilter;
use crate::models::{ClassifiedSource, Content, ContentLocator, Entry, HarvestResult, Source};
use crate::progress::{HarvestEvent, HarvestReporter};
use crate::traits::{RepoBackend, Sink};

/// Runs harvests against one backend with one suffix filter.
pub struct Harvester<'a> {
    backend: &'a dyn RepoBackend,
    filter: SuffixFilter,
    excludes: GlobSet,
    reporter: &'a dyn HarvestReporter,
}

/// Entries of one source, plus the scratch clone they live in (if any).
struct Walked {
    entries: Vec<Entry>,
    _scratch: Option<TempDir>,
}

impl<'a> Harvester<'a> {
    pub fn new(
        backend: &'a dyn RepoBackend,
        filter: SuffixFilter,
        reporter: &'a dyn HarvestReporter,
    ) -> Self {
        Self {
            backend,
            filter,
            excludes: GlobSet::empty(),
            reporter,
        }
    }

    /// Skip local files whose relative path matches `excludes`.
    pub fn with_excludes(mut self, excludes: GlobSet) -> Self {
        self.excludes = excludes;
        self
    }

    /// Harvest every source into `sink`, sequentially.
    pub async fn run(&self, sources: &[ClassifiedSource], sink: &mut dyn Sink) -> HarvestResult {
        let mut result = HarvestResult::default();
        let mut taken = HashSet::new();
        for source in sources {
            let namespace = unique_namespace(namespace_of(source), &mut taken);
            self.harvest_source(source, namespace, sink, &mut result).await;
        }
        result
    }

    async fn harvest_source(
        &self,
        source: &ClassifiedSource,
        namespace: String,
        sink: &mut dyn Sink,
        result: &mut HarvestResult,
    ) {
        self.reporter.report(HarvestEvent::SourceStarted {
            source: namespace.clone(),
            kind: source.source.kind_label(),
            reference: source.source.reference(),
        });

        let walked = match self.walk(source).await {
            Ok(walked) => walked,
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", source.token, e);
                result.record_source_failure(&source.token, &e);
                self.reporter.report(HarvestEvent::SourceFailed {
                    source: namespace,
                    error: format!("{:#}", e),
                });
                return;
            }
        };

        let matches = walked.entries.iter().filter(|e| self.filter.matches(e));
        for entry in matches {
            match self.deliver(&namespace, entry, sink).await {
                Ok(destination) => {
                    result.delivered += 1;
                    self.reporter.report(HarvestEvent::Delivered {
                        source: namespace.clone(),
                        path: entry.path.clone(),
                        destination,
                    });
                }
                Err(e) => {
                    tracing::warn!("failed to harvest {}:{}: {:#}", namespace, entry.path, e);
                    result.skipped_files += 1;
                    self.reporter.report(HarvestEvent::FileSkipped {
                        source: namespace.clone(),
                        path: entry.path.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }
    }

    async fn walk(&self, source: &ClassifiedSource) -> Result<Walked> {
        match &source.source {
            Source::Local { root } => Ok(Walked {
                entries: walk_local(root, &self.excludes)?,
                _scratch: None,
            }),
            Source::Remote { org, repo } => Ok(Walked {
                entries: walk_remote(self.backend, org, repo).await?,
                _scratch: None,
            }),
            Source::GitUrl { url } => {
                let scratch = tempfile::Builder::new()
                    .prefix("harvest-clone-")
                    .tempdir()
                    .context("Failed to create scratch directory")?;
                let checkout = scratch.path().join("checkout");
                self.backend
                    .clone_shallow(url, &checkout)
                    .await
                    .with_context(|| format!("Failed to clone {}", url))?;
                Ok(Walked {
                    entries: walk_local(&checkout, &self.excludes)?,
                    _scratch: Some(scratch),
                })
            }
        }
    }

    async fn deliver(&self, namespace: &str, entry: &Entry, sink: &mut dyn Sink) -> Result<String> {
        let content = self.fetch(entry).await?;
        sink.deliver(namespace, entry, &content)
    }

    async fn fetch(&self, entry: &Entry) -> Result<Content> {
        match &entry.locator {
            ContentLocator::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let metadata = tokio::fs::metadata(path)
                    .await
                    .with_context(|| format!("Failed to stat {}", path.display()))?;
                Ok(Content::local(bytes, metadata))
            }
            ContentLocator::Url(url) => {
                let bytes = self.backend.download_content(url).await?;
                Ok(Content::remote(bytes))
            }
            ContentLocator::Missing => Err(HarvestError::MissingContent {
                path: entry.path.clone(),
            }
            .into()),
        }
    }
}

/// Name a source's files are grouped under.
///
/// Local tokens such as `.` have no useful base name of their own; those
/// resolve to the name of the directory they point at.
fn namespace_of(source: &ClassifiedSource) -> String {
    if let Source::Local { root } = &source.source {
        if matches!(source.display_name.as_str(), "" | "." | ".." | "/") {
            if let Some(name) = std::fs::canonicalize(root)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            {
                return name;
            }
        }
    }
    source.display_name.clone()
}

/// `name`, or `name-2`, `name-3`, ... when an earlier source already
/// claimed it in this run.
fn unique_namespace(name: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}-{}", name, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}
