//! Archive builder (`harvest zip`).
//!
//! Collects every file ending in the agents suffix from each source and
//! bundles them into one zip, each under `<source name>/<relative path>`.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::classify::classify;
use crate::config::Config;
use crate::filter::SuffixFilter;
use crate::harvest::Harvester;
use crate::models::HarvestResult;
use crate::progress::{DeliveryStyle, HarvestEvent, ProgressMode};
use crate::sink::ArchiveSink;
use crate::traits::RepoBackend;

pub const USAGE: &str = "\
Usage: harvest zip [-o output.zip] <org/repo | git URL | path>...
Examples:
  harvest zip acme/scripts acme/pixie
  harvest zip https://github.com/acme/scripts
  harvest zip ./path/to/local/repo";

#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub output: PathBuf,
    pub suffix: String,
    pub sources: Vec<String>,
}

impl BundleOptions {
    /// Options with the configured output path and suffix.
    pub fn from_config(config: &Config, sources: Vec<String>) -> Self {
        Self {
            output: config.harvest.output.clone(),
            suffix: config.harvest.agents_suffix.clone(),
            sources,
        }
    }
}

/// Build the archive.
///
/// # Errors
///
/// Fails when no sources are given or the archive cannot be created or
/// finalized. Sources and files that fail are logged and skipped.
pub async fn run_bundle(
    config: &Config,
    backend: &dyn RepoBackend,
    options: BundleOptions,
    mode: ProgressMode,
) -> Result<HarvestResult> {
    if options.sources.is_empty() {
        bail!("no sources given\n\n{}", USAGE);
    }

    let sources: Vec<_> = options.sources.iter().map(|token| classify(token)).collect();
    let excludes = config.harvest.exclude_set()?;

    let mut sink = ArchiveSink::create(&options.output)?;
    let reporter = mode.reporter(DeliveryStyle::Archive);
    let harvester = Harvester::new(backend, SuffixFilter::new(&options.suffix), reporter.as_ref())
        .with_excludes(excludes);

    let result = harvester.run(&sources, &mut sink).await;
    sink.finish()?;

    reporter.report(HarvestEvent::Done {
        result: result.clone(),
        output: Some(options.output.display().to_string()),
    });
    Ok(result)
}
