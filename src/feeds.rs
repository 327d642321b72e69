//! Feed-file copier (`harvest feeds`).
//!
//! Every repository in the current repository's organization may publish
//! files addressed to it as `*.<this-repo>.feed-out.md`. This command
//! collects them and writes each one into the current repository as
//! `*.feed-in.md` at the same relative path.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::classify;
use crate::config::Config;
use crate::filter::SuffixFilter;
use crate::harvest::Harvester;
use crate::models::HarvestResult;
use crate::progress::{DeliveryStyle, HarvestEvent, ProgressMode};
use crate::sink::FeedSink;
use crate::traits::RepoBackend;

/// Overrides for values otherwise derived from the backend.
#[derive(Debug, Default, Clone)]
pub struct FeedOptions {
    pub org: Option<String>,
    pub limit: Option<usize>,
    pub root: Option<PathBuf>,
}

/// Suffix other repositories use for files addressed to `repo_name`.
pub fn feed_out_suffix(repo_name: &str) -> String {
    format!(".{}.feed-out.md", repo_name)
}

fn search_banner(repo_name: &str, org: &str) -> String {
    format!(
        "Searching for *{}.feed-out.md files in {} organization...",
        repo_name, org
    )
}

/// Copy every feed file addressed to the current repository into it.
///
/// # Errors
///
/// Fails only when the repository root, name, or organization cannot be
/// determined, or the organization's repositories cannot be listed.
/// Failures of individual repositories or files are logged and skipped.
pub async fn run_feeds(
    config: &Config,
    backend: &dyn RepoBackend,
    options: FeedOptions,
    mode: ProgressMode,
) -> Result<HarvestResult> {
    let (root, repo_name) = match options.root {
        Some(root) => {
            let name = root
                .canonicalize()
                .unwrap_or_else(|_| root.clone())
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| anyhow::anyhow!("Cannot derive repo name from {}", root.display()))?;
            (root, name)
        }
        None => {
            let root = backend
                .repo_root()
                .await
                .context("Error getting repo root")?;
            let name = backend
                .current_repo_name()
                .await
                .context("Error getting repo name")?;
            (root, name)
        }
    };

    let org = match options.org {
        Some(org) => org,
        None => backend
            .organization_of(&root)
            .await
            .context("Error getting organization")?,
    };

    let suffix = feed_out_suffix(&repo_name);
    if mode == ProgressMode::Human {
        println!("{}", search_banner(&repo_name, &org));
    }

    let limit = options.limit.unwrap_or(config.backend.org_repo_limit);
    let repos = backend
        .list_org_repos(&org, limit)
        .await
        .context("Error getting repos")?;
    tracing::debug!("{} repositories in {}", repos.len(), org);

    let sources: Vec<_> = repos
        .iter()
        .map(|repo| classify::remote(&org, repo))
        .collect();

    let reporter = mode.reporter(DeliveryStyle::Feed);
    let mut sink = FeedSink::new(&root, &suffix, &config.harvest.feed_in_suffix);
    let harvester = Harvester::new(backend, SuffixFilter::new(&suffix), reporter.as_ref());
    let result = harvester.run(&sources, &mut sink).await;

    reporter.report(HarvestEvent::Done {
        result: result.clone(),
        output: Some(root.display().to_string()),
    });
    Ok(result)
}
