//! Hosted-repository connector.
//!
//! Walks `org/repo` trees through the contents API and implements
//! [`RepoBackend`] on top of the `gh` CLI, `git`, and plain HTTPS downloads.
//!
//! # Listing
//!
//! Each directory is listed with `gh api <contents-url> --paginate`. With
//! `--paginate`, `gh` prints one JSON array per page back to back; the pages
//! are parsed as a stream and merged, so callers always see the complete
//! directory.
//!
//! # Fault tolerance
//!
//! [`walk_remote`] treats every subdirectory as its own fault domain: if a
//! nested listing fails, that subtree is dropped and its siblings are still
//! walked. Only a failure to list the repository root fails the walk.
//!
//! # Downloads
//!
//! Files are fetched from their `download_url` with a client bounded by
//! `backend.request_timeout_secs`. There are no retries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::process::Command;

use crate::config::BackendConfig;
use crate::connector_git::{git_clone_shallow, git_repo_root, run_command};
use crate::error::HarvestError;
use crate::models::{Entry, RemoteEntry};
use crate::traits::RepoBackend;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ═══════════════════════════════════════════════════════════════════════
// Tree walk
// ═══════════════════════════════════════════════════════════════════════

/// Produce every non-directory entry of `org/repo`, recursing through
/// subdirectories depth-first.
///
/// # Errors
///
/// Fails only when the root listing fails. Failures below the root are
/// logged at debug level and the affected subtree is omitted.
pub async fn walk_remote(backend: &dyn RepoBackend, org: &str, repo: &str) -> Result<Vec<Entry>> {
    walk_remote_dir(backend, org, repo, String::new())
        .await
        .with_context(|| format!("Failed to list {}/{}", org, repo))
}

fn walk_remote_dir<'a>(
    backend: &'a dyn RepoBackend,
    org: &'a str,
    repo: &'a str,
    path: String,
) -> BoxFuture<'a, Result<Vec<Entry>>> {
    Box::pin(async move {
        let children = backend.list_directory(org, repo, &path).await?;

        let mut entries = Vec::new();
        for child in children {
            if child.is_dir() {
                let child_path = child.path.clone();
                match walk_remote_dir(backend, org, repo, child_path).await {
                    Ok(nested) => entries.extend(nested),
                    Err(e) => {
                        tracing::debug!(
                            "skipping {}/{}:{} ({:#})",
                            org,
                            repo,
                            child.path,
                            e
                        );
                    }
                }
            } else {
                entries.push(Entry::from(child));
            }
        }

        Ok(entries)
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Backend
// ═══════════════════════════════════════════════════════════════════════

/// [`RepoBackend`] backed by `git`, `gh`, and HTTPS.
pub struct GithubBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl GithubBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("repo-harvest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn gh(&self) -> Command {
        Command::new(&self.config.gh)
    }
}

#[async_trait]
impl RepoBackend for GithubBackend {
    async fn repo_root(&self) -> Result<PathBuf> {
        git_repo_root(&self.config.git, None).await
    }

    async fn organization_of(&self, root: &Path) -> Result<String> {
        let mut cmd = self.gh();
        cmd.args(["repo", "view", "--json", "owner", "--jq", ".owner.login"]);
        cmd.current_dir(root);

        let stdout = run_command(cmd, "gh repo view").await?;
        let org = String::from_utf8_lossy(&stdout).trim().to_string();
        if org.is_empty() {
            anyhow::bail!("gh repo view returned no owner for {}", root.display());
        }
        Ok(org)
    }

    async fn list_org_repos(&self, org: &str, limit: usize) -> Result<Vec<String>> {
        let limit = if limit == 0 {
            self.config.org_repo_limit
        } else {
            limit
        };

        let mut cmd = self.gh();
        cmd.args(["repo", "list", org, "--limit"]);
        cmd.arg(limit.to_string());
        cmd.args(["--json", "name", "--jq", ".[].name"]);

        let stdout = run_command(cmd, "gh repo list").await?;
        Ok(parse_name_lines(&String::from_utf8_lossy(&stdout)))
    }

    async fn list_directory(
        &self,
        org: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<RemoteEntry>> {
        let url = contents_url(&self.config.api_base, org, repo, path);

        let mut cmd = self.gh();
        cmd.arg("api").arg(&url).arg("--paginate");

        let stdout = run_command(cmd, "gh api").await?;
        parse_paginated_listing(&stdout, &url)
    }

    async fn download_content(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()> {
        git_clone_shallow(&self.config.git, url, dest).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

/// Contents-API URL for `path` inside `org/repo`.
pub fn contents_url(api_base: &str, org: &str, repo: &str, path: &str) -> String {
    let encoded = path
        .trim_matches('/')
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/repos/{}/{}/contents/{}",
        api_base.trim_end_matches('/'),
        org,
        repo,
        encoded
    )
}

/// Merge the back-to-back JSON arrays `gh api --paginate` prints.
pub fn parse_paginated_listing(raw: &[u8], location: &str) -> Result<Vec<RemoteEntry>> {
    let mut entries = Vec::new();
    let pages = serde_json::Deserializer::from_slice(raw).into_iter::<Vec<RemoteEntry>>();
    for page in pages {
        let page = page.map_err(|e| HarvestError::UnparseableListing {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        entries.extend(page);
    }
    Ok(entries)
}

fn parse_name_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// URI-encode one path segment per RFC 3986.
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
