//! Capability traits at the seams of a harvest.
//!
//! ```text
//!  ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//!  │ RepoBackend  │────▶│   harvest    │────▶│     Sink     │
//!  │ gh/git/HTTP  │     │ walk+filter  │     │ files / zip  │
//!  └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! [`RepoBackend`] is everything a harvest needs from the outside world
//! besides the local filesystem: repository identity, organization
//! listings, paginated directory listings, downloads, and clones. The
//! production implementation is
//! [`GithubBackend`](crate::connector_github::GithubBackend); tests supply
//! in-memory ones.
//!
//! [`Sink`] persists matched files. Both built-in sinks live in
//! [`sink`](crate::sink).

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::models::{Content, Entry, RemoteEntry};

/// The repository backend a harvest talks to.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use repo_harvest::models::RemoteEntry;
/// use repo_harvest::traits::RepoBackend;
/// use std::path::{Path, PathBuf};
///
/// struct Offline;
///
/// #[async_trait]
/// impl RepoBackend for Offline {
///     async fn repo_root(&self) -> Result<PathBuf> { Ok(PathBuf::from(".")) }
///     async fn organization_of(&self, _root: &Path) -> Result<String> { Ok("acme".into()) }
///     async fn list_org_repos(&self, _org: &str, _limit: usize) -> Result<Vec<String>> { Ok(vec![]) }
///     async fn list_directory(&self, _org: &str, _repo: &str, _path: &str) -> Result<Vec<RemoteEntry>> {
///         Ok(vec![])
///     }
///     async fn download_content(&self, url: &str) -> Result<Vec<u8>> {
///         anyhow::bail!("offline: {}", url)
///     }
///     async fn clone_shallow(&self, url: &str, _dest: &Path) -> Result<()> {
///         anyhow::bail!("offline: {}", url)
///     }
/// }
/// ```
#[async_trait]
pub trait RepoBackend: Send + Sync {
    /// Absolute path of the repository the process runs in.
    async fn repo_root(&self) -> Result<PathBuf>;

    /// Name of the current repository: the base name of its root.
    async fn current_repo_name(&self) -> Result<String> {
        let root = self.repo_root().await?;
        root.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Repository root has no name: {}", root.display()))
    }

    /// Owning organization (or user) of the repository at `root`.
    async fn organization_of(&self, root: &Path) -> Result<String>;

    /// Names of up to `limit` repositories owned by `org`.
    async fn list_org_repos(&self, org: &str, limit: usize) -> Result<Vec<String>>;

    /// Every child of `path` in `org/repo`, across all listing pages.
    async fn list_directory(&self, org: &str, repo: &str, path: &str)
        -> Result<Vec<RemoteEntry>>;

    /// Fetch the bytes behind a download URL.
    ///
    /// Non-success statuses fail with
    /// [`HarvestError::BadStatus`](crate::error::HarvestError::BadStatus).
    async fn download_content(&self, url: &str) -> Result<Vec<u8>>;

    /// Shallow-clone `url` into the (empty) directory `dest`.
    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Persists matched files.
///
/// A sink is driven by one orchestrator at a time; `&mut self` keeps it
/// that way.
pub trait Sink: Send {
    /// Persist one matched entry of the source shown as `source`.
    ///
    /// Returns a description of where the content went (a file path or an
    /// archive entry name).
    fn deliver(&mut self, source: &str, entry: &Entry, content: &Content) -> Result<String>;
}
