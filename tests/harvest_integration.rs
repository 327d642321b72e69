//! Integration tests for the harvest pipeline.
//!
//! An in-memory [`RepoBackend`] stands in for `gh`/`git`/HTTPS so the
//! orchestrator, walkers, and both sinks can be exercised end to end.

use anyhow::Result;
use async_trait::async_trait;
use repo_harvest::bundle::{run_bundle, BundleOptions};
use repo_harvest::classify::classify;
use repo_harvest::config::Config;
use repo_harvest::error::HarvestError;
use repo_harvest::feeds::{run_feeds, FeedOptions};
use repo_harvest::filter::SuffixFilter;
use repo_harvest::harvest::Harvester;
use repo_harvest::models::RemoteEntry;
use repo_harvest::progress::{NoProgress, ProgressMode};
use repo_harvest::sink::ArchiveSink;
use repo_harvest::traits::RepoBackend;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ─── Fake backend ───────────────────────────────────────────────────

#[derive(Default)]
struct FakeBackend {
    root: PathBuf,
    org: String,
    org_repos: Vec<String>,
    fail_org_listing: bool,
    /// "org/repo" → directory path → listing.
    trees: HashMap<String, BTreeMap<String, Vec<RemoteEntry>>>,
    /// "org/repo:path" directories whose listing fails ("" is the root).
    broken_dirs: HashSet<String>,
    /// download URL → bytes. Unknown URLs answer 404.
    blobs: HashMap<String, Vec<u8>>,
    /// clone URL → fixture directory copied on clone.
    clones: HashMap<String, PathBuf>,
}

impl FakeBackend {
    fn new(root: &Path, org: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            org: org.to_string(),
            ..Default::default()
        }
    }

    fn add_file(&mut self, slug: &str, path: &str, body: &[u8]) -> &mut Self {
        let url = format!("https://raw.test/{}/{}", slug, path);
        self.blobs.insert(url.clone(), body.to_vec());
        self.add_listed_file(slug, path, Some(url))
    }

    fn add_listed_file(&mut self, slug: &str, path: &str, url: Option<String>) -> &mut Self {
        let tree = self.trees.entry(slug.to_string()).or_default();
        tree.entry(String::new()).or_default();

        let segments: Vec<&str> = path.split('/').collect();
        let mut parent = String::new();
        for dir in &segments[..segments.len() - 1] {
            let child = if parent.is_empty() {
                dir.to_string()
            } else {
                format!("{}/{}", parent, dir)
            };
            let listing = tree.entry(parent.clone()).or_default();
            if !listing.iter().any(|e| e.path == child) {
                listing.push(RemoteEntry {
                    name: dir.to_string(),
                    path: child.clone(),
                    kind: "dir".to_string(),
                    download_url: None,
                });
            }
            tree.entry(child.clone()).or_default();
            parent = child;
        }

        tree.entry(parent).or_default().push(RemoteEntry {
            name: segments[segments.len() - 1].to_string(),
            path: path.to_string(),
            kind: "file".to_string(),
            download_url: url,
        });
        self
    }
}

#[async_trait]
impl RepoBackend for FakeBackend {
    async fn repo_root(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }

    async fn organization_of(&self, _root: &Path) -> Result<String> {
        Ok(self.org.clone())
    }

    async fn list_org_repos(&self, org: &str, limit: usize) -> Result<Vec<String>> {
        if self.fail_org_listing {
            anyhow::bail!("cannot list repos of {}", org);
        }
        Ok(self.org_repos.iter().take(limit).cloned().collect())
    }

    async fn list_directory(&self, org: &str, repo: &str, path: &str) -> Result<Vec<RemoteEntry>> {
        let slug = format!("{}/{}", org, repo);
        if self.broken_dirs.contains(&format!("{}:{}", slug, path)) {
            anyhow::bail!("HTTP 403 listing {}:{}", slug, path);
        }
        let tree = self
            .trees
            .get(&slug)
            .ok_or_else(|| anyhow::anyhow!("HTTP 404 for {}", slug))?;
        Ok(tree.get(path).cloned().unwrap_or_default())
    }

    async fn download_content(&self, url: &str) -> Result<Vec<u8>> {
        self.blobs.get(url).cloned().ok_or_else(|| {
            HarvestError::BadStatus {
                url: url.to_string(),
                status: 404,
            }
            .into()
        })
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()> {
        let fixture = self
            .clones
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("repository not found: {}", url))?;
        copy_tree(fixture, dest);
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn copy_tree(from: &Path, to: &Path) {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(from).unwrap();
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn archive_contents(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut body = Vec::new();
        file.read_to_end(&mut body).unwrap();
        out.insert(file.name().to_string(), body);
    }
    out
}

fn tree_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn bundle_options(output: &Path, sources: &[&str]) -> BundleOptions {
    BundleOptions {
        output: output.to_path_buf(),
        suffix: "agents_.md".to_string(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

// ─── Archive builder ────────────────────────────────────────────────

#[tokio::test]
async fn local_source_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repoA");
    write(&repo, "docs/foo.agents_.md", "# foo agents");
    write(&repo, "docs/bar.txt", "not harvested");
    let output = tmp.path().join("out.zip");

    let backend = FakeBackend::new(tmp.path(), "acme");
    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[repo.to_str().unwrap()]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 1);
    let contents = archive_contents(&output);
    assert_eq!(contents.len(), 1);
    assert_eq!(
        contents.get("repoA/docs/foo.agents_.md").map(Vec::as_slice),
        Some(&b"# foo agents"[..])
    );
}

#[tokio::test]
async fn same_paths_from_two_sources_do_not_collide() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");

    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend.add_file("acme/alpha", "x/agents_.md", b"from alpha");
    backend.add_file("acme/beta", "x/agents_.md", b"from beta");

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &["acme/alpha", "acme/beta"]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 2);
    let contents = archive_contents(&output);
    assert_eq!(contents["alpha/x/agents_.md"], b"from alpha");
    assert_eq!(contents["beta/x/agents_.md"], b"from beta");
}

#[tokio::test]
async fn failing_source_does_not_affect_the_others() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");

    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend
        .add_file("acme/one", "a.agents_.md", b"1a")
        .add_file("acme/one", "deep/b.agents_.md", b"1b");
    backend.add_file("acme/two", "c.agents_.md", b"2");
    backend.broken_dirs.insert("acme/two:".to_string());
    backend.add_file("acme/three", "d.agents_.md", b"3");

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &["acme/one", "acme/two", "acme/three"]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 3);
    assert_eq!(result.failed_sources.len(), 1);
    assert_eq!(result.failed_sources[0].source, "acme/two");

    let names: Vec<String> = archive_contents(&output).into_keys().collect();
    assert_eq!(
        names,
        vec!["one/a.agents_.md", "one/deep/b.agents_.md", "three/d.agents_.md"]
    );
}

#[tokio::test]
async fn failing_subdirectory_only_drops_its_subtree() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");

    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend
        .add_file("acme/tools", "top.agents_.md", b"top")
        .add_file("acme/tools", "private/secret.agents_.md", b"hidden")
        .add_file("acme/tools", "public/open.agents_.md", b"open");
    backend.broken_dirs.insert("acme/tools:private".to_string());

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &["acme/tools"]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 2);
    assert!(result.failed_sources.is_empty());
    let contents = archive_contents(&output);
    assert!(contents.contains_key("tools/top.agents_.md"));
    assert!(contents.contains_key("tools/public/open.agents_.md"));
    assert!(!contents.contains_key("tools/private/secret.agents_.md"));
}

#[tokio::test]
async fn local_walk_failure_fails_only_that_source() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");
    let present = tmp.path().join("present");
    write(&present, "p.agents_.md", "p");
    let missing = tmp.path().join("missing");

    let backend = FakeBackend::new(tmp.path(), "acme");
    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(
            &output,
            &[missing.to_str().unwrap(), present.to_str().unwrap()],
        ),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 1);
    assert_eq!(result.failed_sources.len(), 1);
    assert!(archive_contents(&output).contains_key("present/p.agents_.md"));
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_subdirectory_fails_the_whole_local_source() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");
    let repo = tmp.path().join("locked-repo");
    write(&repo, "a.agents_.md", "readable and earlier in walk order");
    write(&repo, "zz/b.agents_.md", "behind a locked directory");
    let locked = repo.join("zz");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop a privileged user.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let backend = FakeBackend::new(tmp.path(), "acme");
    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[repo.to_str().unwrap()]),
        ProgressMode::Json,
    )
    .await
    .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(result.delivered, 0);
    assert_eq!(result.failed_sources.len(), 1);
    assert!(archive_contents(&output).is_empty());
}

#[tokio::test]
async fn sources_sharing_a_name_keep_separate_namespaces() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");
    let first = tmp.path().join("a").join("tools");
    let second = tmp.path().join("b").join("tools");
    write(&first, "x.agents_.md", "from a");
    write(&second, "x.agents_.md", "from b");

    let backend = FakeBackend::new(tmp.path(), "acme");
    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[first.to_str().unwrap(), second.to_str().unwrap()]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 2);
    assert_eq!(result.skipped_files, 0);
    let contents = archive_contents(&output);
    assert_eq!(contents["tools/x.agents_.md"], b"from a");
    assert_eq!(contents["tools-2/x.agents_.md"], b"from b");
}

#[tokio::test]
async fn file_source_is_bundled_under_its_own_name() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");
    let file = tmp.path().join("foo.agents_.md");
    fs::write(&file, "solo").unwrap();

    let backend = FakeBackend::new(tmp.path(), "acme");
    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[file.to_str().unwrap()]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 1);
    let contents = archive_contents(&output);
    assert_eq!(contents.len(), 1);
    assert_eq!(contents["foo.agents_.md/foo.agents_.md"], b"solo");
}

#[tokio::test]
async fn failed_download_skips_only_that_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");

    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend
        .add_file("acme/tools", "good.agents_.md", b"ok")
        .add_listed_file(
            "acme/tools",
            "gone.agents_.md",
            Some("https://raw.test/acme/tools/gone".to_string()),
        )
        .add_listed_file("acme/tools", "nourl.agents_.md", None);

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &["acme/tools"]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 1);
    assert_eq!(result.skipped_files, 2);
    assert!(result.failed_sources.is_empty());
    let names: Vec<String> = archive_contents(&output).into_keys().collect();
    assert_eq!(names, vec!["tools/good.agents_.md"]);
}

#[tokio::test]
async fn git_url_sources_are_cloned_and_walked() {
    let tmp = TempDir::new().unwrap();
    let fixture = tmp.path().join("fixture");
    write(&fixture, "agents/x.agents_.md", "cloned");
    write(&fixture, ".git/hooks/y.agents_.md", "git internals");
    let output = tmp.path().join("out.zip");

    let url = "https://git.test/acme/widgets.git";
    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend.clones.insert(url.to_string(), fixture.clone());

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[url, "git@git.test:acme/nowhere.git"]),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 1);
    assert_eq!(result.failed_sources.len(), 1);
    let contents = archive_contents(&output);
    assert_eq!(contents.len(), 1);
    assert_eq!(contents["widgets/agents/x.agents_.md"], b"cloned");
}

#[tokio::test]
async fn rebundling_yields_the_same_entries() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("local");
    write(&repo, "a.agents_.md", "local a");
    write(&repo, "nested/b.agents_.md", "local b");

    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend.add_file("acme/remote", "c.agents_.md", b"remote c");

    let first = tmp.path().join("first.zip");
    let second = tmp.path().join("second.zip");
    for output in [&first, &second] {
        run_bundle(
            &Config::default(),
            &backend,
            bundle_options(output, &[repo.to_str().unwrap(), "acme/remote"]),
            ProgressMode::Json,
        )
        .await
        .unwrap();
    }

    assert_eq!(archive_contents(&first), archive_contents(&second));
}

#[tokio::test]
async fn zero_sources_is_a_setup_error() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out.zip");
    let backend = FakeBackend::new(tmp.path(), "acme");

    let err = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &[]),
        ProgressMode::Json,
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("no sources"));
    assert!(!output.exists());
}

#[tokio::test]
async fn uncreatable_output_is_a_setup_error() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("no-such-dir").join("out.zip");
    let backend = FakeBackend::new(tmp.path(), "acme");

    let result = run_bundle(
        &Config::default(),
        &backend,
        bundle_options(&output, &["acme/tools"]),
        ProgressMode::Json,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn harvester_drives_any_sink() {
    let tmp = TempDir::new().unwrap();
    let mut backend = FakeBackend::new(tmp.path(), "acme");
    backend.add_file("acme/alpha", "notes/agents_.md", b"n");

    let reporter = NoProgress;
    let harvester = Harvester::new(&backend, SuffixFilter::new("agents_.md"), &reporter);
    let mut sink = ArchiveSink::new(Cursor::new(Vec::new()));
    let result = harvester.run(&[classify("acme/alpha")], &mut sink).await;

    assert_eq!(result.delivered, 1);
    assert_eq!(sink.len(), 1);
}

// ─── Feed copier ────────────────────────────────────────────────────

fn feed_backend(root: &Path) -> FakeBackend {
    let mut backend = FakeBackend::new(root, "acme");
    backend.org_repos = vec!["docs".to_string(), "api".to_string(), "myrepo".to_string()];
    backend
        .add_file("acme/docs", "a/b/README.myrepo.feed-out.md", b"readme feed")
        .add_file("acme/docs", "a/b/README.other.feed-out.md", b"not for us");
    backend.add_file("acme/api", "x.myrepo.feed-out.md", b"api feed");
    backend.add_file("acme/myrepo", "src/lib.rs", b"fn main() {}");
    backend
}

#[tokio::test]
async fn feeds_are_copied_with_renamed_suffix() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("myrepo");
    fs::create_dir_all(&root).unwrap();
    let backend = feed_backend(&root);

    let result = run_feeds(
        &Config::default(),
        &backend,
        FeedOptions::default(),
        ProgressMode::Json,
    )
    .await
    .unwrap();

    assert_eq!(result.delivered, 2);
    assert_eq!(
        fs::read(root.join("a/b/README.feed-in.md")).unwrap(),
        b"readme feed"
    );
    assert_eq!(fs::read(root.join("x.feed-in.md")).unwrap(), b"api feed");

    let snapshot = tree_snapshot(&root);
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn feeds_rerun_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("myrepo");
    fs::create_dir_all(&root).unwrap();
    let backend = feed_backend(&root);

    run_feeds(&Config::default(), &backend, FeedOptions::default(), ProgressMode::Json)
        .await
        .unwrap();
    let first = tree_snapshot(&root);

    run_feeds(&Config::default(), &backend, FeedOptions::default(), ProgressMode::Json)
        .await
        .unwrap();
    assert_eq!(tree_snapshot(&root), first);
}

#[tokio::test]
async fn feeds_honor_overrides() {
    let tmp = TempDir::new().unwrap();
    let elsewhere = tmp.path().join("myrepo");
    fs::create_dir_all(&elsewhere).unwrap();

    let mut backend = feed_backend(tmp.path());
    backend.org = "wrong-org".to_string();

    let options = FeedOptions {
        org: Some("acme".to_string()),
        limit: Some(1),
        root: Some(elsewhere.clone()),
    };
    let result = run_feeds(&Config::default(), &backend, options, ProgressMode::Json)
        .await
        .unwrap();

    // Only the first org repository ("docs") is scanned.
    assert_eq!(result.delivered, 1);
    assert!(elsewhere.join("a/b/README.feed-in.md").exists());
    assert!(!elsewhere.join("x.feed-in.md").exists());
}

#[tokio::test]
async fn feeds_fail_when_org_cannot_be_listed() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("myrepo");
    fs::create_dir_all(&root).unwrap();
    let mut backend = feed_backend(&root);
    backend.fail_org_listing = true;

    let err = run_feeds(
        &Config::default(),
        &backend,
        FeedOptions::default(),
        ProgressMode::Json,
    )
    .await
    .unwrap_err();

    assert!(format!("{:#}", err).contains("Error getting repos"));
}
