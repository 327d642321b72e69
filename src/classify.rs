//! Source classification.
//!
//! Turns a user-supplied token into a [`ClassifiedSource`] by string
//! inspection alone. No network or filesystem access happens here.
//!
//! | Token | Kind |
//! |-------|------|
//! | `git@host:org/repo.git`, `https://…`, `http://…`, `ssh://…`, `git://…` | git URL |
//! | `org/repo` (exactly one `/`, no path markers) | remote |
//! | anything else | local path |
//!
//! A local directory written as `dir/sub` reads as `org/repo`; callers
//! that mean a local path should spell it `./dir/sub`.

use std::path::PathBuf;

use crate::models::{ClassifiedSource, Source};

const GIT_URL_PREFIXES: [&str; 5] = ["git@", "https://", "http://", "ssh://", "git://"];

pub fn is_git_url(token: &str) -> bool {
    GIT_URL_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Derive a repository name from a clone URL.
///
/// Strips a trailing `.git`, then keeps what follows the last `/`, or the
/// last `:` when there is no `/`.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    if let Some(idx) = trimmed.rfind('/') {
        return trimmed[idx + 1..].to_string();
    }
    if let Some(idx) = trimmed.rfind(':') {
        return trimmed[idx + 1..].to_string();
    }
    trimmed.to_string()
}

/// Split an `org/repo` token, or return `None` when it carries any local
/// path semantics.
pub fn parse_org_repo(token: &str) -> Option<(String, String)> {
    if token.matches('/').count() != 1 {
        return None;
    }
    if token.starts_with(['.', '~']) || token.contains('\\') || token.contains(':') {
        return None;
    }
    let (org, repo) = token.split_once('/')?;
    if org.is_empty() || repo.is_empty() {
        return None;
    }
    Some((org.to_string(), repo.to_string()))
}

/// Base name of a local path token, ignoring trailing separators.
pub fn local_display_name(token: &str) -> String {
    let trimmed = token.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

pub fn classify(token: &str) -> ClassifiedSource {
    let token = token.trim();

    if is_git_url(token) {
        return ClassifiedSource {
            token: token.to_string(),
            source: Source::GitUrl {
                url: token.to_string(),
            },
            display_name: repo_name_from_url(token),
        };
    }

    if let Some((org, repo)) = parse_org_repo(token) {
        return ClassifiedSource {
            token: token.to_string(),
            display_name: repo.clone(),
            source: Source::Remote { org, repo },
        };
    }

    ClassifiedSource {
        token: token.to_string(),
        source: Source::Local {
            root: PathBuf::from(token),
        },
        display_name: local_display_name(token),
    }
}

/// A remote source whose display name is the full `org/repo` pair, for
/// callers that already know the token names a hosted repository.
pub fn remote(org: &str, repo: &str) -> ClassifiedSource {
    ClassifiedSource {
        token: format!("{}/{}", org, repo),
        source: Source::Remote {
            org: org.to_string(),
            repo: repo.to_string(),
        },
        display_name: format!("{}/{}", org, repo),
    }
}
