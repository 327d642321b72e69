//! Typed errors for the conditions a harvest distinguishes.
//!
//! Most plumbing returns [`anyhow::Result`]; the variants here are the
//! failures callers (and tests) need to tell apart, so they are raised as a
//! [`HarvestError`] and can be recovered with `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// A matched entry's path does not end with the suffix its sink strips.
    #[error("{path} does not carry the expected suffix '{suffix}'")]
    MalformedMatch { path: String, suffix: String },

    /// A relative path that would escape the destination root.
    #[error("refusing to write outside the destination root: {path}")]
    UnsafePath { path: String },

    /// A download answered with a non-success HTTP status.
    #[error("bad status fetching {url}: {status}")]
    BadStatus { url: String, status: u16 },

    /// An entry has no locator its bytes can be fetched from.
    #[error("no download location for {path}")]
    MissingContent { path: String },

    /// An external command (`git`, `gh`) exited unsuccessfully.
    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// A directory listing could not be decoded.
    #[error("could not parse listing for {location}: {reason}")]
    UnparseableListing { location: String, reason: String },
}
