//! # Repo Harvest
//!
//! Collects marker files, selected by filename suffix, out of many
//! repositories: local directories, git URLs (shallow-cloned to a scratch
//! directory), and `org/repo` pairs reached through the hosted contents
//! API. Matches are either copied into the local tree under a new name or
//! bundled into a single zip archive.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────┐   ┌────────────┐
//! │  classify  │──▶│ walk        │──▶│  filter  │──▶│    Sink    │
//! │ path/URL/  │   │ local (fs)  │   │  suffix  │   │ FeedSink   │
//! │ org/repo   │   │ remote (API)│   │          │   │ ArchiveSink│
//! └────────────┘   └─────────────┘   └──────────┘   └────────────┘
//!                        ▲                                 │
//!                        │         harvest::Harvester      │
//!                        └──────── tally + warnings ◀──────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest zip -o agents.zip acme/scripts ./local/repo https://github.com/acme/pixie
//! harvest feeds                 # pull *.<this-repo>.feed-out.md from the org
//! harvest sources acme/x ./y    # show how tokens classify
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`classify`] | Source token classification |
//! | [`models`] | Core data types |
//! | [`traits`] | `RepoBackend` and `Sink` capabilities |
//! | [`connector_fs`] | Local tree walk |
//! | [`connector_git`] | `git` clone and repo discovery |
//! | [`connector_github`] | Remote tree walk and the `gh`/HTTPS backend |
//! | [`filter`] | Suffix predicate |
//! | [`sink`] | Filesystem and archive sinks |
//! | [`harvest`] | Orchestration and failure policy |
//! | [`progress`] | Human and JSON reporting |
//! | [`feeds`] | `harvest feeds` |
//! | [`bundle`] | `harvest zip` |
//! | [`config`] | TOML configuration |

pub mod bundle;
pub mod classify;
pub mod config;
pub mod connector_fs;
pub mod connector_git;
pub mod connector_github;
pub mod error;
pub mod feeds;
pub mod filter;
pub mod harvest;
pub mod logging;
pub mod models;
pub mod progress;
pub mod sink;
pub mod sources;
pub mod traits;
