//! # hooksync-sync
//!
//! Change-set reconciliation for deployed repository trees.
//!
//! A change-set artifact (a JSON push payload dropped into the queue
//! directory) is parsed, filtered by branch, planned into file operations,
//! applied against the configured destination, and finally settled in the
//! [`RetryQueue`]. Call [`Engine::run`] to drain one lane of the queue, or
//! [`bootstrap`](bootstrap::bootstrap) to seed a destination from the branch
//! archive.

pub mod apply;
pub mod bootstrap;
pub mod changeset;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod plan;
pub mod queue;
pub mod reap;
pub mod tree;

pub use apply::OpOutcome;
pub use bootstrap::{bootstrap, BootstrapReport, BootstrapRequest};
pub use changeset::{BranchCheck, ChangeSetPayload};
pub use engine::{ArtifactOutcome, ArtifactReport, Engine, RunMode, RunReport};
pub use error::SyncError;
pub use fetch::{ArchiveSource, FetchError, HttpFetcher, RemoteFetcher};
pub use plan::{FileOp, RunContext};
pub use queue::{Artifact, Lane, RetryQueue};
