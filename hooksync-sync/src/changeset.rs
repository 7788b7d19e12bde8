//! Change-set payloads: typed parse and branch filtering.
//!
//! Only the subset of a push notification the engine consumes is modelled:
//!
//! ```text
//! { repository: { name, full_name }, ref?, commits: [ { message, added, removed, modified } ] }
//! ```
//!
//! Repository identity and the commit list are required; anything else is
//! optional and unknown fields are ignored.

use serde::{Deserialize, Serialize};

use hooksync_core::BranchName;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// Repository identity carried by a change-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// Short name, used to look up the deploy target.
    pub name: String,
    /// `owner/name`, used to build remote fetch URLs.
    pub full_name: String,
}

/// One commit of a change-set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

/// Parsed form of a queued artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetPayload {
    pub repository: RepositoryRef,
    /// Full ref pushed to, e.g. `refs/heads/main`. Absent for synthetic triggers.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Commits in delivery order (oldest first).
    pub commits: Vec<Commit>,
}

/// Parse untrusted artifact bytes into a [`ChangeSetPayload`].
///
/// Fails with [`SyncError::Parse`] when the bytes are not JSON or when the
/// repository identity or commit list is missing.
pub fn parse(raw: &[u8]) -> Result<ChangeSetPayload, SyncError> {
    Ok(serde_json::from_slice(raw)?)
}

// ---------------------------------------------------------------------------
// Branch filter
// ---------------------------------------------------------------------------

/// Result of checking a payload against the branch a destination tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchCheck {
    /// The payload targets the deploy branch (or carries no ref at all).
    Matches,
    /// The payload was pushed to some other ref.
    Mismatch { found: String },
}

/// `true` when `git_ref` ends in exactly `/<branch>`, equals `branch`, or is absent.
///
/// `refs/heads/release` matches `release`; `refs/heads/release-2` does not.
pub fn ref_matches(git_ref: Option<&str>, branch: &BranchName) -> bool {
    let Some(git_ref) = git_ref else {
        return true;
    };
    let branch = branch.as_str();
    if git_ref == branch {
        return true;
    }
    git_ref
        .strip_suffix(branch)
        .is_some_and(|head| head.ends_with('/'))
}

/// Check `payload` against `branch`.
pub fn check_branch(payload: &ChangeSetPayload, branch: &BranchName) -> BranchCheck {
    if ref_matches(payload.git_ref.as_deref(), branch) {
        BranchCheck::Matches
    } else {
        BranchCheck::Mismatch {
            found: payload.git_ref.clone().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
