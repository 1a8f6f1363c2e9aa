//! Publication visibility rules.
//!
//! A record may be exposed only when it is published, not suppressed, and
//! every ancestor up to its root is published. One unpublished ancestor
//! hides the whole subtree below it whatever the descendants' own flags say.
//!
//! Decisions are computed from the record as loaded for the current request
//! and never memoized: publish state changes between requests.

use serde::{Deserialize, Serialize};

use crate::record::OaiRecord;

/// Why a record is hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HiddenReason {
    /// The record itself is unpublished.
    Unpublished,
    /// The record is suppressed.
    Suppressed,
    /// An ancestor is unpublished.
    UnpublishedAncestor(String),
}

/// Outcome of a visibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityDecision {
    /// The record may be exposed.
    Visible,
    /// The record must not be exposed.
    Hidden(HiddenReason),
}

impl VisibilityDecision {
    /// Whether the decision allows exposure.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, VisibilityDecision::Visible)
    }
}

/// How records that are hidden (rather than deleted) are reported in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpublishedPolicy {
    /// Leave hidden records out; harvesters notice on a full resync.
    #[default]
    Omit,
    /// Report hidden records as deletion markers.
    Tombstone,
}

/// Decide whether `record` may be exposed.
#[must_use]
pub fn decide(record: &OaiRecord) -> VisibilityDecision {
    if !record.publish {
        return VisibilityDecision::Hidden(HiddenReason::Unpublished);
    }
    if record.suppressed {
        return VisibilityDecision::Hidden(HiddenReason::Suppressed);
    }
    match record.ancestors.iter().find(|a| !a.publish) {
        Some(ancestor) => {
            VisibilityDecision::Hidden(HiddenReason::UnpublishedAncestor(ancestor.uri.clone()))
        },
        None => VisibilityDecision::Visible,
    }
}

/// Whether `record` may be exposed.
#[must_use]
pub fn is_visible(record: &OaiRecord) -> bool {
    decide(record).is_visible()
}
