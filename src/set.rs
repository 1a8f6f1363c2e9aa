//! OAI set resolution and per-repository gating.
//!
//! A set name resolves to a membership predicate through one of three
//! strategies, tried in this order:
//!
//! 1. **Named sets** from configuration, each defined by a sponsor allow-list
//!    or a repository-code allow-list.
//! 2. **Level sets**: any known archival level (`fonds`, `series`, ...) is a
//!    set of the hierarchical records at that level.
//!
//! Anything else is [`OaiError::NoSetHierarchy`].
//!
//! Independently of the set predicate, repositories can opt out of
//! harvesting altogether or restrict which sets they take part in. That
//! gating happens before any scanning, by excluding whole repositories.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{OaiError, Result};
use crate::record::{OaiRecord, RepositoryId};

/// Archival levels exposed as sets when no configuration overrides them.
pub const DEFAULT_LEVELS: &[&str] = &[
    "class",
    "collection",
    "file",
    "fonds",
    "item",
    "otherlevel",
    "recordgrp",
    "series",
    "subfonds",
    "subgrp",
    "subseries",
];

/// Configured definition of a named set.
///
/// Exactly one of `sponsors` or `repo_codes` must be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDefinition {
    /// Sponsors whose records belong to the set.
    #[serde(default)]
    pub sponsors: Vec<String>,
    /// Repository codes whose records belong to the set.
    #[serde(default)]
    pub repo_codes: Vec<String>,
    /// Free-text description shown by ListSets.
    #[serde(default)]
    pub description: Option<String>,
}

impl SetDefinition {
    /// A set of records carrying one of the given sponsors.
    #[must_use]
    pub fn sponsors<S: Into<String>>(sponsors: impl IntoIterator<Item = S>) -> Self {
        SetDefinition {
            sponsors: sponsors.into_iter().map(Into::into).collect(),
            ..SetDefinition::default()
        }
    }

    /// A set of records held by one of the given repositories.
    #[must_use]
    pub fn repo_codes<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
        SetDefinition {
            repo_codes: codes.into_iter().map(Into::into).collect(),
            ..SetDefinition::default()
        }
    }

    /// Check that the definition names exactly one strategy.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] when both or neither allow-list is given.
    pub fn validate(&self, name: &str) -> Result<()> {
        match (self.sponsors.is_empty(), self.repo_codes.is_empty()) {
            (false, true) | (true, false) => Ok(()),
            (true, true) => Err(OaiError::Config(format!(
                "set '{name}' must define sponsors or repo_codes"
            ))),
            (false, false) => Err(OaiError::Config(format!(
                "set '{name}' defines both sponsors and repo_codes"
            ))),
        }
    }

    fn predicate(&self) -> SetPredicate {
        if self.sponsors.is_empty() {
            SetPredicate::RepositoryCode(self.repo_codes.clone())
        } else {
            SetPredicate::Sponsor(self.sponsors.clone())
        }
    }
}

/// Membership test for a resolved set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetPredicate {
    /// Hierarchical records at this archival level.
    Level(String),
    /// Records whose sponsor is in the list.
    Sponsor(Vec<String>),
    /// Records whose repository code is in the list.
    RepositoryCode(Vec<String>),
}

impl SetPredicate {
    /// Whether `record` belongs to the set.
    #[must_use]
    pub fn matches(&self, record: &OaiRecord) -> bool {
        match self {
            SetPredicate::Level(level) => {
                record.record_type.is_hierarchical() && record.level.as_deref() == Some(level)
            },
            SetPredicate::Sponsor(sponsors) => record
                .sponsor
                .as_ref()
                .is_some_and(|sponsor| sponsors.contains(sponsor)),
            SetPredicate::RepositoryCode(codes) => codes.contains(&record.repository_code),
        }
    }
}

/// Entry in a ListSets response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDescriptor {
    /// The set spec harvesters pass back.
    pub spec: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Resolves set names against configured sets and known levels.
#[derive(Debug, Clone, Copy)]
pub struct SetResolver<'a> {
    sets: &'a IndexMap<String, SetDefinition>,
    levels: &'a [String],
}

impl<'a> SetResolver<'a> {
    /// Create a resolver over named set definitions and level names.
    #[must_use]
    pub fn new(sets: &'a IndexMap<String, SetDefinition>, levels: &'a [String]) -> Self {
        SetResolver { sets, levels }
    }

    /// Resolve a set name to its membership predicate.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::NoSetHierarchy`] when the name is neither a
    /// configured set nor a known level.
    pub fn resolve(&self, name: &str) -> Result<SetPredicate> {
        if let Some(definition) = self.sets.get(name) {
            return Ok(definition.predicate());
        }
        if self.levels.iter().any(|level| level == name) {
            return Ok(SetPredicate::Level(name.to_string()));
        }
        Err(OaiError::NoSetHierarchy(format!("unknown set '{name}'")))
    }

    /// All sets, configured ones first, then levels.
    #[must_use]
    pub fn list_sets(&self) -> Vec<SetDescriptor> {
        let named = self.sets.iter().map(|(spec, definition)| SetDescriptor {
            spec: spec.clone(),
            name: spec.clone(),
            description: definition.description.clone(),
        });
        let levels = self
            .levels
            .iter()
            .filter(|level| !self.sets.contains_key(level.as_str()))
            .map(|level| SetDescriptor {
                spec: level.clone(),
                name: level.clone(),
                description: None,
            });
        named.chain(levels).collect()
    }

    /// Specs of every set `record` belongs to, in ListSets order.
    #[must_use]
    pub fn memberships(&self, record: &OaiRecord) -> Vec<String> {
        let mut specs: Vec<String> = self
            .sets
            .iter()
            .filter(|(_, definition)| definition.predicate().matches(record))
            .map(|(spec, _)| spec.clone())
            .collect();
        if let Some(level) = record.level.as_ref() {
            let is_level_set = self.levels.contains(level) && !self.sets.contains_key(level);
            if record.record_type.is_hierarchical() && is_level_set {
                specs.push(level.clone());
            }
        }
        specs
    }
}

/// Per-repository harvesting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Repository identity.
    pub id: RepositoryId,
    /// Repository short code.
    pub repo_code: String,
    /// Whether OAI harvesting is turned off for this repository.
    #[serde(default)]
    pub oai_disabled: bool,
    /// Sets this repository takes part in; empty means all sets.
    #[serde(default)]
    pub sets_available: Vec<String>,
}

impl RepositoryConfig {
    /// Whether the repository contributes records to a request for `set`.
    #[must_use]
    pub fn admits(&self, set: Option<&str>) -> bool {
        if self.oai_disabled {
            return false;
        }
        match set {
            Some(set) if !self.sets_available.is_empty() => {
                self.sets_available.iter().any(|allowed| allowed == set)
            },
            _ => true,
        }
    }
}

/// Repositories that must be left out of a request for `set`.
///
/// Repositories without configuration are always admitted.
#[must_use]
pub fn excluded_repositories(
    repositories: &[RepositoryConfig],
    set: Option<&str>,
) -> Vec<RepositoryId> {
    repositories
        .iter()
        .filter(|repo| !repo.admits(set))
        .map(|repo| repo.id)
        .collect()
}
