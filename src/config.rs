//! Static engine configuration.
//!
//! Configuration is loaded once at startup, typically from a JSON document,
//! and is immutable while requests are served. Every field has a default so
//! an empty object (`{}`) is a valid configuration.
//!
//! ```json
//! {
//!   "repository_name": "Example Archives",
//!   "base_url": "https://archives.example.org/oai",
//!   "admin_email": "archivist@example.org",
//!   "token_secret": "change me",
//!   "oai_sets": {
//!     "sponsor_0": { "sponsors": ["sponsor_0"] },
//!     "by_repo":   { "repo_codes": ["MAIN"] }
//!   },
//!   "repositories": [
//!     { "id": 3, "repo_code": "CLOSED", "oai_disabled": true }
//!   ],
//!   "formats": {
//!     "oai_dc": { "record_types": ["resource", "archival_object"], "page_size": 50 }
//!   }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{OaiError, Result};
use crate::format::{FormatOptions, FormatRegistry};
use crate::set::{RepositoryConfig, SetDefinition, SetResolver, DEFAULT_LEVELS};
use crate::visibility::UnpublishedPolicy;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    /// Name reported by Identify.
    pub repository_name: String,
    /// Base URL of the OAI endpoint, echoed in every response.
    pub base_url: String,
    /// Administrator email reported by Identify.
    pub admin_email: String,
    /// Namespace used in OAI identifiers (`oai:<namespace>/<uri>`).
    pub identifier_namespace: String,
    /// Secret mixed into resumption-token checksums.
    pub token_secret: String,
    /// Records fetched from the store per batch; `0` means twice the page size.
    pub scan_batch_size: usize,
    /// How hidden records are reported in listings.
    pub unpublished_policy: UnpublishedPolicy,
    /// Archival levels exposed as sets.
    pub levels: Vec<String>,
    /// Named sets, in ListSets order.
    pub oai_sets: IndexMap<String, SetDefinition>,
    /// Per-repository harvesting switches.
    pub repositories: Vec<RepositoryConfig>,
    /// Per-prefix overrides of the standard format options.
    pub formats: IndexMap<String, FormatOptions>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            repository_name: "ArchivesSpace OAI Provider".to_string(),
            base_url: "http://localhost/oai".to_string(),
            admin_email: "admin@example.com".to_string(),
            identifier_namespace: "archivesspace".to_string(),
            token_secret: String::new(),
            scan_batch_size: 0,
            unpublished_policy: UnpublishedPolicy::default(),
            levels: DEFAULT_LEVELS.iter().map(|l| (*l).to_string()).collect(),
            oai_sets: IndexMap::new(),
            repositories: Vec::new(),
            formats: IndexMap::new(),
        }
    }
}

impl HarvestConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] if the document is not valid JSON, has
    /// unknown keys, or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HarvestConfig = serde_json::from_str(json)
            .map_err(|e| OaiError::Config(format!("failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::IoError`] if the file cannot be read and
    /// [`OaiError::Config`] if its content is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        HarvestConfig::from_json_str(&json)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.identifier_namespace.is_empty() || self.identifier_namespace.contains('/') {
            return Err(OaiError::Config(
                "identifier_namespace must be non-empty and contain no '/'".into(),
            ));
        }
        for (name, definition) in &self.oai_sets {
            definition.validate(name)?;
        }
        for (i, repo) in self.repositories.iter().enumerate() {
            if self.repositories[..i].iter().any(|other| other.id == repo.id) {
                return Err(OaiError::Config(format!(
                    "repository {} configured twice",
                    repo.id
                )));
            }
        }
        self.format_registry().map(|_| ())
    }

    /// Standard formats with this configuration's overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] if an override names an unknown prefix
    /// or carries invalid options.
    pub fn format_registry(&self) -> Result<FormatRegistry> {
        let mut registry = FormatRegistry::standard();
        for (prefix, options) in &self.formats {
            registry.override_options(prefix, options.clone())?;
        }
        Ok(registry)
    }

    /// Set resolver over this configuration.
    #[must_use]
    pub fn set_resolver(&self) -> SetResolver<'_> {
        SetResolver::new(&self.oai_sets, &self.levels)
    }

    /// Configuration of repository `id`, if any.
    #[must_use]
    pub fn repository(&self, id: crate::record::RepositoryId) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|repo| repo.id == id)
    }

    /// Whether resumption tokens are keyed by a secret.
    ///
    /// Without one, anyone can compute a valid checksum for a forged token.
    #[must_use]
    pub fn has_token_secret(&self) -> bool {
        !self.token_secret.trim().is_empty()
    }

    /// Effective store batch size for a page of `page_size` records.
    #[must_use]
    pub fn batch_size_for(&self, page_size: usize) -> usize {
        if self.scan_batch_size == 0 {
            page_size.saturating_mul(2).max(1)
        } else {
            self.scan_batch_size
        }
    }
}
