//! Harvestable record structures.
//!
//! An [`OaiRecord`] is the engine's per-request view of an archival record:
//! enough identity to order and address it, the flags that decide whether it
//! may be exposed, the attributes sets are resolved against, and an opaque
//! payload that metadata mappers turn into XML.
//!
//! Records are ordered within a type by their [`CursorKey`], the pair of
//! modification time and numeric identity. The identity breaks ties between
//! records modified in the same instant, so the order is total.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OaiError;

/// Numeric identity of a repository (an archival institution or unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(pub u32);

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of record the engine can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Top-level descriptive record (a collection or fonds).
    Resource,
    /// A component inside a resource's hierarchy.
    ArchivalObject,
    /// Digital surrogate of archival material.
    DigitalObject,
    /// Accession record.
    Accession,
    /// Agent (person, family, corporate body).
    Agent,
    /// Subject heading.
    Subject,
}

impl RecordType {
    /// All record types in declaration order.
    pub const ALL: [RecordType; 6] = [
        RecordType::Resource,
        RecordType::ArchivalObject,
        RecordType::DigitalObject,
        RecordType::Accession,
        RecordType::Agent,
        RecordType::Subject,
    ];

    /// Stable identifier used in URIs and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Resource => "resource",
            RecordType::ArchivalObject => "archival_object",
            RecordType::DigitalObject => "digital_object",
            RecordType::Accession => "accession",
            RecordType::Agent => "agent",
            RecordType::Subject => "subject",
        }
    }

    /// Whether records of this type sit in an archival hierarchy and carry a level.
    #[must_use]
    pub fn is_hierarchical(self) -> bool {
        matches!(self, RecordType::Resource | RecordType::ArchivalObject)
    }

    /// Whether records of this type are top-level descriptions.
    #[must_use]
    pub fn is_top_level(self) -> bool {
        matches!(self, RecordType::Resource)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = OaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OaiError::Config(format!("unknown record type '{s}'")))
    }
}

/// Position of a record in its type's harvest order.
///
/// Ordered by modification time first, then by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CursorKey {
    /// Last modification time of the record.
    pub mtime: DateTime<Utc>,
    /// Numeric identity of the record within its type.
    pub id: u64,
}

impl CursorKey {
    /// Create a cursor key.
    #[must_use]
    pub fn new(mtime: DateTime<Utc>, id: u64) -> Self {
        CursorKey { mtime, id }
    }
}

/// One link of a record's ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestor {
    /// URI of the ancestor record.
    pub uri: String,
    /// Whether the ancestor is published.
    pub publish: bool,
}

/// A record as seen by one harvesting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OaiRecord {
    /// Numeric identity within the record's type.
    pub id: u64,
    /// Record URI, e.g. `/repositories/2/resources/7`.
    pub uri: String,
    /// Kind of record.
    pub record_type: RecordType,
    /// Owning repository.
    pub repository_id: RepositoryId,
    /// Short code of the owning repository.
    pub repository_code: String,
    /// Own publish flag.
    pub publish: bool,
    /// Own suppression flag.
    pub suppressed: bool,
    /// Ancestors, nearest parent first, root last.
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
    /// Archival level (`fonds`, `series`, ...) for hierarchical types.
    pub level: Option<String>,
    /// Finding-aid sponsor; components carry their resource's sponsor.
    pub sponsor: Option<String>,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
    /// Deletion marker.
    #[serde(default)]
    pub deleted: bool,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Descriptive data handed to metadata mappers.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl OaiRecord {
    /// Create a published, unsuppressed record with no ancestors.
    ///
    /// The URI is derived from the repository, type and identity.
    #[must_use]
    pub fn new(
        record_type: RecordType,
        id: u64,
        repository_id: RepositoryId,
        repository_code: &str,
        mtime: DateTime<Utc>,
    ) -> Self {
        OaiRecord {
            id,
            uri: record_uri(repository_id, record_type, id),
            record_type,
            repository_id,
            repository_code: repository_code.to_string(),
            publish: true,
            suppressed: false,
            ancestors: Vec::new(),
            level: None,
            sponsor: None,
            mtime,
            deleted: false,
            title: String::new(),
            data: serde_json::Value::Null,
        }
    }

    /// Create a deletion marker for a record that no longer exists.
    #[must_use]
    pub fn tombstone(
        record_type: RecordType,
        id: u64,
        repository_id: RepositoryId,
        repository_code: &str,
        deleted_at: DateTime<Utc>,
    ) -> Self {
        let mut record = OaiRecord::new(record_type, id, repository_id, repository_code, deleted_at);
        record.deleted = true;
        record
    }

    /// Turn this record into a deletion marker carrying only its identity.
    #[must_use]
    pub fn into_tombstone(self) -> Self {
        OaiRecord {
            deleted: true,
            ancestors: Vec::new(),
            level: None,
            sponsor: None,
            title: String::new(),
            data: serde_json::Value::Null,
            ..self
        }
    }

    /// The record's position in harvest order.
    #[must_use]
    pub fn cursor_key(&self) -> CursorKey {
        CursorKey::new(self.mtime, self.id)
    }

    /// Whether the record is a deletion marker.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Set the ancestor chain (nearest first).
    #[must_use]
    pub fn with_ancestors(mut self, ancestors: Vec<Ancestor>) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Set the archival level.
    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = Some(level.to_string());
        self
    }

    /// Set the sponsor.
    #[must_use]
    pub fn with_sponsor(mut self, sponsor: &str) -> Self {
        self.sponsor = Some(sponsor.to_string());
        self
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Set the publish flag.
    #[must_use]
    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    /// Set the suppression flag.
    #[must_use]
    pub fn with_suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }
}

/// Build the canonical URI for a record.
#[must_use]
pub fn record_uri(repository_id: RepositoryId, record_type: RecordType, id: u64) -> String {
    let collection = match record_type {
        RecordType::Resource => "resources",
        RecordType::ArchivalObject => "archival_objects",
        RecordType::DigitalObject => "digital_objects",
        RecordType::Accession => "accessions",
        RecordType::Agent => "agents",
        RecordType::Subject => "subjects",
    };
    format!("/repositories/{repository_id}/{collection}/{id}")
}
