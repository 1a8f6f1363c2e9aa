//! Metadata formats and their harvesting options.
//!
//! Each metadata prefix a provider disseminates carries [`FormatOptions`]:
//! the ordered list of record types a listing walks through and the page
//! size. A listing exhausts the first type before moving to the next, so the
//! order of the list is part of the harvest order.
//!
//! | Prefix        | Record types                     |
//! |---------------|----------------------------------|
//! | `oai_dc`      | resource, archival object        |
//! | `oai_dcterms` | resource, archival object        |
//! | `oai_mods`    | resource, archival object        |
//! | `oai_marc`    | resource, archival object        |
//! | `oai_ead`     | resource                         |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{OaiError, Result};
use crate::record::RecordType;

/// Page size used when a format does not configure one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Per-prefix listing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatOptions {
    /// Record types in listing order.
    pub record_types: Vec<RecordType>,
    /// Maximum records per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl FormatOptions {
    /// Create validated options.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] if `record_types` is empty, repeats a
    /// type, or `page_size` is zero.
    pub fn new(record_types: Vec<RecordType>, page_size: usize) -> Result<Self> {
        let options = FormatOptions {
            record_types,
            page_size,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check the options' invariants.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.record_types.is_empty() {
            return Err(OaiError::Config("format lists no record types".into()));
        }
        if self.page_size == 0 {
            return Err(OaiError::Config("page size must be positive".into()));
        }
        for (i, t) in self.record_types.iter().enumerate() {
            if self.record_types[..i].contains(t) {
                return Err(OaiError::Config(format!("record type '{t}' listed twice")));
            }
        }
        Ok(())
    }

    /// Whether records of `record_type` are disseminated in this format.
    #[must_use]
    pub fn supports(&self, record_type: RecordType) -> bool {
        self.record_types.contains(&record_type)
    }
}

/// Description of a metadata format for ListMetadataFormats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFormat {
    /// The `metadataPrefix` harvesters use.
    pub prefix: String,
    /// XML schema location.
    pub schema: String,
    /// XML namespace of the metadata payload.
    pub namespace: String,
}

impl MetadataFormat {
    fn new(prefix: &str, schema: &str, namespace: &str) -> Self {
        MetadataFormat {
            prefix: prefix.to_string(),
            schema: schema.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct FormatEntry {
    format: MetadataFormat,
    options: FormatOptions,
}

/// Registry of metadata formats keyed by prefix, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    entries: IndexMap<String, FormatEntry>,
}

impl FormatRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        FormatRegistry::default()
    }

    /// Registry with the standard archival formats.
    #[must_use]
    pub fn standard() -> Self {
        let descriptive = vec![RecordType::Resource, RecordType::ArchivalObject];
        let mut registry = FormatRegistry::empty();

        let standard = [
            (
                MetadataFormat::new(
                    "oai_dc",
                    "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
                    "http://www.openarchives.org/OAI/2.0/oai_dc/",
                ),
                descriptive.clone(),
            ),
            (
                MetadataFormat::new(
                    "oai_dcterms",
                    "http://dublincore.org/schemas/xmls/qdc/2008/02/11/dcterms.xsd",
                    "http://purl.org/dc/terms/",
                ),
                descriptive.clone(),
            ),
            (
                MetadataFormat::new(
                    "oai_mods",
                    "https://www.loc.gov/standards/mods/v3/mods-3-6.xsd",
                    "http://www.loc.gov/mods/v3",
                ),
                descriptive.clone(),
            ),
            (
                MetadataFormat::new(
                    "oai_marc",
                    "https://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd",
                    "http://www.loc.gov/MARC21/slim",
                ),
                descriptive,
            ),
            (
                MetadataFormat::new(
                    "oai_ead",
                    "https://www.loc.gov/ead/ead.xsd",
                    "http://www.loc.gov/ead/",
                ),
                vec![RecordType::Resource],
            ),
        ];

        for (format, record_types) in standard {
            registry.insert(
                format,
                FormatOptions {
                    record_types,
                    page_size: DEFAULT_PAGE_SIZE,
                },
            );
        }
        registry
    }

    /// Register or replace a format.
    pub fn insert(&mut self, format: MetadataFormat, options: FormatOptions) {
        self.entries
            .insert(format.prefix.clone(), FormatEntry { format, options });
    }

    /// Replace the options of an already registered prefix.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] if the prefix is unknown or the options invalid.
    pub fn override_options(&mut self, prefix: &str, options: FormatOptions) -> Result<()> {
        options.validate()?;
        let entry = self
            .entries
            .get_mut(prefix)
            .ok_or_else(|| OaiError::Config(format!("unknown metadata prefix '{prefix}'")))?;
        entry.options = options;
        Ok(())
    }

    /// Options for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::CannotDisseminateFormat`] if the prefix is not registered.
    pub fn options_for(&self, prefix: &str) -> Result<&FormatOptions> {
        self.entries
            .get(prefix)
            .map(|entry| &entry.options)
            .ok_or_else(|| {
                OaiError::CannotDisseminateFormat(format!("unknown metadata prefix '{prefix}'"))
            })
    }

    /// Format description for `prefix`, if registered.
    #[must_use]
    pub fn format(&self, prefix: &str) -> Option<&MetadataFormat> {
        self.entries.get(prefix).map(|entry| &entry.format)
    }

    /// All registered formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &MetadataFormat> {
        self.entries.values().map(|entry| &entry.format)
    }

    /// Keep only the prefixes accepted by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|prefix, _| keep(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = FormatRegistry::standard();
        let dc = registry.options_for("oai_dc").unwrap();
        assert_eq!(
            dc.record_types,
            vec![RecordType::Resource, RecordType::ArchivalObject]
        );
        assert_eq!(dc.page_size, DEFAULT_PAGE_SIZE);

        let ead = registry.options_for("oai_ead").unwrap();
        assert!(!ead.supports(RecordType::ArchivalObject));
        assert_eq!(registry.formats().count(), 5);
    }

    #[test]
    fn test_unknown_prefix() {
        assert!(matches!(
            FormatRegistry::standard().options_for("oai_unknown"),
            Err(OaiError::CannotDisseminateFormat(_))
        ));
    }

    #[test]
    fn test_options_validation() {
        assert!(FormatOptions::new(vec![], 10).is_err());
        assert!(FormatOptions::new(vec![RecordType::Resource], 0).is_err());
        assert!(FormatOptions::new(vec![RecordType::Resource, RecordType::Resource], 5).is_err());
        assert!(FormatOptions::new(vec![RecordType::ArchivalObject], 2).is_ok());
    }

    #[test]
    fn test_override_options() {
        let mut registry = FormatRegistry::standard();
        let smaller = FormatOptions::new(vec![RecordType::ArchivalObject], 2).unwrap();
        registry.override_options("oai_dc", smaller.clone()).unwrap();
        assert_eq!(registry.options_for("oai_dc").unwrap(), &smaller);
        assert!(registry.override_options("nope", smaller).is_err());
    }
}
