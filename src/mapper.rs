//! Metadata mapper dispatch.
//!
//! Mapping a record into a concrete vocabulary (Dublin Core, MODS, EAD, ...)
//! is the job of a [`MetadataMapper`]. Mappers are registered once, at
//! startup, under the metadata prefix they serve; the provider looks them up
//! by prefix for every non-deleted record it returns.

use std::collections::HashMap;
use std::fmt;

use crate::error::{OaiError, Result};
use crate::record::OaiRecord;

/// Turns a record into the XML payload of one metadata format.
pub trait MetadataMapper: Send + Sync {
    /// Produce the `<metadata>` content for `record`.
    ///
    /// The returned string is embedded verbatim and must be well-formed XML.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Mapping`] if the record cannot be expressed in
    /// this format.
    fn map(&self, record: &OaiRecord) -> Result<String>;
}

impl<F> MetadataMapper for F
where
    F: Fn(&OaiRecord) -> Result<String> + Send + Sync,
{
    fn map(&self, record: &OaiRecord) -> Result<String> {
        self(record)
    }
}

/// Mappers keyed by metadata prefix.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<String, Box<dyn MetadataMapper>>,
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefixes: Vec<&String> = self.mappers.keys().collect();
        prefixes.sort();
        f.debug_struct("MapperRegistry")
            .field("prefixes", &prefixes)
            .finish()
    }
}

impl MapperRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        MapperRegistry::default()
    }

    /// Register `mapper` for `prefix`, replacing any earlier one.
    #[must_use]
    pub fn with(mut self, prefix: &str, mapper: impl MetadataMapper + 'static) -> Self {
        self.register(prefix, mapper);
        self
    }

    /// Register `mapper` for `prefix`, replacing any earlier one.
    pub fn register(&mut self, prefix: &str, mapper: impl MetadataMapper + 'static) {
        self.mappers.insert(prefix.to_string(), Box::new(mapper));
    }

    /// Whether a mapper is registered for `prefix`.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.mappers.contains_key(prefix)
    }

    /// Map `record` with the mapper registered for `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::CannotDisseminateFormat`] if no mapper serves the
    /// prefix, or the mapper's own error.
    pub fn map(&self, prefix: &str, record: &OaiRecord) -> Result<String> {
        let mapper = self.mappers.get(prefix).ok_or_else(|| {
            OaiError::CannotDisseminateFormat(format!("no mapper for '{prefix}'"))
        })?;
        mapper.map(record)
    }
}
