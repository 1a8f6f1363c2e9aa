#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # OAI-PMH harvesting engine
//!
//! Selective harvesting over a store of archival records: cursor-based
//! pagination, set membership, visibility rules and deletion markers, with an
//! OAI-PMH 2.0 front controller on top.
//!
//! ## Quick Start
//!
//! ### Paging through a listing
//!
//! ```ignore
//! use oaipmh_engine::{FindOptions, FindResult, HarvestConfig, MemoryRecordSource, OaiRepository};
//!
//! # fn main() -> oaipmh_engine::Result<()> {
//! let config = HarvestConfig::from_path("oai.json")?;
//! let formats = config.format_registry()?;
//! let source = MemoryRecordSource::new();
//! let repo = OaiRepository::new(&source, &config, &formats);
//!
//! let page = repo.find(&FindOptions::fresh("oai_dc").with_set("fonds"))?;
//! for record in page.records() {
//!     println!("{} {}", record.uri, record.mtime);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Answering protocol requests
//!
//! ```ignore
//! use oaipmh_engine::{HarvestConfig, HarvestRequest, MapperRegistry};
//! use oaipmh_engine::{MemoryRecordSource, OaiProvider, OaiRecord};
//!
//! # fn main() -> oaipmh_engine::Result<()> {
//! let mappers = MapperRegistry::new().with("oai_dc", |record: &OaiRecord| -> oaipmh_engine::Result<String> {
//!     Ok(format!("<dc:title>{}</dc:title>", record.title))
//! });
//! let provider = OaiProvider::new(HarvestConfig::default(), mappers, MemoryRecordSource::new())?;
//!
//! let request = HarvestRequest::from_pairs([("verb", "Identify")]);
//! println!("{}", provider.process_request(&request)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`] - Harvestable records, record types and cursor keys
//! - [`source`] - The [`RecordSource`] trait and an in-memory store
//! - [`visibility`] - Publish, suppression and ancestor rules
//! - [`set`] - Set resolution and per-repository gating
//! - [`format`] - Metadata formats and their per-format options
//! - [`token`] - Resumption token encoding
//! - [`repository`] - Scanning, filtering and pagination
//! - [`request`] - Verb and argument validation
//! - [`provider`] - OAI-PMH responses
//! - [`mapper`] - Metadata mapper dispatch
//! - [`datestamp`] - Datestamp parsing and rendering
//! - [`config`] - Engine configuration
//! - [`error`] - Error types and result type

pub mod config;
pub mod datestamp;
pub mod error;
pub mod format;
pub mod mapper;
pub mod provider;
pub mod record;
pub mod repository;
pub mod request;
pub mod set;
pub mod source;
pub mod token;
pub mod visibility;

pub use config::HarvestConfig;
pub use error::{OaiError, Result};
pub use format::{FormatOptions, FormatRegistry, MetadataFormat};
pub use mapper::{MapperRegistry, MetadataMapper};
pub use provider::OaiProvider;
pub use record::{Ancestor, CursorKey, OaiRecord, RecordType, RepositoryId};
pub use repository::{FindOptions, FindResult, OaiRepository};
pub use request::{HarvestRequest, Verb};
pub use set::{RepositoryConfig, SetDefinition, SetPredicate, SetResolver};
pub use source::{MemoryRecordSource, RecordSource, ScanQuery};
pub use token::{ResumptionToken, TokenCodec, TokenPosition};
pub use visibility::{UnpublishedPolicy, VisibilityDecision};
