//! The harvesting repository: scanning, filtering and pagination.
//!
//! [`OaiRepository::find`] turns a listing request into one page of records.
//! It walks the format's record types in order, pulling bounded batches from
//! a [`RecordSource`] strictly after a cursor key, keeps the records that
//! pass the visibility rule and the set predicate, and stops as soon as it
//! knows whether anything remains beyond the page.
//!
//! # Pagination
//!
//! A page that leaves records behind comes back as [`FindResult::Partial`]
//! with a [`ResumptionToken`] pointing at the last returned record. A page
//! that drains the listing comes back as [`FindResult::Terminal`], even when
//! it is empty or consists only of deletion markers.
//!
//! Because the token stores a cursor key rather than an offset, records
//! inserted, updated or deleted between pages never cause the listing to
//! skip or repeat a record that stays put. A record whose modification moves
//! it behind an issued cursor is only seen again on the next full harvest.
//!
//! # Examples
//!
//! ```ignore
//! use oaipmh_engine::{FindOptions, FindResult, HarvestConfig, MemoryRecordSource, OaiRepository};
//!
//! let config = HarvestConfig::default();
//! let formats = config.format_registry()?;
//! let source = MemoryRecordSource::new();
//! let repo = OaiRepository::new(&source, &config, &formats);
//!
//! let mut options = FindOptions::fresh("oai_dc");
//! loop {
//!     match repo.find(&options)? {
//!         FindResult::Terminal(records) => break,
//!         FindResult::Partial { records, token } => {
//!             options = FindOptions::resume(repo.serialize_token(&token)?);
//!         }
//!     }
//! }
//! # Ok::<(), oaipmh_engine::OaiError>(())
//! ```

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};

use crate::config::HarvestConfig;
use crate::error::{OaiError, Result};
use crate::format::{FormatOptions, FormatRegistry};
use crate::record::OaiRecord;
use crate::set::{excluded_repositories, SetPredicate};
use crate::source::{RecordSource, ScanQuery};
use crate::token::{ResumptionToken, TokenCodec, TokenPosition};
use crate::visibility::{self, UnpublishedPolicy, VisibilityDecision};

/// Arguments of a listing request.
///
/// Either `metadata_prefix` (with optional `set`, `from`, `until`) or
/// `resumption_token` drives the request. Parameters given alongside a token
/// must agree with the ones the token was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Metadata prefix of a fresh request.
    pub metadata_prefix: Option<String>,
    /// Set spec.
    pub set: Option<String>,
    /// Inclusive lower bound on modification time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on modification time.
    pub until: Option<DateTime<Utc>>,
    /// Serialized resumption token of a continued request.
    pub resumption_token: Option<String>,
}

impl FindOptions {
    /// A fresh listing in `metadata_prefix`.
    #[must_use]
    pub fn fresh(metadata_prefix: &str) -> Self {
        FindOptions {
            metadata_prefix: Some(metadata_prefix.to_string()),
            ..FindOptions::default()
        }
    }

    /// A continuation of an earlier listing.
    #[must_use]
    pub fn resume(token: impl Into<String>) -> Self {
        FindOptions {
            resumption_token: Some(token.into()),
            ..FindOptions::default()
        }
    }

    /// Restrict to a set.
    #[must_use]
    pub fn with_set(mut self, set: &str) -> Self {
        self.set = Some(set.to_string());
        self
    }

    /// Restrict to records modified at or after `from`.
    #[must_use]
    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Restrict to records modified at or before `until`.
    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub enum FindResult {
    /// The last page; nothing remains.
    Terminal(Vec<OaiRecord>),
    /// A page with more to come.
    Partial {
        /// Records on this page.
        records: Vec<OaiRecord>,
        /// Where the next page starts.
        token: ResumptionToken,
    },
}

impl FindResult {
    /// Records on this page.
    #[must_use]
    pub fn records(&self) -> &[OaiRecord] {
        match self {
            FindResult::Terminal(records) | FindResult::Partial { records, .. } => records,
        }
    }

    /// Consume the page, keeping its records.
    #[must_use]
    pub fn into_records(self) -> Vec<OaiRecord> {
        match self {
            FindResult::Terminal(records) | FindResult::Partial { records, .. } => records,
        }
    }

    /// Token for the next page, if any.
    #[must_use]
    pub fn token(&self) -> Option<&ResumptionToken> {
        match self {
            FindResult::Terminal(_) => None,
            FindResult::Partial { token, .. } => Some(token),
        }
    }

    /// Whether this is the last page.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FindResult::Terminal(_))
    }
}

/// Resolved request: what to list and where to start.
struct Plan<'r> {
    metadata_prefix: String,
    set: Option<String>,
    predicate: Option<SetPredicate>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    options: &'r FormatOptions,
    start: Option<TokenPosition>,
}

/// Listing and lookup over a record source.
///
/// Holds only borrowed, immutable state; every call is independent.
#[derive(Debug)]
pub struct OaiRepository<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    config: &'a HarvestConfig,
    formats: &'a FormatRegistry,
    codec: TokenCodec,
}

impl<'a, S: RecordSource + ?Sized> OaiRepository<'a, S> {
    /// Create a repository over `source`.
    #[must_use]
    pub fn new(source: &'a S, config: &'a HarvestConfig, formats: &'a FormatRegistry) -> Self {
        OaiRepository {
            source,
            config,
            formats,
            codec: TokenCodec::new(&config.token_secret),
        }
    }

    /// The codec tokens are issued with.
    #[must_use]
    pub fn token_codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Serialize a token issued by [`find`](Self::find).
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be encoded.
    pub fn serialize_token(&self, token: &ResumptionToken) -> Result<String> {
        self.codec.serialize(token)
    }

    /// Produce the next page of a listing.
    ///
    /// # Errors
    ///
    /// - [`OaiError::CannotDisseminateFormat`] for an unknown prefix
    /// - [`OaiError::NoSetHierarchy`] for an unresolvable set
    /// - [`OaiError::BadResumptionToken`] for a corrupt or conflicting token
    /// - [`OaiError::BadArgument`] for a missing prefix or `from` after `until`
    /// - [`OaiError::Store`] if the record source fails
    pub fn find(&self, find_options: &FindOptions) -> Result<FindResult> {
        let plan = self.plan(find_options)?;
        let page_size = plan.options.page_size;
        let batch_size = self.config.batch_size_for(page_size);
        let excluded = excluded_repositories(&self.config.repositories, plan.set.as_deref());

        let (mut type_index, mut after) = match plan.start {
            Some(position) => (position.type_index, Some(position.last)),
            None => (0, None),
        };

        // One record beyond the page tells us whether a token is needed.
        let mut accepted: Vec<(usize, OaiRecord)> = Vec::new();
        let mut scanned = 0usize;

        'types: while type_index < plan.options.record_types.len() {
            let record_type = plan.options.record_types[type_index];
            loop {
                let query = ScanQuery {
                    record_type,
                    after,
                    from: plan.from,
                    until: plan.until,
                    excluded_repositories: &excluded,
                    limit: batch_size,
                };
                let batch = self.source.scan(&query).map_err(|e| {
                    log::error!("record scan failed for {record_type}: {e}");
                    e
                })?;
                let exhausted = batch.len() < batch_size;
                scanned += batch.len();

                for record in batch {
                    let key = record.cursor_key();
                    if after.is_some_and(|previous| key <= previous) {
                        return Err(OaiError::Store(format!(
                            "record source returned {} out of cursor order",
                            record.uri
                        )));
                    }
                    after = Some(key);

                    if let Some(record) = self.admit(record, plan.predicate.as_ref()) {
                        accepted.push((type_index, record));
                        if accepted.len() > page_size {
                            break 'types;
                        }
                    }
                }

                if exhausted {
                    break;
                }
            }
            type_index += 1;
            after = None;
        }

        debug!(
            "find {} set={:?}: scanned {scanned}, accepted {}",
            plan.metadata_prefix,
            plan.set,
            accepted.len().min(page_size)
        );

        if accepted.len() <= page_size {
            return Ok(FindResult::Terminal(
                accepted.into_iter().map(|(_, record)| record).collect(),
            ));
        }

        accepted.truncate(page_size);
        let Some(position) = accepted.last().map(|(index, record)| TokenPosition {
            type_index: *index,
            last: record.cursor_key(),
        }) else {
            return Ok(FindResult::Terminal(Vec::new()));
        };

        let token = ResumptionToken {
            metadata_prefix: plan.metadata_prefix,
            set: plan.set,
            from: plan.from,
            until: plan.until,
            position,
        };
        Ok(FindResult::Partial {
            records: accepted.into_iter().map(|(_, record)| record).collect(),
            token,
        })
    }

    /// Look up a single record as harvesters see it.
    ///
    /// Deleted records come back as deletion markers. Hidden records, and
    /// records in repositories with harvesting disabled, do not exist as far
    /// as harvesters are concerned.
    ///
    /// # Errors
    ///
    /// - [`OaiError::IdDoesNotExist`] if the record is unknown or not exposed
    /// - [`OaiError::Store`] if the record source fails
    pub fn locate(&self, uri: &str) -> Result<OaiRecord> {
        let not_found = || OaiError::IdDoesNotExist(format!("no record '{uri}'"));

        let record = self.source.get(uri)?.ok_or_else(not_found)?;

        if self
            .config
            .repository(record.repository_id)
            .is_some_and(|repo| !repo.admits(None))
        {
            debug!("{uri} belongs to repository {} with OAI disabled", record.repository_id);
            return Err(not_found());
        }

        if record.deleted {
            return Ok(record);
        }
        match visibility::decide(&record) {
            VisibilityDecision::Visible => Ok(record),
            VisibilityDecision::Hidden(reason) => {
                trace!("{uri} hidden: {reason:?}");
                match self.config.unpublished_policy {
                    UnpublishedPolicy::Omit => Err(not_found()),
                    UnpublishedPolicy::Tombstone => Ok(record.into_tombstone()),
                }
            },
        }
    }

    /// Fetch a single record for GetRecord.
    ///
    /// Applies the same exposure rules as [`locate`](Self::locate), then
    /// checks that the format covers the record's type.
    ///
    /// # Errors
    ///
    /// - [`OaiError::CannotDisseminateFormat`] for an unknown prefix, or a
    ///   record type the format does not cover
    /// - [`OaiError::IdDoesNotExist`] if the record is unknown or not exposed
    /// - [`OaiError::Store`] if the record source fails
    pub fn fetch(&self, uri: &str, metadata_prefix: &str) -> Result<OaiRecord> {
        let options = self.formats.options_for(metadata_prefix)?;
        let record = self.locate(uri)?;

        if !options.supports(record.record_type) {
            return Err(OaiError::CannotDisseminateFormat(format!(
                "{} records are not available as {metadata_prefix}",
                record.record_type
            )));
        }
        Ok(record)
    }

    fn plan(&self, find_options: &FindOptions) -> Result<Plan<'a>> {
        let plan = match &find_options.resumption_token {
            Some(raw) => self.plan_resumed(raw, find_options)?,
            None => self.plan_fresh(find_options)?,
        };

        if let (Some(from), Some(until)) = (plan.from, plan.until) {
            if from > until {
                return Err(OaiError::BadArgument(
                    "'from' must not be later than 'until'".into(),
                ));
            }
        }
        Ok(plan)
    }

    fn plan_fresh(&self, find_options: &FindOptions) -> Result<Plan<'a>> {
        let prefix = find_options
            .metadata_prefix
            .as_deref()
            .ok_or_else(|| OaiError::BadArgument("missing metadataPrefix".into()))?;
        let options = self.formats.options_for(prefix)?;
        let predicate = self.resolve_set(find_options.set.as_deref())?;

        Ok(Plan {
            metadata_prefix: prefix.to_string(),
            set: find_options.set.clone(),
            predicate,
            from: find_options.from,
            until: find_options.until,
            options,
            start: None,
        })
    }

    fn plan_resumed(&self, raw: &str, find_options: &FindOptions) -> Result<Plan<'a>> {
        let token = self.codec.deserialize(raw).map_err(|e| {
            warn!("rejected resumption token: {e}");
            e
        })?;

        let conflicts = find_options
            .metadata_prefix
            .as_ref()
            .is_some_and(|p| *p != token.metadata_prefix)
            || find_options.set.as_ref().is_some_and(|s| Some(s) != token.set.as_ref())
            || find_options.from.is_some_and(|f| Some(f) != token.from)
            || find_options.until.is_some_and(|u| Some(u) != token.until);
        if conflicts {
            return Err(OaiError::BadResumptionToken(
                "request arguments conflict with the resumption token".into(),
            ));
        }

        let options = self
            .formats
            .options_for(&token.metadata_prefix)
            .map_err(|_| {
                OaiError::BadResumptionToken(format!(
                    "token names unknown format '{}'",
                    token.metadata_prefix
                ))
            })?;
        if token.position.type_index >= options.record_types.len() {
            return Err(OaiError::BadResumptionToken(
                "token position is outside the format's record types".into(),
            ));
        }
        let predicate = self.resolve_set(token.set.as_deref())?;

        Ok(Plan {
            metadata_prefix: token.metadata_prefix,
            set: token.set,
            predicate,
            from: token.from,
            until: token.until,
            options,
            start: Some(token.position),
        })
    }

    fn resolve_set(&self, set: Option<&str>) -> Result<Option<SetPredicate>> {
        set.map(|name| self.config.set_resolver().resolve(name))
            .transpose()
    }

    /// Apply visibility and set membership; `None` drops the record.
    fn admit(&self, record: OaiRecord, predicate: Option<&SetPredicate>) -> Option<OaiRecord> {
        if record.deleted {
            return Some(record);
        }
        let in_set = predicate.map_or(true, |p| p.matches(&record));
        match visibility::decide(&record) {
            VisibilityDecision::Visible => in_set.then_some(record),
            VisibilityDecision::Hidden(reason) => {
                trace!("{} hidden: {reason:?}", record.uri);
                match self.config.unpublished_policy {
                    UnpublishedPolicy::Omit => None,
                    UnpublishedPolicy::Tombstone => in_set.then(|| record.into_tombstone()),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Ancestor, CursorKey, RecordType, RepositoryId};
    use crate::set::SetDefinition;
    use crate::source::MemoryRecordSource;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn small_pages(page_size: usize) -> (HarvestConfig, FormatRegistry) {
        let config = HarvestConfig {
            token_secret: "test".into(),
            ..HarvestConfig::default()
        };
        let mut formats = FormatRegistry::standard();
        formats
            .override_options(
                "oai_dc",
                FormatOptions::new(vec![RecordType::Resource, RecordType::ArchivalObject], page_size)
                    .unwrap(),
            )
            .unwrap();
        (config, formats)
    }

    fn resource(id: u64, secs: i64) -> OaiRecord {
        OaiRecord::new(RecordType::Resource, id, RepositoryId(2), "MAIN", at(secs))
            .with_level("collection")
    }

    fn component(id: u64, secs: i64, root: &OaiRecord) -> OaiRecord {
        OaiRecord::new(RecordType::ArchivalObject, id, RepositoryId(2), "MAIN", at(secs))
            .with_level("series")
            .with_ancestors(vec![Ancestor {
                uri: root.uri.clone(),
                publish: true,
            }])
    }

    #[test]
    fn test_five_records_in_pages_of_two() {
        let (config, formats) = small_pages(2);
        let source =
            MemoryRecordSource::with_records((1u8..=5).map(|i| resource(u64::from(i), 100 + i64::from(i))))
                .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let page1 = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        assert_eq!(page1.records().len(), 2);
        let token1 = repo.serialize_token(page1.token().unwrap()).unwrap();

        let page2 = repo.find(&FindOptions::resume(token1)).unwrap();
        assert_eq!(page2.records().len(), 2);
        let token2 = repo.serialize_token(page2.token().unwrap()).unwrap();

        let page3 = repo.find(&FindOptions::resume(token2)).unwrap();
        assert!(page3.is_terminal());
        assert_eq!(page3.records().len(), 1);
        assert_eq!(page3.records()[0].id, 5);
    }

    #[test]
    fn test_unbounded_page_size_lists_everything() {
        let (config, formats) = small_pages(usize::MAX);
        let source =
            MemoryRecordSource::with_records((1u8..=3).map(|i| resource(u64::from(i), 100 + i64::from(i))))
                .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let page = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        assert!(page.is_terminal());
        assert_eq!(page.records().len(), 3);
    }

    #[test]
    fn test_page_continues_into_next_type() {
        let (config, formats) = small_pages(3);
        let root = resource(1, 10);
        let source = MemoryRecordSource::with_records(vec![
            root.clone(),
            component(1, 5, &root),
            component(2, 6, &root),
        ])
        .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let page = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        assert!(page.is_terminal());
        let types: Vec<RecordType> = page.records().iter().map(|r| r.record_type).collect();
        assert_eq!(
            types,
            vec![
                RecordType::Resource,
                RecordType::ArchivalObject,
                RecordType::ArchivalObject
            ]
        );
    }

    #[test]
    fn test_exactly_full_last_page_is_terminal() {
        let (config, formats) = small_pages(2);
        let source = MemoryRecordSource::with_records(vec![resource(1, 1), resource(2, 2)]).unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);
        let page = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        assert!(page.is_terminal());
        assert_eq!(page.records().len(), 2);
    }

    #[test]
    fn test_hidden_records_are_skipped_without_short_pages() {
        let (mut config, formats) = small_pages(2);
        config.scan_batch_size = 1;
        let source = MemoryRecordSource::with_records(vec![
            resource(1, 1),
            resource(2, 2).with_publish(false),
            resource(3, 3).with_suppressed(true),
            resource(4, 4),
            resource(5, 5),
        ])
        .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let page = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        let ids: Vec<u64> = page.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(!page.is_terminal());
    }

    #[test]
    fn test_tombstone_policy_reports_hidden_records_as_deleted() {
        let (mut config, formats) = small_pages(10);
        config.unpublished_policy = UnpublishedPolicy::Tombstone;
        let source =
            MemoryRecordSource::with_records(vec![resource(1, 1), resource(2, 2).with_publish(false)])
                .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let records = repo.find(&FindOptions::fresh("oai_dc")).unwrap().into_records();
        assert_eq!(records.len(), 2);
        assert!(!records[0].deleted);
        assert!(records[1].deleted);
    }

    #[test]
    fn test_token_conflicting_with_request_is_rejected() {
        let (config, formats) = small_pages(1);
        let source = MemoryRecordSource::with_records(vec![resource(1, 1), resource(2, 2)]).unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let page = repo.find(&FindOptions::fresh("oai_dc")).unwrap();
        let token = repo.serialize_token(page.token().unwrap()).unwrap();

        let mut conflicting = FindOptions::resume(token.clone());
        conflicting.metadata_prefix = Some("oai_ead".into());
        assert!(matches!(
            repo.find(&conflicting),
            Err(OaiError::BadResumptionToken(_))
        ));

        let mut consistent = FindOptions::resume(token);
        consistent.metadata_prefix = Some("oai_dc".into());
        assert!(repo.find(&consistent).is_ok());
    }

    #[test]
    fn test_request_errors() {
        let (config, formats) = small_pages(2);
        let source = MemoryRecordSource::new();
        let repo = OaiRepository::new(&source, &config, &formats);

        assert!(matches!(
            repo.find(&FindOptions::fresh("oai_nope")),
            Err(OaiError::CannotDisseminateFormat(_))
        ));
        assert!(matches!(
            repo.find(&FindOptions::fresh("oai_dc").with_set("no_such_set")),
            Err(OaiError::NoSetHierarchy(_))
        ));
        assert!(matches!(
            repo.find(&FindOptions::resume("garbage")),
            Err(OaiError::BadResumptionToken(_))
        ));
        assert!(matches!(
            repo.find(&FindOptions::fresh("oai_dc").with_from(at(10)).with_until(at(5))),
            Err(OaiError::BadArgument(_))
        ));
        assert!(matches!(
            repo.find(&FindOptions::default()),
            Err(OaiError::BadArgument(_))
        ));
    }

    #[test]
    fn test_token_outside_type_list_is_rejected() {
        let (config, formats) = small_pages(2);
        let source = MemoryRecordSource::new();
        let repo = OaiRepository::new(&source, &config, &formats);
        let token = ResumptionToken {
            metadata_prefix: "oai_ead".into(),
            set: None,
            from: None,
            until: None,
            position: TokenPosition {
                type_index: 1,
                last: CursorKey::new(at(1), 1),
            },
        };
        let raw = repo.serialize_token(&token).unwrap();
        assert!(matches!(
            repo.find(&FindOptions::resume(raw)),
            Err(OaiError::BadResumptionToken(_))
        ));
    }

    #[test]
    fn test_sponsor_set_with_resource_only_format() {
        let mut config = HarvestConfig::default();
        config
            .oai_sets
            .insert("sponsor_0".into(), SetDefinition::sponsors(["sponsor_0"]));
        let mut formats = FormatRegistry::standard();
        formats
            .override_options("oai_dc", FormatOptions::new(vec![RecordType::Resource], 5).unwrap())
            .unwrap();
        let source = MemoryRecordSource::with_records(vec![
            resource(1, 1).with_sponsor("sponsor_0"),
            resource(2, 2).with_sponsor("sponsor_1"),
            resource(3, 3),
        ])
        .unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        let records = repo
            .find(&FindOptions::fresh("oai_dc").with_set("sponsor_0"))
            .unwrap()
            .into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sponsor.as_deref(), Some("sponsor_0"));
    }

    #[test]
    fn test_fetch_rules() {
        let (mut config, formats) = small_pages(2);
        config.repositories.push(crate::set::RepositoryConfig {
            id: RepositoryId(9),
            repo_code: "OFF".into(),
            oai_disabled: true,
            sets_available: vec![],
        });
        let root = resource(1, 1);
        let child = component(2, 2, &root);
        let closed = OaiRecord::new(RecordType::Resource, 3, RepositoryId(9), "OFF", at(3));
        let source =
            MemoryRecordSource::with_records(vec![root.clone(), child.clone(), closed.clone()]).unwrap();
        let repo = OaiRepository::new(&source, &config, &formats);

        assert_eq!(repo.fetch(&child.uri, "oai_dc").unwrap().id, 2);
        assert!(matches!(
            repo.fetch(&child.uri, "oai_ead"),
            Err(OaiError::CannotDisseminateFormat(_))
        ));
        assert!(matches!(
            repo.fetch(&closed.uri, "oai_dc"),
            Err(OaiError::IdDoesNotExist(_))
        ));
        assert!(matches!(
            repo.fetch("/repositories/2/resources/404", "oai_dc"),
            Err(OaiError::IdDoesNotExist(_))
        ));

        source.set_publish(&root.uri, false, at(10)).unwrap();
        assert!(matches!(
            repo.fetch(&child.uri, "oai_dc"),
            Err(OaiError::IdDoesNotExist(_))
        ));

        source.delete(&root.uri, at(11)).unwrap();
        assert!(repo.fetch(&root.uri, "oai_dc").unwrap().deleted);
    }
}
