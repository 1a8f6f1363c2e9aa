//! OAI-PMH front controller.
//!
//! [`OaiProvider`] takes a [`HarvestRequest`], validates it, drives the
//! [`OaiRepository`], dispatches each returned record to the metadata mapper
//! registered for the requested prefix, and renders the OAI-PMH 2.0 XML
//! envelope.
//!
//! Protocol errors are part of the normal response: they are rendered as
//! `<error code="...">` bodies. Only infrastructure failures (an unreadable
//! store, a failing mapper) surface as `Err`, after being logged.
//!
//! # Examples
//!
//! ```ignore
//! use oaipmh_engine::{HarvestConfig, HarvestRequest, MapperRegistry, MemoryRecordSource, OaiProvider};
//!
//! let mappers = MapperRegistry::new().with("oai_dc", my_dc_mapper);
//! let provider = OaiProvider::new(HarvestConfig::default(), mappers, MemoryRecordSource::new())?;
//!
//! let request = HarvestRequest::from_pairs([("verb", "ListRecords"), ("metadataPrefix", "oai_dc")]);
//! let xml = provider.process_request(&request)?;
//! # Ok::<(), oaipmh_engine::OaiError>(())
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use quick_xml::escape::escape;

use crate::config::HarvestConfig;
use crate::datestamp::{self, format_datestamp, Datestamp};
use crate::error::{OaiError, Result};
use crate::format::FormatRegistry;
use crate::mapper::MapperRegistry;
use crate::record::OaiRecord;
use crate::repository::{FindOptions, FindResult, OaiRepository};
use crate::request::{HarvestRequest, Verb};
use crate::source::RecordSource;

const OAI_NS: &str = "http://www.openarchives.org/OAI/2.0/";
const OAI_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Stateless OAI-PMH request processor.
#[derive(Debug)]
pub struct OaiProvider<S: RecordSource> {
    config: HarvestConfig,
    formats: FormatRegistry,
    mappers: MapperRegistry,
    source: S,
}

impl<S: RecordSource> OaiProvider<S> {
    /// Create a provider.
    ///
    /// Only metadata prefixes that have both format options and a mapper
    /// are disseminated.
    ///
    /// # Errors
    ///
    /// Returns [`OaiError::Config`] if the configuration is invalid.
    pub fn new(config: HarvestConfig, mappers: MapperRegistry, source: S) -> Result<Self> {
        config.validate()?;
        if !config.has_token_secret() {
            warn!("token_secret is empty; resumption tokens can be forged");
        }
        let mut formats = config.format_registry()?;
        formats.retain(|prefix| mappers.contains(prefix));
        Ok(OaiProvider {
            config,
            formats,
            mappers,
            source,
        })
    }

    /// The repository this provider drives.
    #[must_use]
    pub fn repository(&self) -> OaiRepository<'_, S> {
        OaiRepository::new(&self.source, &self.config, &self.formats)
    }

    /// The record source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Process a request, stamping the response with the current time.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the store or a mapper fails.
    /// Protocol errors are rendered into the returned XML.
    pub fn process_request(&self, request: &HarvestRequest) -> Result<String> {
        self.process_request_at(request, Utc::now())
    }

    /// Process a request, stamping the response with `now`.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the store or a mapper fails.
    pub fn process_request_at(
        &self,
        request: &HarvestRequest,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match self.dispatch(request) {
            Ok((verb, body)) => Ok(self.envelope(request, Some(verb), now, &body)),
            Err(e) => match e.protocol_code() {
                Some(code) => {
                    debug!("{code}: {}", e.detail());
                    let echo = match e {
                        OaiError::BadVerb(_) | OaiError::BadArgument(_) => None,
                        _ => request.validate().ok(),
                    };
                    let body = format!(
                        "<error code=\"{code}\">{}</error>",
                        escape(e.detail().as_str())
                    );
                    Ok(self.envelope(request, echo, now, &body))
                },
                None => {
                    error!("request failed: {e}");
                    Err(e)
                },
            },
        }
    }

    fn dispatch(&self, request: &HarvestRequest) -> Result<(Verb, String)> {
        let verb = request.validate()?;
        let body = match verb {
            Verb::Identify => self.identify()?,
            Verb::ListMetadataFormats => self.list_metadata_formats(request)?,
            Verb::ListSets => self.list_sets(request)?,
            Verb::GetRecord => self.get_record(request)?,
            Verb::ListIdentifiers | Verb::ListRecords => self.list(verb, request)?,
        };
        Ok((verb, body))
    }

    fn identify(&self) -> Result<String> {
        let earliest = self
            .source
            .earliest_datestamp()?
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let mut xml = String::from("<Identify>");
        write_element(&mut xml, "repositoryName", &self.config.repository_name);
        write_element(&mut xml, "baseURL", &self.config.base_url);
        write_element(&mut xml, "protocolVersion", "2.0");
        write_element(&mut xml, "adminEmail", &self.config.admin_email);
        write_element(&mut xml, "earliestDatestamp", &format_datestamp(earliest));
        write_element(&mut xml, "deletedRecord", "persistent");
        write_element(&mut xml, "granularity", "YYYY-MM-DDThh:mm:ssZ");
        xml.push_str("</Identify>");
        Ok(xml)
    }

    fn list_metadata_formats(&self, request: &HarvestRequest) -> Result<String> {
        let record_type = match request.identifier.as_deref() {
            Some(identifier) => {
                let uri = self.parse_identifier(identifier)?;
                Some(self.repository().locate(uri)?.record_type)
            },
            None => None,
        };

        let mut xml = String::from("<ListMetadataFormats>");
        let mut listed = 0;
        for format in self.formats.formats() {
            if let Some(record_type) = record_type {
                let supported = self
                    .formats
                    .options_for(&format.prefix)
                    .is_ok_and(|options| options.supports(record_type));
                if !supported {
                    continue;
                }
            }
            xml.push_str("<metadataFormat>");
            write_element(&mut xml, "metadataPrefix", &format.prefix);
            write_element(&mut xml, "schema", &format.schema);
            write_element(&mut xml, "metadataNamespace", &format.namespace);
            xml.push_str("</metadataFormat>");
            listed += 1;
        }
        xml.push_str("</ListMetadataFormats>");

        if listed == 0 {
            return Err(OaiError::CannotDisseminateFormat(
                "no metadata formats available".into(),
            ));
        }
        Ok(xml)
    }

    fn list_sets(&self, request: &HarvestRequest) -> Result<String> {
        if request.resumption_token.is_some() {
            return Err(OaiError::BadResumptionToken(
                "set listings are not paginated".into(),
            ));
        }
        let sets = self.config.set_resolver().list_sets();
        if sets.is_empty() {
            return Err(OaiError::NoSetHierarchy(
                "this repository does not support sets".into(),
            ));
        }

        let mut xml = String::from("<ListSets>");
        for set in sets {
            xml.push_str("<set>");
            write_element(&mut xml, "setSpec", &set.spec);
            write_element(&mut xml, "setName", &set.name);
            if let Some(description) = set.description {
                xml.push_str("<setDescription>");
                write_element(&mut xml, "description", &description);
                xml.push_str("</setDescription>");
            }
            xml.push_str("</set>");
        }
        xml.push_str("</ListSets>");
        Ok(xml)
    }

    fn get_record(&self, request: &HarvestRequest) -> Result<String> {
        let (Some(identifier), Some(prefix)) = (
            request.identifier.as_deref(),
            request.metadata_prefix.as_deref(),
        ) else {
            return Err(OaiError::BadArgument(
                "GetRecord needs identifier and metadataPrefix".into(),
            ));
        };
        let uri = self.parse_identifier(identifier)?;
        let record = self.repository().fetch(uri, prefix)?;

        let mut xml = String::from("<GetRecord>");
        self.write_record(&mut xml, &record, prefix, true)?;
        xml.push_str("</GetRecord>");
        Ok(xml)
    }

    fn list(&self, verb: Verb, request: &HarvestRequest) -> Result<String> {
        let resumed = request.resumption_token.is_some();
        let options = match request.resumption_token.as_deref() {
            Some(token) => FindOptions::resume(token),
            None => fresh_options(request)?,
        };

        let repository = self.repository();
        let page = repository.find(&options)?;
        let prefix = match (&page, request.metadata_prefix.as_deref()) {
            (FindResult::Partial { token, .. }, _) => token.metadata_prefix.clone(),
            (FindResult::Terminal(_), Some(prefix)) => prefix.to_string(),
            (FindResult::Terminal(_), None) => prefix_of_token(&repository, request)?,
        };

        if page.records().is_empty() && !resumed {
            return Err(OaiError::NoRecordsMatch(
                "no records match the request".into(),
            ));
        }

        let with_metadata = verb == Verb::ListRecords;
        let mut xml = format!("<{verb}>");
        for record in page.records() {
            self.write_record(&mut xml, record, &prefix, with_metadata)?;
        }
        match page.token() {
            Some(token) => {
                let encoded = repository.serialize_token(token)?;
                write_element(&mut xml, "resumptionToken", &encoded);
            },
            None if resumed => xml.push_str("<resumptionToken/>"),
            None => {},
        }
        write!(xml, "</{verb}>").ok();
        Ok(xml)
    }

    fn write_record(
        &self,
        xml: &mut String,
        record: &OaiRecord,
        prefix: &str,
        with_metadata: bool,
    ) -> Result<()> {
        if with_metadata {
            xml.push_str("<record>");
        }
        self.write_header(xml, record);
        if with_metadata {
            if !record.deleted {
                let metadata = self.mappers.map(prefix, record)?;
                xml.push_str("<metadata>");
                xml.push_str(&metadata);
                xml.push_str("</metadata>");
            }
            xml.push_str("</record>");
        }
        Ok(())
    }

    fn write_header(&self, xml: &mut String, record: &OaiRecord) {
        if record.deleted {
            xml.push_str("<header status=\"deleted\">");
        } else {
            xml.push_str("<header>");
        }
        write_element(xml, "identifier", &self.identifier_for(record));
        write_element(xml, "datestamp", &format_datestamp(record.mtime));
        if !record.deleted {
            for spec in self.config.set_resolver().memberships(record) {
                write_element(xml, "setSpec", &spec);
            }
        }
        xml.push_str("</header>");
    }

    /// OAI identifier of `record`: `oai:<namespace>/<uri>`.
    #[must_use]
    pub fn identifier_for(&self, record: &OaiRecord) -> String {
        format!("oai:{}/{}", self.config.identifier_namespace, record.uri)
    }

    fn parse_identifier<'i>(&self, identifier: &'i str) -> Result<&'i str> {
        identifier
            .strip_prefix("oai:")
            .and_then(|rest| rest.strip_prefix(self.config.identifier_namespace.as_str()))
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|uri| uri.starts_with('/'))
            .ok_or_else(|| OaiError::IdDoesNotExist(format!("unknown identifier '{identifier}'")))
    }

    fn envelope(
        &self,
        request: &HarvestRequest,
        verb: Option<Verb>,
        now: DateTime<Utc>,
        body: &str,
    ) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        write!(
            xml,
            "<OAI-PMH xmlns=\"{OAI_NS}\" xmlns:xsi=\"{XSI_NS}\" xsi:schemaLocation=\"{OAI_NS} {OAI_SCHEMA}\">"
        )
        .ok();
        write_element(&mut xml, "responseDate", &format_datestamp(now));

        xml.push_str("<request");
        if verb.is_some() {
            for (name, value) in request.arguments() {
                write!(xml, " {name}=\"{}\"", escape(value)).ok();
            }
        }
        write!(xml, ">{}</request>", escape(self.config.base_url.as_str())).ok();

        xml.push_str(body);
        xml.push_str("</OAI-PMH>\n");
        xml
    }
}

fn fresh_options(request: &HarvestRequest) -> Result<FindOptions> {
    let from = request.from.as_deref().map(datestamp::parse_from).transpose()?;
    let until = request
        .until
        .as_deref()
        .map(datestamp::parse_until)
        .transpose()?;
    if let (Some(from), Some(until)) = (from, until) {
        check_granularity(from, until)?;
    }

    let prefix = request.metadata_prefix.as_deref().unwrap_or_default();
    let mut options = FindOptions::fresh(prefix);
    options.set = request.set.clone();
    options.from = from.map(|d| d.value);
    options.until = until.map(|d| d.value);
    Ok(options)
}

fn prefix_of_token<S: RecordSource + ?Sized>(
    repository: &OaiRepository<'_, S>,
    request: &HarvestRequest,
) -> Result<String> {
    let raw = request
        .resumption_token
        .as_deref()
        .ok_or_else(|| OaiError::BadArgument("missing metadataPrefix".into()))?;
    Ok(repository.token_codec().deserialize(raw)?.metadata_prefix)
}

fn check_granularity(from: Datestamp, until: Datestamp) -> Result<()> {
    if from.granularity == until.granularity {
        Ok(())
    } else {
        Err(OaiError::BadArgument(
            "'from' and 'until' must have the same granularity".into(),
        ))
    }
}

fn write_element(xml: &mut String, tag: &str, value: &str) {
    write!(xml, "<{tag}>{}</{tag}>", escape(value)).ok();
}
