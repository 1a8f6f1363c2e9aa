//! Common test helpers and fixtures shared across the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use oaipmh_engine::{
    Ancestor, FindOptions, FindResult, FormatOptions, HarvestConfig, HarvestRequest,
    MapperRegistry, MemoryRecordSource, OaiProvider, OaiRecord, OaiRepository, RecordSource,
    RecordType, RepositoryId, SetDefinition,
};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub const MAIN: RepositoryId = RepositoryId(2);
pub const OTHER: RepositoryId = RepositoryId(3);

/// Timestamp `secs` seconds after the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A published resource.
pub fn resource(
    repo: RepositoryId,
    code: &str,
    id: u64,
    secs: i64,
    level: &str,
    sponsor: Option<&str>,
) -> OaiRecord {
    let mut record = OaiRecord::new(RecordType::Resource, id, repo, code, at(secs))
        .with_level(level)
        .with_title(&format!("Resource {id}"));
    if let Some(sponsor) = sponsor {
        record = record.with_sponsor(sponsor);
    }
    record
}

/// A published component directly below `root`, inheriting its sponsor.
pub fn component(root: &OaiRecord, id: u64, secs: i64, level: &str) -> OaiRecord {
    let mut record = OaiRecord::new(
        RecordType::ArchivalObject,
        id,
        root.repository_id,
        &root.repository_code,
        at(secs),
    )
    .with_level(level)
    .with_title(&format!("Component {id}"))
    .with_ancestors(vec![Ancestor {
        uri: root.uri.clone(),
        publish: root.publish,
    }]);
    record.sponsor = root.sponsor.clone();
    record
}

/// A small archive: four resources with two components each in `MAIN`,
/// one resource with one component in `OTHER`, plus an agent.
///
/// 5 resources and 9 archival objects in total.
pub fn archive() -> Vec<OaiRecord> {
    let resources = vec![
        resource(MAIN, "MAIN", 1, 100, "collection", Some("sponsor_0")),
        resource(MAIN, "MAIN", 2, 110, "fonds", Some("sponsor_1")),
        resource(MAIN, "MAIN", 3, 120, "fonds", Some("sponsor_0")),
        resource(MAIN, "MAIN", 4, 130, "collection", None),
    ];

    let mut records = Vec::new();
    for root in &resources {
        let base = i64::try_from(root.id).unwrap() * 10;
        records.push(component(root, root.id * 10 + 1, 100 + base + 1, "series"));
        records.push(component(root, root.id * 10 + 2, 100 + base + 2, "file"));
    }
    records.extend(resources);

    let other = resource(OTHER, "OTHER", 5, 140, "fonds", None);
    records.push(component(&other, 51, 141, "item"));
    records.push(other);

    records.push(OaiRecord::new(RecordType::Agent, 1, MAIN, "MAIN", at(90)));
    records
}

/// Source holding [`archive`].
pub fn archive_source() -> Arc<MemoryRecordSource> {
    Arc::new(MemoryRecordSource::with_records(archive()).unwrap())
}

/// Configuration with two named sets and `oai_dc` pages of `page_size`.
pub fn config(page_size: usize) -> HarvestConfig {
    let mut config = HarvestConfig {
        token_secret: "integration-secret".into(),
        ..HarvestConfig::default()
    };
    config
        .oai_sets
        .insert("sponsor_0".into(), SetDefinition::sponsors(["sponsor_0"]));
    config
        .oai_sets
        .insert("by_repo".into(), SetDefinition::repo_codes(["OTHER"]));
    config.formats.insert(
        "oai_dc".into(),
        FormatOptions::new(
            vec![RecordType::Resource, RecordType::ArchivalObject],
            page_size,
        )
        .unwrap(),
    );
    config
}

fn title_mapper(tag: &'static str) -> impl Fn(&OaiRecord) -> oaipmh_engine::Result<String> {
    move |record: &OaiRecord| -> oaipmh_engine::Result<String> {
        Ok(format!("<{tag}>{}</{tag}>", escape(record.title.as_str())))
    }
}

/// Mappers for `oai_dc` and `oai_ead`.
pub fn mappers() -> MapperRegistry {
    MapperRegistry::new()
        .with("oai_dc", title_mapper("dc:title"))
        .with("oai_ead", title_mapper("unittitle"))
}

pub fn provider(
    config: HarvestConfig,
    source: Arc<MemoryRecordSource>,
) -> OaiProvider<Arc<MemoryRecordSource>> {
    OaiProvider::new(config, mappers(), source).unwrap()
}

/// Follow resumption tokens until the listing ends, returning every page.
pub fn harvest<S: RecordSource + ?Sized>(
    repo: &OaiRepository<'_, S>,
    options: FindOptions,
) -> Vec<Vec<OaiRecord>> {
    let mut pages = Vec::new();
    let mut options = options;
    loop {
        match repo.find(&options).unwrap() {
            FindResult::Terminal(records) => {
                pages.push(records);
                return pages;
            },
            FindResult::Partial { records, token } => {
                pages.push(records);
                options = FindOptions::resume(repo.serialize_token(&token).unwrap());
            },
        }
    }
}

/// Interesting parts of a parsed OAI-PMH response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Response {
    pub error: Option<String>,
    pub request_attributes: Vec<(String, String)>,
    pub identifiers: Vec<String>,
    pub deleted: Vec<String>,
    pub set_specs: Vec<String>,
    pub metadata_prefixes: Vec<String>,
    pub metadata_count: usize,
    /// `Some("")` for an empty `<resumptionToken/>`.
    pub token: Option<String>,
    /// Text of every leaf element, by local name, in document order.
    pub texts: Vec<(String, String)>,
}

impl Response {
    pub fn text(&self, element: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(name, _)| name == element)
            .map(|(_, text)| text.as_str())
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Vec<(String, String)> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.unwrap();
            (
                String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
                attr.unescape_value().unwrap().into_owned(),
            )
        })
        .collect()
}

/// Parse a response envelope with quick-xml.
pub fn parse(xml: &str) -> Response {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut response = Response::default();
    let mut stack: Vec<String> = Vec::new();
    let mut deleted_header = false;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(start) => {
                let name = local_name(&start);
                match name.as_str() {
                    "header" => {
                        deleted_header = attributes(&start)
                            .iter()
                            .any(|(k, v)| k == "status" && v == "deleted");
                    },
                    "error" => {
                        response.error = attributes(&start)
                            .into_iter()
                            .find(|(k, _)| k == "code")
                            .map(|(_, v)| v);
                    },
                    "request" => response.request_attributes = attributes(&start),
                    "resumptionToken" => response.token = Some(String::new()),
                    "metadata" => response.metadata_count += 1,
                    _ => {},
                }
                stack.push(name);
            },
            Event::Empty(start) => match local_name(&start).as_str() {
                "resumptionToken" => response.token = Some(String::new()),
                "request" => response.request_attributes = attributes(&start),
                _ => {},
            },
            Event::Text(text) => {
                let text = text.unescape().unwrap().into_owned();
                let current = stack.last().cloned().unwrap_or_default();
                let parent = stack.iter().rev().nth(1).map(String::as_str);
                match (current.as_str(), parent) {
                    ("identifier", Some("header")) => {
                        if deleted_header {
                            response.deleted.push(text.clone());
                        }
                        response.identifiers.push(text.clone());
                    },
                    ("setSpec", _) => response.set_specs.push(text.clone()),
                    ("metadataPrefix", Some("metadataFormat")) => {
                        response.metadata_prefixes.push(text.clone());
                    },
                    ("resumptionToken", _) => response.token = Some(text.clone()),
                    _ => {},
                }
                response.texts.push((current, text));
            },
            Event::End(_) => {
                stack.pop();
            },
            Event::Eof => break,
            _ => {},
        }
    }
    response
}

/// Run a request through `provider` at a fixed response date.
pub fn request<S: RecordSource>(provider: &OaiProvider<S>, request: &HarvestRequest) -> Response {
    parse(&provider.process_request_at(request, at(1_700_000_000)).unwrap())
}

/// Follow a list verb through all its pages.
pub fn list_all<S: RecordSource>(provider: &OaiProvider<S>, first: HarvestRequest) -> Vec<Response> {
    let verb = first.verb.clone().unwrap();
    let mut responses = vec![request(provider, &first)];
    while let Some(token) = responses
        .last()
        .and_then(|r| r.token.clone())
        .filter(|t| !t.is_empty())
    {
        let next = HarvestRequest::new(&verb).with_resumption_token(&token);
        responses.push(request(provider, &next));
    }
    responses
}

/// OAI identifier of `record` under the default namespace.
pub fn oai_id(record: &OaiRecord) -> String {
    format!("oai:archivesspace/{}", record.uri)
}
