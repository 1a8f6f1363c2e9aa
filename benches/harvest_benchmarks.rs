#![allow(missing_docs)]
//! Benchmarks for paginated harvesting.
//!
//! Measures full listings through the repository and the provider over an
//! in-memory archive, with and without heavy filtering.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use oaipmh_engine::{
    Ancestor, CursorKey, FindOptions, FindResult, HarvestConfig, HarvestRequest, MapperRegistry,
    MemoryRecordSource, OaiProvider, OaiRecord, OaiRepository, RecordType, RepositoryId,
    ResumptionToken, TokenCodec, TokenPosition,
};

/// `resources` resources with `components` components each; every
/// `hidden_every`-th resource is unpublished.
fn build_archive(resources: u64, components: u64, hidden_every: u64) -> MemoryRecordSource {
    let source = MemoryRecordSource::new();
    let repo = RepositoryId(2);
    for r in 1..=resources {
        let secs = i64::try_from(r).unwrap_or(i64::MAX);
        let root = OaiRecord::new(
            RecordType::Resource,
            r,
            repo,
            "MAIN",
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
        .with_level(if r % 2 == 0 { "fonds" } else { "collection" })
        .with_publish(hidden_every == 0 || r % hidden_every != 0);
        for c in 1..=components {
            let id = r * 1000 + c;
            source
                .upsert(
                    OaiRecord::new(
                        RecordType::ArchivalObject,
                        id,
                        repo,
                        "MAIN",
                        Utc.timestamp_opt(secs, 0).unwrap(),
                    )
                    .with_level("file")
                    .with_ancestors(vec![Ancestor {
                        uri: root.uri.clone(),
                        publish: root.publish,
                    }]),
                )
                .unwrap();
        }
        source.upsert(root).unwrap();
    }
    source
}

fn drain<S: oaipmh_engine::RecordSource>(repo: &OaiRepository<'_, S>, options: FindOptions) -> usize {
    let mut options = options;
    let mut count = 0;
    loop {
        match repo.find(&options).unwrap() {
            FindResult::Terminal(records) => return count + records.len(),
            FindResult::Partial { records, token } => {
                count += records.len();
                options = FindOptions::resume(repo.serialize_token(&token).unwrap());
            },
        }
    }
}

/// Benchmark a full `oai_dc` listing of 10,000 records.
fn benchmark_full_listing(c: &mut Criterion) {
    let source = build_archive(1000, 9, 0);
    let config = HarvestConfig::default();
    let formats = config.format_registry().unwrap();
    let repo = OaiRepository::new(&source, &config, &formats);

    c.bench_function("list_10k_records", |b| {
        b.iter(|| drain(&repo, black_box(FindOptions::fresh("oai_dc"))));
    });
}

/// Benchmark a listing where most candidates are filtered out.
fn benchmark_filtered_listing(c: &mut Criterion) {
    let source = build_archive(1000, 9, 3);
    let config = HarvestConfig::default();
    let formats = config.format_registry().unwrap();
    let repo = OaiRepository::new(&source, &config, &formats);

    c.bench_function("list_fonds_set_with_hidden_records", |b| {
        b.iter(|| drain(&repo, black_box(FindOptions::fresh("oai_dc").with_set("fonds"))));
    });
}

/// Benchmark rendering one ListRecords page.
fn benchmark_provider_page(c: &mut Criterion) {
    let mappers = MapperRegistry::new().with("oai_dc", |record: &OaiRecord| -> oaipmh_engine::Result<String> {
        Ok(format!("<dc:identifier>{}</dc:identifier>", record.uri))
    });
    let provider =
        OaiProvider::new(HarvestConfig::default(), mappers, build_archive(100, 9, 0)).unwrap();
    let request = HarvestRequest::new("ListRecords").with_metadata_prefix("oai_dc");

    c.bench_function("render_list_records_page", |b| {
        b.iter(|| provider.process_request(black_box(&request)).unwrap());
    });
}

/// Benchmark token encoding and decoding.
fn benchmark_token_codec(c: &mut Criterion) {
    let codec = TokenCodec::new("bench-secret");
    let token = ResumptionToken {
        metadata_prefix: "oai_dc".into(),
        set: Some("fonds".into()),
        from: None,
        until: None,
        position: TokenPosition {
            type_index: 1,
            last: CursorKey::new(Utc.timestamp_opt(1_700_000_000, 5).unwrap(), 4242),
        },
    };
    let wire = codec.serialize(&token).unwrap();

    c.bench_function("token_serialize", |b| {
        b.iter(|| codec.serialize(black_box(&token)).unwrap());
    });
    c.bench_function("token_deserialize", |b| {
        b.iter(|| codec.deserialize(black_box(&wire)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_full_listing,
    benchmark_filtered_listing,
    benchmark_provider_page,
    benchmark_token_codec
);
criterion_main!(benches);
