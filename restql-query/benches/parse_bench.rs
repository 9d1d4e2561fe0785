//! Parse and assembly latency benchmarks
//!
//! Run with: cargo bench -p restql-query

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use restql_common::config::QueryLimitsConfig;
use restql_query::{ParseOptions, QueryParser, SqlAssembler};

const SIMPLE: &str = "select=id,name&status=eq.active&order=created_at.desc&limit=20";

const COMPLEX: &str = "select=region,count(*),total:sum(amount)\
    &or=(status.eq.active,and(priority.gte.3,owner.is.null))\
    &tags.in=(a,b,c)&data->stats->>score=gt.10\
    &recorded_at=gte.2025-01-01&recorded_at=lte.2025-12-31\
    &group_by=region&order=region.asc.nullslast&limit=500&offset=9500";

const VECTOR: &str = "select=id&order=embedding.vec_cos.[0.12,0.48,0.33,0.91].asc&limit=10";

fn bench_parse(c: &mut Criterion) {
    let parser = QueryParser::new(QueryLimitsConfig {
        max_page_size: 1000,
        max_total_results: 10_000,
        default_page_size: 100,
    });

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    for (name, query) in [("simple", SIMPLE), ("complex", COMPLEX), ("vector", VECTOR)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                parser
                    .parse_query_string(black_box(query), ParseOptions::default())
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_parse_and_assemble(c: &mut Criterion) {
    let parser = QueryParser::default();
    let assembler = SqlAssembler::new("events");

    let mut group = c.benchmark_group("parse_and_assemble");
    group.throughput(Throughput::Elements(1));

    group.bench_function("complex", |b| {
        b.iter(|| {
            let params = parser
                .parse_query_string(black_box(COMPLEX), ParseOptions::default())
                .unwrap();
            assembler.select(&params).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_parse_and_assemble);
criterion_main!(benches);
