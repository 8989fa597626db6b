use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Map, Value, json};
use url::Url;

use datasrc::builders::{
    BoltDbUrlBuilder, GitUrlBuilder, HttpUrlBuilder, PathJoinFlavor, PathJoinUrlBuilder, UrlBuilder,
};
use datasrc::data::merge_maps;

fn bench_build_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_url");

    let http = Url::parse("https://example.com/api/?a=b&c=d").unwrap();
    group.bench_function("http", |b| {
        b.iter(|| black_box(HttpUrlBuilder.build_url(&http, &["v1/items.json?c=e"]).unwrap()));
    });

    let blob = Url::parse("s3://bucket/prefix/?region=us-east-1").unwrap();
    let path_join = PathJoinUrlBuilder::new(PathJoinFlavor::Stripped);
    group.bench_function("path_join", |b| {
        b.iter(|| black_box(path_join.build_url(&blob, &["sub/key.yaml"]).unwrap()));
    });

    let bolt = Url::parse("boltdb:///tmp/config.db?type=text/csv#Bucket1").unwrap();
    group.bench_function("boltdb", |b| {
        b.iter(|| black_box(BoltDbUrlBuilder.build_url(&bolt, &["key1?type=application/json"]).unwrap()));
    });

    let git = Url::parse("git+https://github.com/org/repo//conf?depth=1#main").unwrap();
    group.bench_function("git", |b| {
        b.iter(|| black_box(GitUrlBuilder.build_url(&git, &["sub/file.json?x=y#dev"]).unwrap()));
    });

    group.finish();
}

/// `count` maps sharing a nested key, so every level collides
fn overlapping_maps(count: usize, width: usize) -> Vec<Map<String, Value>> {
    (0..count)
        .map(|i| {
            let mut m = Map::new();
            for k in 0..width {
                m.insert(format!("key_{k}"), json!(format!("value_{i}_{k}")));
            }
            m.insert(
                "nested".to_string(),
                json!({ format!("only_{i}"): i, "shared": { "depth": i } }),
            );
            m
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_maps");

    for count in [2, 5, 20] {
        let maps = overlapping_maps(count, 50);
        group.bench_with_input(BenchmarkId::from_parameter(count), &maps, |b, maps| {
            b.iter(|| black_box(merge_maps(maps.iter().cloned())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_url, bench_merge);
criterion_main!(benches);
