//! Benchmarks des chemins purs de normalisation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use georef::query::STREET_KEYS;
use georef::{compose_place, translate_keys, DoorNumberRange, DoorNumberSide, Params, PlaceQuery};
use serde_json::{json, Value};

fn object(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

fn bench_extents(c: &mut Criterion) {
    let range = DoorNumberRange {
        start: DoorNumberSide {
            left: Some(100),
            right: Some(101),
        },
        end: DoorNumberSide {
            left: Some(200),
            right: Some(201),
        },
    };

    c.bench_function("extents_hit", |b| b.iter(|| range.extents(black_box(150))));
    c.bench_function("extents_miss", |b| b.iter(|| range.extents(black_box(9999))));
}

fn bench_translate(c: &mut Criterion) {
    let params = object(json!({
        "id": "0207001000045",
        "name": "Callao",
        "state": "CABA",
        "fields": ["id", "name", "full_name"],
        "flatten": true,
        "format": "json",
        "max": 10
    }));

    c.bench_function("translate_street_keys", |b| {
        b.iter(|| translate_keys(black_box(&params), STREET_KEYS, &["flatten", "format"]))
    });
}

fn bench_compose_place(c: &mut Criterion) {
    let query = PlaceQuery {
        lat: -34.6,
        lon: -58.4,
        fields: vec![],
    };
    let dept = object(json!({
        "id": "02007",
        "name": "Comuna 7",
        "state": {"id": "02", "name": "Ciudad Autónoma de Buenos Aires"}
    }));
    let muni = object(json!({"id": "020007", "name": "Municipio 7"}));

    c.bench_function("compose_place", |b| {
        b.iter(|| compose_place(&query, Some(dept.clone()), Some(muni.clone())))
    });
}

criterion_group!(benches, bench_extents, bench_translate, bench_compose_place);
criterion_main!(benches);
