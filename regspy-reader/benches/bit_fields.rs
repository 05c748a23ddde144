use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use regspy_reader::{
    ReadRequest, SymbolTable,
    bits::{decode_field, encode_field},
    catalog::armv7m,
    plan::Planner,
};

fn bit_fields(c: &mut Criterion) {
    let it: Vec<u8> = (10..16).chain(25..27).collect();
    c.bench_function("decode non-contiguous field", |b| {
        b.iter(|| decode_field(black_box(0x0700_FC00), black_box(&it)))
    });
    c.bench_function("encode non-contiguous field", |b| {
        b.iter(|| encode_field(black_box(0xFFFF_FFFF), black_box(&it), black_box(0xA5)))
    });

    let catalog = armv7m::catalog().expect("built-in catalog");
    let csr = catalog.get("SYST_CSR").expect("SYST_CSR");
    c.bench_function("describe register", |b| {
        b.iter(|| csr.describe(black_box(0x0001_0007)))
    });

    let symbols = SymbolTable::new();
    let requests: Vec<ReadRequest> = ["ENABLE", "TICKINT", "CLKSOURCE", "COUNTFLAG"]
        .into_iter()
        .map(|field| ReadRequest::mmap_bits("SYST_CSR", field))
        .chain(["SYST_RVR", "SYST_CVR", "SYST_CALIB"].map(ReadRequest::mmap))
        .collect();
    c.bench_function("plan batch", |b| {
        b.iter(|| Planner::new(&catalog, &symbols).plan(black_box(&requests)))
    });
}

criterion_group!(benches, bit_fields);
criterion_main!(benches);
