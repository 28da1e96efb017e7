use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledgerseal_core::{
    canonical_bytes, verify, KeyRecord, KeyRegistry, Keypair, LedgerEntry, Outcome, Signer,
    SubjectType,
};

fn sample() -> LedgerEntry {
    LedgerEntry::new(
        "01J0000000000000000000000",
        "2026-02-01T05:00:00.000Z",
        SubjectType::App,
        "com.example.app@4.2.0",
        "sv-0.1",
        Outcome::Partial,
        format!("sha256:{}", "ab".repeat(32)),
    )
    .with_subject_url("https://example.com/app")
    .with_score("repro", 7)
    .with_score("security", 8)
    .with_score("supply_chain", -2)
    .with_tag("nightly")
    .with_metadata("runner", "ci-3")
}

fn bench_canonical(c: &mut Criterion) {
    let entry = sample();
    c.bench_function("canonical_bytes", |b| {
        b.iter(|| canonical_bytes(black_box(&entry)))
    });
}

fn bench_sign_verify(c: &mut Criterion) {
    let keypair = Keypair::from_seed(&[7; 32]);
    let registry = KeyRegistry::new(
        "K1",
        KeyRecord::ed25519(keypair.public_key(), "2026-01-01T00:00:00.000Z"),
    );
    let signer = Signer::new(keypair);
    let entry = sample();

    c.bench_function("sign", |b| {
        b.iter(|| signer.sign(black_box(&entry), &registry))
    });

    let sealed = match signer.sign(&entry, &registry) {
        Ok(sealed) => sealed.into_entry(),
        Err(e) => panic!("sign failed: {e}"),
    };
    c.bench_function("verify", |b| b.iter(|| verify(black_box(&sealed), &registry)));
}

criterion_group!(benches, bench_canonical, bench_sign_verify);
criterion_main!(benches);
