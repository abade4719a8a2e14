use criterion::{Criterion, criterion_group, criterion_main};
use octofhir_hl7v2::*;
use std::hint::black_box;

fn create_registry() -> SchemaRegistry {
    SchemaRegistry::embedded().unwrap()
}

fn build_oru(registry: &SchemaRegistry, observations: usize) -> Message {
    let mut message = registry.new_message(Hl7Version::V2_5, "ORU_R01").unwrap();
    message.set("/MSH-9-1", "ORU").unwrap();
    message.set("/MSH-9-2", "R01").unwrap();
    message.set("/.PID-5-1-1", "Doe").unwrap();

    for i in 0..observations {
        let base = format!("/PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION({i})/OBX");
        message.set(&format!("{base}-3-1"), "GLU").unwrap();
        message.set(&format!("{base}-5"), i.to_string()).unwrap();
    }
    message
}

fn bench_library_parse(c: &mut Criterion) {
    let source = provider::embedded_source(Hl7Version::V2_5).unwrap();
    c.bench_function("library_parse_v25", |b| {
        b.iter(|| black_box(SchemaLibrary::from_json(source).unwrap()))
    });
}

fn bench_message_build(c: &mut Criterion) {
    let registry = create_registry();
    c.bench_function("oru_r01_50_observations", |b| {
        b.iter(|| black_box(build_oru(&registry, 50)))
    });
}

fn bench_repeated_access(c: &mut Criterion) {
    let registry = create_registry();
    let mut message = build_oru(&registry, 50);
    c.bench_function("path_get_existing", |b| {
        b.iter(|| {
            black_box(
                message
                    .get("/PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION(25)/OBX-5")
                    .unwrap()
                    .map(str::len),
            )
        })
    });
}

fn bench_reports(c: &mut Criterion) {
    let registry = create_registry();
    let message = build_oru(&registry, 50);
    c.bench_function("missing_required", |b| {
        b.iter(|| black_box(message.missing_required()))
    });
    c.bench_function("length_violations", |b| {
        b.iter(|| black_box(message.length_violations()))
    });
}

criterion_group!(
    benches,
    bench_library_parse,
    bench_message_build,
    bench_repeated_access,
    bench_reports
);
criterion_main!(benches);
