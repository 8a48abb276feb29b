use criterion::{black_box, criterion_group, criterion_main, Criterion};
use probe_harness::protocol::{marker_value, TestRequest, TestVerdict, POSITION_MARKER, PWM_MARKER};
use std::time::Duration;

pub fn bench_marker_parsing(c: &mut Criterion) {
    let lines = [
        "boot: probe v2 ready",
        "pwmRead: 2013",
        "position:1497\r",
        "noise pwmRead:2000 pwmRead:1999",
    ];

    c.bench_function("scan_response_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(marker_value(black_box(line), PWM_MARKER));
                black_box(marker_value(black_box(line), POSITION_MARKER));
            }
        })
    });
}

pub fn bench_verdict(c: &mut Criterion) {
    let request = TestRequest::new(2000, 1500);
    c.bench_function("evaluate_verdict", |b| {
        b.iter(|| black_box(TestVerdict::evaluate(&request, black_box(2049), black_box(1401))))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_marker_parsing, bench_verdict
}
criterion_main!(benches);
