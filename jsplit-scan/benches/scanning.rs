use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsplit_scan::{end_state, ByteCursor};
use std::io::Cursor;

fn sample_records(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * 64);
    data.push(b'[');
    for i in 0..count {
        if i > 0 {
            data.push(b',');
        }
        data.extend_from_slice(
            format!(
                "{{\"id\":{i},\"name\":\"user-{i}\",\"tags\":[\"a\",\"b\"],\"meta\":{{\"ok\":true}}}}"
            )
            .as_bytes(),
        );
    }
    data.push(b']');
    data
}

fn bench_end_state(c: &mut Criterion) {
    let data = sample_records(10_000);
    let len = data.len() as u64;
    let mid = len / 2;

    c.bench_function("end_state/full", |b| {
        b.iter(|| {
            let mut cur = ByteCursor::new(Cursor::new(data.clone()));
            black_box(end_state(&mut cur, 0, len).unwrap())
        })
    });

    c.bench_function("end_state/second_half", |b| {
        b.iter(|| {
            let mut cur = ByteCursor::new(Cursor::new(data.clone()));
            black_box(end_state(&mut cur, mid, len).unwrap())
        })
    });
}

criterion_group!(benches, bench_end_state);
criterion_main!(benches);
