use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nc_core::url::classify;

const URLS: [&str; 6] = [
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123&index=4",
    "https://youtu.be/dQw4w9WgXcQ?t=42",
    "https://m.youtube.com/shorts/abc123def",
    "https://www.youtube.com/feed/trending",
    "https://www.yout-ube.com/embed/dQw4w9WgXcQ",
    "https://example.com/watch?v=nope",
];

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_mixed", |b| {
        b.iter(|| {
            for url in URLS {
                black_box(classify(black_box(url)));
            }
        })
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
