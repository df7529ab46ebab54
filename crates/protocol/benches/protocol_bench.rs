use criterion::{Criterion, criterion_group, criterion_main};
use protocol::{Event, Order, OrderItem, Product, SagaStatus};

fn make_event(lines: usize) -> Event {
    let products = (0..lines)
        .map(|i| OrderItem::new(Product::new(format!("SKU-{i:04}"), 9.99), (i % 7) as u32 + 1))
        .collect();
    let mut event = Event::for_order(Order::new("ORD-bench", "TXN-bench", products));
    event.transition("PRODUCT_VALIDATION_SERVICE", SagaStatus::Success, "ok");
    event.transition("PAYMENT_SERVICE", SagaStatus::Success, "charged");
    event
}

fn bench_encode_small(c: &mut Criterion) {
    let event = make_event(3);
    c.bench_function("protocol/encode_3_lines", |b| {
        b.iter(|| event.to_wire().unwrap());
    });
}

fn bench_encode_large(c: &mut Criterion) {
    let event = make_event(500);
    c.bench_function("protocol/encode_500_lines", |b| {
        b.iter(|| event.to_wire().unwrap());
    });
}

fn bench_roundtrip(c: &mut Criterion) {
    let wire = make_event(100).to_wire().unwrap();
    c.bench_function("protocol/roundtrip_100_lines", |b| {
        b.iter(|| {
            let event = Event::from_wire(&wire).unwrap();
            event.to_wire().unwrap()
        });
    });
}

criterion_group!(benches, bench_encode_small, bench_encode_large, bench_roundtrip);
criterion_main!(benches);
