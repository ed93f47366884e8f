use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec2;
use std::hint::black_box;

use gearworks_core::{Origin, World, derive_world};

/// Long chain of alternating meshed gears driven from one end
fn gear_chain(len: usize) -> Origin {
    let mut origin = Origin::default();
    let mut previous = None;
    for i in 0..len {
        let id = origin
            .insert_gear(Vec2::new(i as f32 * 2.0, 0.0), 1.0, 1.0)
            .expect("insert gear");
        match previous {
            Some(prev) => origin.connect(prev, id).expect("connect"),
            None => origin.set_anchored(id, true, 1.0).expect("anchor"),
        }
        previous = Some(id);
    }
    origin
}

fn bench_derive(c: &mut Criterion) {
    let origin = gear_chain(1_000);
    c.bench_function("derive_chain_1000", |b| {
        b.iter(|| derive_world(black_box(&origin)))
    });
}

fn bench_tick(c: &mut Criterion) {
    let mut world = World::new(gear_chain(1_000));
    c.bench_function("tick_chain_1000", |b| b.iter(|| world.tick(black_box(1.0 / 60.0))));
}

criterion_group!(benches, bench_derive, bench_tick);
criterion_main!(benches);
