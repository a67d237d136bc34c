//! Criterion benchmarks for the conveyor traversal engine.
//!
//! Three benchmark groups:
//! - `screw_works`: 100 and 1,000 independent screw lines, full simulate pass
//! - `belt_chain`: one 5,000-belt chain, parallel vs sequential schedule
//! - `fan_out`: one supply split into a wide tree of splitters and merged back

use conveyor_core::component::Component;
use conveyor_core::factory::Factory;
use conveyor_core::id::{ComponentId, PortRef};
use conveyor_core::test_utils::*;
use conveyor_core::traversal::Schedule;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// ===========================================================================
// Factory builders
// ===========================================================================

fn belt_chain(len: usize, schedule: Schedule) -> Factory {
    let mut factory = Factory::default().with_schedule(schedule);
    let mut ids = factory.add([supply_node(iron_ore(), rate(30.0))]).unwrap();
    ids.extend(factory.add((0..len).map(|_| belt_mk1()).collect::<Vec<_>>()).unwrap());
    for pair in ids.windows(2) {
        factory
            .link(PortRef::new(pair[0], 0), PortRef::new(pair[1], 0))
            .unwrap();
    }
    factory
}

/// A supply feeding `depth` levels of three-way splitters, each leaf a belt
/// into a merger tree back down to one storage.
fn fan_out(depth: u32) -> Factory {
    let mut factory = Factory::default();
    let root = factory.add([supply_node(iron_ore(), rate(60.0))]).unwrap()[0];
    let mut frontier: Vec<(ComponentId, usize)> = vec![(root, 0)];
    for _ in 0..depth {
        let mut next = Vec::new();
        for (parent, port) in frontier {
            let split = factory.add([splitter()]).unwrap()[0];
            factory
                .link(PortRef::new(parent, port), PortRef::new(split, 0))
                .unwrap();
            next.extend((0..3).map(|p| (split, p)));
        }
        frontier = next;
    }
    while frontier.len() > 1 {
        let mut next = Vec::new();
        for group in frontier.chunks(3) {
            let merge = factory.add([merger()]).unwrap()[0];
            for (i, &(parent, port)) in group.iter().enumerate() {
                factory
                    .link(PortRef::new(parent, port), PortRef::new(merge, i))
                    .unwrap();
            }
            next.push((merge, 0));
        }
        frontier = next;
    }
    let sink = factory.add([storage_container()]).unwrap()[0];
    let (last, port) = frontier[0];
    factory
        .link(PortRef::new(last, port), PortRef::new(sink, 0))
        .unwrap();
    factory
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_screw_works(c: &mut Criterion) {
    let mut group = c.benchmark_group("screw_works");
    for lines in [100, 1_000] {
        let factory = screw_works(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &factory, |b, f| {
            b.iter(|| black_box(f.simulate()));
        });
    }
    group.finish();
}

fn bench_belt_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("belt_chain");
    for schedule in [Schedule::Parallel, Schedule::Sequential] {
        let factory = belt_chain(5_000, schedule);
        group.bench_function(format!("{schedule:?}"), |b| {
            b.iter(|| black_box(factory.traverse_all(&|c: &mut Component| c.process())));
        });
    }
    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let factory = fan_out(5);
    c.bench_function("fan_out/depth_5", |b| b.iter(|| black_box(factory.simulate())));
}

criterion_group!(benches, bench_screw_works, bench_belt_chain, bench_fan_out);
criterion_main!(benches);
