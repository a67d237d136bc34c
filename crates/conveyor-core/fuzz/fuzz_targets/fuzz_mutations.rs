#![no_main]
use arbitrary::Arbitrary;
use conveyor_core::component::{Component, Purity};
use conveyor_core::factory::{Direction, Factory};
use conveyor_core::id::{ComponentId, PortRef};
use conveyor_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

/// A structured edit for fuzzing. Links may point backwards, so cycles are
/// expected and must be reported rather than hang a pass.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddNode,
    AddBelt,
    AddMerger,
    AddSplitter,
    AddSmelter,
    Link { from: u8, out: u8, to: u8, input: u8 },
    Connect { from: u8, to: u8, reverse: bool },
    Unlink { index: u8, out: u8 },
    Remove { index: u8 },
    Simulate,
    Drain,
    Purge,
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn pick(ids: &[ComponentId], index: u8) -> Option<ComponentId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index as usize % ids.len()])
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut factory = Factory::default();
    let mut ids: Vec<ComponentId> = Vec::new();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        let added: Option<Component> = match op {
            FuzzOp::AddNode => Some(iron_node(Purity::Normal)),
            FuzzOp::AddBelt => Some(belt_mk1()),
            FuzzOp::AddMerger => Some(merger()),
            FuzzOp::AddSplitter => Some(splitter()),
            FuzzOp::AddSmelter => Some(smelter()),
            _ => None,
        };
        if let Some(component) = added {
            ids.extend(factory.add([component]).unwrap());
            continue;
        }
        match *op {
            FuzzOp::Link { from, out, to, input } => {
                if let (Some(a), Some(b)) = (pick(&ids, from), pick(&ids, to)) {
                    let _ = factory.link(
                        PortRef::new(a, out as usize % 4),
                        PortRef::new(b, input as usize % 4),
                    );
                }
            }
            FuzzOp::Connect { from, to, reverse } => {
                if let (Some(a), Some(b)) = (pick(&ids, from), pick(&ids, to)) {
                    let direction = if reverse { Direction::Reverse } else { Direction::Forward };
                    if let Ok(belt) = factory.connect(a, b, belt_mk1, direction) {
                        ids.push(belt);
                    }
                }
            }
            FuzzOp::Unlink { index, out } => {
                if let Some(a) = pick(&ids, index) {
                    let _ = factory.unlink(PortRef::new(a, out as usize % 4));
                }
            }
            FuzzOp::Remove { index } => {
                if let Some(a) = pick(&ids, index) {
                    factory.remove(a).unwrap();
                    ids.retain(|&id| id != a);
                }
            }
            FuzzOp::Simulate => {
                let report = factory.simulate();
                let t = &report.traversal;
                assert!(t.visited + t.dead + t.stalled.len() <= factory.len());
            }
            FuzzOp::Drain => {
                factory.drain();
            }
            FuzzOp::Purge => factory.purge(),
            _ => {}
        }
    }

    assert_eq!(factory.len(), ids.len());
});
