//! Conveyor Core -- a steady-state production network model and the
//! concurrent traversal engine that simulates it.
//!
//! A [`factory::Factory`] owns components (resource nodes, recipe buildings,
//! conveyances and storage) in an arena keyed by id. Links are stored on the
//! ports as id references, so the network is a set of edges over the arena
//! rather than a pointer graph.
//!
//! # Passes
//!
//! Every operation that walks the network is one traversal pass:
//!
//! 1. **Plan** -- collect everything reachable from the roots and seed one
//!    merge gate per component with its reachable input count.
//! 2. **Dispatch** -- components whose gate is open run the visitor; each
//!    finished component counts down the gates it feeds, live or dead.
//! 3. **Report** -- gates that never opened (cycles, dangling inputs) are
//!    reported and recorded on their components instead of hanging.
//!
//! [`sim`] builds `simulate`, `drain`, `purge` and step-debugging on top.
//!
//! ```rust,ignore
//! let mut factory = Factory::new("Screws");
//! let ids = factory.add([node, miner, smelter])?;
//! factory.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0))?;
//! factory.connect(ids[1], ids[2], belt_mk1, Direction::Forward)?;
//! let report = factory.simulate();
//! let errors = factory.get_errors_as_dict();
//! ```
//!
//! # Key Types
//!
//! - [`factory::Factory`] -- component arena, linking and connection.
//! - [`component::Component`] -- identity, ports, working state and kind.
//! - [`processor`] -- buildings, conveyances and storage, and the
//!   `can_process` / `process` flow computation.
//! - [`traversal::Visitor`] -- what a pass applies to each component.
//! - [`registry::Registry`] -- immutable item and recipe catalog.
//! - [`fixed::Rate`] -- Q32.32 fixed-point items-per-minute.

pub mod component;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod factory;
pub mod fixed;
mod graph;
pub mod id;
pub mod item;
pub mod meta;
pub mod processor;
pub mod query;
pub mod recipe;
pub mod registry;
pub mod sim;
pub mod traversal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
