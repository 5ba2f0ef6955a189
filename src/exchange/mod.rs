//! Side exchange between partitions: wire format, routing plan and the
//! per-application exchange itself.

pub mod comm_sides;
pub mod plan;
pub mod wire;

pub use comm_sides::{CommSides, SIDE_TAG};
pub use plan::{ExchangePlan, MetaData, NeighborPlan};
