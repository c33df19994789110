//! Position lifecycle: sizing, state, the exit monitor, and the engine that
//! ties them to the signal stream.

pub mod machine;
pub mod monitor;
pub mod position;
pub mod sizing;

pub use machine::PositionEngine;
pub use monitor::MonitorHandle;
pub use position::{protective_levels, Position, PositionSide, ProtectiveLevels};
pub use sizing::{max_trade_quantity, max_trade_quantity_from_feed};
