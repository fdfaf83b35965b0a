//! overhead-core: Pure proximity-alert logic.
//!
//! No async, no I/O beyond the config file. Geometry, the tracked
//! aircraft table, alert selection, the refresh-cycle state machine, and the
//! publishing schedule. The `overhead` binary in `overhead-server` drives it
//! once per tick.

pub mod alert;
pub mod config;
pub mod cycle;
pub mod enrich;
pub mod feed;
pub mod geo;
pub mod schedule;
pub mod selector;
pub mod table;
pub mod types;

// Re-export commonly used types at crate root
pub use alert::{AlertInputs, AlertRecord};
pub use cycle::{CyclePhase, RefreshCycle};
pub use enrich::{AircraftInfo, FlightInfo};
pub use feed::{parse_feed, AircraftSnapshot};
pub use schedule::SchedulePolicy;
pub use selector::AlertCriteria;
pub use table::{AircraftTable, TrackedAircraft};
pub use types::*;
