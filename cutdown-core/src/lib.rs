// lib.rs
#![no_std]

// Host test builds need the std critical-section implementation linked
// for the channel and data cells.
#[cfg(test)]
use critical_section as _;

#[macro_use]
pub mod macros;

pub mod config;
pub mod controller;
pub mod cut_logic;
pub mod datacells;
pub mod errors;
pub mod flight_log;
pub mod launch;
pub mod readings;
pub mod release;
pub mod scheduler;
pub mod state_machine;
pub mod telemetry;
pub mod types;
pub mod uplink;

pub use config::{load_or_defaults, ConfigError, ConfigStore, SystemConfig};
pub use controller::{CutdownController, TickReport};
pub use cut_logic::{CutDecision, CutInputs, RuleEngine};
pub use errors::{ErrorCode, ErrorRegistry, Severity};
pub use flight_log::{FlightRecord, RecordBuffer, TickRecord, FLIGHT_LOG, MAX_RECORD_LINE_LEN};
pub use launch::LaunchDetector;
pub use readings::{Measurement, RawSensors, Readings, SensorSource, VariableTable};
pub use release::{NoopReleaseActuator, ReleaseActuator, ReleaseCommand, ReleaseLatch};
pub use scheduler::TickScheduler;
pub use state_machine::RuntimeState;
pub use telemetry::{transmit_interval_s, TelemetryPacket, UplinkMailbox};
pub use types::*;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
