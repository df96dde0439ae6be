//! Delivery missions for skydrop
//!
//! - [`machine`]: the pure, tick-driven delivery state machine
//! - [`executor`]: runs a machine against a live link under its command lock
//! - [`store`]: SQLite log of mission attempts
//! - [`orders`]: best-effort notifications to the external orders service
//! - [`runner`]: launch validation, per-mission tasks and event publication

pub mod error;
pub mod executor;
pub mod machine;
pub mod navigation;
pub mod orders;
pub mod runner;
pub mod store;

pub use error::{LaunchError, MissionError};
pub use executor::execute;
pub use machine::{
    ArmWait, Directive, Milestone, MissionMachine, MissionPlan, Observation, Phase, Step,
};
pub use navigation::StallDetector;
pub use orders::{HttpOrdersClient, NotifyError, OrdersNotifier, NOTIFY_TIMEOUT};
pub use runner::{LaunchAck, LaunchRequest, MissionOutcome, MissionRunner, HOME_BLOCK};
pub use store::{MissionId, MissionRecord, MissionStatus, MissionStore, StoreError};
