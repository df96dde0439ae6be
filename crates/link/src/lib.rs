//! Vehicle links for skydrop
//!
//! This crate owns everything between mission control and a flight
//! controller:
//! - [`FlightController`]: the wire-protocol session abstraction (connect, arm,
//!   mode, takeoff, goto, servo, telemetry primitives)
//! - [`VehicleLink`]: one live connection per drone, with its command lock,
//!   diagnostic ring buffer and cached mission home
//! - [`DroneRegistry`]: the concurrent drone id -> link map
//! - [`sim`]: a simulated flight controller used for demos and tests
//!
//! # Locking discipline
//!
//! Two locks are involved and they are never confused:
//! 1. The registry lock guards the id -> link map and is held only for the
//!    map mutation (plus closing a displaced link), never across a connect.
//! 2. Each link's command lock is held for the full duration of any
//!    flight-affecting sequence. Flight-affecting calls are only reachable
//!    through a [`CommandGuard`], so holding the lock is enforced by the type
//!    system. Telemetry reads bypass the command lock.

#![warn(missing_docs)]

pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod link;
pub mod registry;
pub mod sim;

pub use controller::{FlightController, FlightMode, LinkConnector, Telemetry};
pub use diagnostics::DiagnosticLog;
pub use error::{LinkError, RegistryError};
pub use link::{CommandGuard, DroneStatus, VehicleLink};
pub use registry::DroneRegistry;
pub use sim::{SimCommand, SimConnector, SimProfile, SimulatedVehicle};
