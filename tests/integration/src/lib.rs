//! End-to-end scenarios for skydrop mission control
//!
//! These tests wire the real registry, runner, record store and broadcaster
//! against simulated flight controllers:
//! - delivery event ordering and record lifecycle
//! - per-drone command serialization and multi-drone concurrency
//! - navigation stall recovery, ground disarm fallback and mission ceiling
//! - broadcaster isolation and the periodic status feed
//! - the `/ws` feed over a real socket

pub mod test_utils;

#[cfg(test)]
mod mission_flow_tests;

#[cfg(test)]
mod concurrency_tests;

#[cfg(test)]
mod feed_tests;

#[cfg(test)]
mod websocket_tests;
