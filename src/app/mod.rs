//! Application core: pure session logic, zero I/O.
//!
//! This module contains the business rules of the alerting core: session
//! lifecycle, topic routing, classification and the alert latch.  All
//! interaction with the broker and the user happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
