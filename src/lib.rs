//! HomeGuard alerting core.
//!
//! Ingests sensor telemetry over pub/sub, classifies each reading and
//! raises one notification per hazard onset.  Everything outside the
//! session core (broker client, notifier, display) sits behind the port
//! traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod latch;
pub mod router;
pub mod runtime;
pub mod sensors;
pub mod session;
