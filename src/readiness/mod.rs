// src/readiness/mod.rs
//! Startup readiness gating.
//!
//! The [`DependencyGate`] runs every registered probe, in order, through a
//! [`ResiliencePipeline`](crate::resilience::ResiliencePipeline) until one
//! round passes, then sets a one-way [`ReadinessLatch`]. Publishers observe
//! the latch through a [`ReadinessHandle`] or a [`ReadinessCheck`].
//!
//! ```plaintext
//!           ┌───────────────┐  round   ┌──────────┐  attempt  ┌────────┐
//!  spawn ──►│DependencyGate │ ───────► │ Pipeline │ ────────► │ Probes │
//!           └───────────────┘          └──────────┘           └────────┘
//!                  │ first success
//!                  ▼
//!           ┌───────────────┐  handle  ┌────────────────┐
//!           │ReadinessLatch │ ───────► │ ReadinessCheck │
//!           └───────────────┘          └────────────────┘
//! ```
//!
//! Readiness is never re-verified once set: a dependency lost after startup
//! does not flip the latch back.

mod gate;
mod health;
mod latch;


pub use gate::{wait_for_dependencies, DependencyGate, GateConfig};
pub use health::{
    HealthReport, HealthStatus, ReadinessCheck, NOT_READY_DESCRIPTION, READY_DESCRIPTION,
};
pub use latch::{ReadinessHandle, ReadinessLatch};
