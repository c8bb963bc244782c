// src/tests/mod.rs
//! Crate-level scenarios wiring configuration, real probes and the gate
