//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external systems:
//! - `mongo`: MongoDB document persistence
//! - `model`: scaler + logistic classifier artifacts
//! - `memory`: volatile store for tests

#[cfg(test)]
pub mod memory;
pub mod model;
pub mod mongo;
