//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (document store, model).

mod classifier;
mod store;

pub use classifier::{Classifier, ClassifierError, Inference};
pub use store::{PredictionFilter, PredictionPage, Store, StoreError};
