//! Controller wiring for the FeatureStore resource

pub mod reconciler;

pub use reconciler::{error_policy, reconcile, ReconcileError, Reconciler};
