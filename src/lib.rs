//! # Feast Operator
//!
//! A Kubernetes operator that deploys and manages Feast feature store services
//! from a `FeatureStore` custom resource.
//!
//! ## Overview
//!
//! For each `FeatureStore` the operator reconciles four service slots:
//!
//! 1. **Registry** - the feature registry server (or a reference to a remote one)
//! 2. **Offline store** - the historical feature server
//! 3. **Online store** - the low-latency serving server
//! 4. **Client** - a ConfigMap holding the feature_store.yaml consumers mount
//!
//! Each deployed slot gets a Deployment and a Service named
//! `feast-<resource>-<slot>`; the rendered feature_store.yaml reaches the
//! container base64-encoded in an environment variable. Database backends
//! (Cassandra, Snowflake, SQL registries, ...) are attached by referencing a
//! Secret whose payload carries the connection parameters as YAML.
//!
//! ## Features
//!
//! - **Per-slot conditions**: RegistryReady, OfflineStoreReady, OnlineStoreReady,
//!   ClientReady, and an aggregate Ready condition drive the resource phase
//! - **Partial failure tolerance**: a broken backend for one slot never blocks
//!   the remaining slots from converging
//! - **Remote registry**: point every rendered config at an externally managed
//!   registry instead of deploying one
//! - **Prometheus metrics**: reconciliation counters and durations
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

pub mod constants;
pub mod controller;
pub mod crd;
pub mod metrics;
pub mod server;

pub use crd::FeatureStore;
