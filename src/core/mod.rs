//! Core library components.
//!
//! Staging, diffing, and reconciliation live here along with the store
//! backends and configuration they are wired to.

pub mod blob;
pub mod config;
pub mod constants;
pub mod diff;
pub mod domain;
pub mod reconcile;
pub mod session;
pub mod stage;
pub mod store;
pub mod types;
pub mod validation;
