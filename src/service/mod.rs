//! Cross-module service sharing
//!
//! Modules and plugins share capabilities through explicit publication,
//! not through symbol delegation. The registry is the broker.

pub mod registry;

pub use registry::{Provider, ServiceRegistration, ServiceRegistry};
