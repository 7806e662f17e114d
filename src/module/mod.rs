//! Hosted application modules
//!
//! A module is a deployable, versioned unit of application code hosted in
//! isolation. Module names are not unique - the version disambiguates -
//! and the registry enforces the one-activated-per-name invariant unless
//! multi-version coexistence is enabled.

pub mod model;
pub mod registry;

pub use model::{Module, ModuleDescriptor, ModuleHandle, ModuleIdentity};
pub use registry::ModuleRegistry;
