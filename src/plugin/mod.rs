//! Shared plugin libraries
//!
//! Plugins export a controlled symbol/resource surface to modules. They
//! are registered once at discovery time and live for the remainder of
//! the process - the asymmetry with modules is deliberate.

pub mod model;
pub mod registry;

pub use model::{Plugin, PluginDescriptor, PluginIdentity};
pub use registry::PluginRegistry;
