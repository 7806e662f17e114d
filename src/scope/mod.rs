//! Symbol visibility and resolution scopes
//!
//! A scope is the ordered visibility chain a module resolves symbolic
//! names through: its own artifacts first, then its plugin delegates'
//! export surfaces, then the host scope as a last resort.

pub mod artifact;
pub mod resolution;

pub use artifact::{ArtifactSet, ExportIndex};
pub use resolution::{HostScope, ResolutionScope, ResolvedOwner};
