//! Workspace placeholder crate.
//!
//! Host applications depend on `spindle-workspace` to pull in the
//! [`core_service`] facade without wiring each workspace crate individually.

pub use core_service;
