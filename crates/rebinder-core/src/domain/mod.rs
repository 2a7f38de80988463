//! Domain logic for Mouse Rebinder.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: it can be compiled and unit-tested on any platform without
//! an event tap, a config file, or Accessibility permission.
//!
//! - [`mapping`] – `MappingConfig`, the immutable snapshot of the user's
//!   settings the tap consults on every event.
//! - [`remap`] – the per-event decision: pass the raw button event through,
//!   or suppress it (optionally synthesizing a key tap in its place).

pub mod mapping;
pub mod remap;
