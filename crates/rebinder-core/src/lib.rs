//! # rebinder-core
//!
//! Shared library for Mouse Rebinder containing the action catalog, the
//! mapping configuration, and the per-event remap decision.
//!
//! This crate is consumed by the daemon that owns the live event tap.
//! It has zero dependencies on OS APIs, UI frameworks, or the file system.
//!
//! # Architecture overview (for beginners)
//!
//! Mouse Rebinder is a narrow remapping utility: it watches the extra
//! (non-left, non-right) mouse buttons system-wide and, for buttons the
//! user has bound, swallows the click and posts a keyboard key tap in its
//! place.  The daemon crate installs the OS-level hook; everything that can
//! be decided without touching the OS lives here:
//!
//! - **`catalog`** – The fixed list of target actions the user can bind a
//!   button to.  Each action has a stable string identifier (used for
//!   persistence), a display label, and an optional virtual key code.
//!
//! - **`domain`** – Pure business logic.  `MappingConfig` is the immutable
//!   snapshot of {enabled flag, button → key code} the daemon consults on
//!   every event, and `remap::decide` is the hot-path function that turns
//!   one raw button event into a passthrough/suppress/synthesize decision.

pub mod catalog;
pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `rebinder_core::MappingConfig` instead of the full module path.
pub use catalog::{Action, ActionCatalog, KeyCode};
pub use domain::mapping::{ButtonNumber, MappingConfig};
pub use domain::remap::{decide, ButtonPhase, RemapDecision, TapVerdict};
