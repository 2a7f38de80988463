//! Application layer for the rebinder daemon.
//!
//! Use cases in this layer orchestrate the domain types from
//! `rebinder-core` and depend only on traits, so every OS-facing concern
//! (the Quartz event tap, key synthesis, the config file) can be swapped
//! for an in-process mock in tests.  No OS calls, no file system access.
//!
//! # Sub-modules
//!
//! - **`tap_controller`** – Owns the lifecycle of the global event tap and
//!   the per-event passthrough/suppress decision.  This is the
//!   concurrency-critical core: it is mutated from the settings/control
//!   thread while its event handler runs on the dedicated tap thread.
//!
//! - **`settings`** – The settings provider: persisted user settings plus
//!   the logic that recomputes a fresh `MappingConfig` and pushes it into
//!   the controller on every individual change.

pub mod settings;
pub mod tap_controller;
