//! Infrastructure layer for the rebinder daemon.
//!
//! Contains OS-facing adapters: the Quartz event-tap backend, the in-process
//! mock backend used by tests, and file-system storage for the settings.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rebinder_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod event_tap;
pub mod storage;
