//! Event-tap backends.
//!
//! On macOS this installs a `CGEventTap` for `otherMouseDown`/`otherMouseUp`
//! on a dedicated run-loop thread.  The callback must complete quickly or
//! the system disables the tap, so per-event work is one lock-guarded
//! config lookup plus (for mapped presses) posting a key pair.
//!
//! # Testability
//!
//! The [`TapPlatform`](crate::application::tap_controller::TapPlatform) and
//! [`KeySynthesizer`](crate::application::tap_controller::KeySynthesizer)
//! traits allow unit and integration tests to exercise the controller with
//! [`mock::MockTapPlatform`] — real threads, no OS hooks, no permission.

pub mod mock;

#[cfg(target_os = "macos")]
pub mod macos;
