//! TapController: lifecycle and event handling for the global event tap.
//!
//! This is the heart of the daemon.  Two threads touch it: the control
//! thread (settings changes arriving via [`TapController::configure`]) and
//! the dedicated tap thread, which invokes the event handler synchronously
//! for every secondary-button event the OS delivers.
//!
//! # Concurrency model
//!
//! All mutable shared state — the config snapshot, the live hook handle,
//! and the `installing` flag — sits behind a single mutex.  The lock is
//! held only for short field reads/writes, never across an OS call that
//! could block (permission check, tap creation, run-loop execution): those
//! happen after release, or on the tap thread itself.  `configure` is
//! therefore a fast, non-blocking call safe to invoke from a UI-update
//! path, and its effects are visible to the very next event the tap thread
//! observes after the lock is released.
//!
//! # Hook existence
//!
//! At most one hook/thread pair exists at any time.  The hook exists
//! exactly while the latest config needs it (`enabled` with at least one
//! binding) and permission was granted at install time.  The `installing`
//! flag makes `start_if_needed` safe against concurrent `configure` calls
//! without holding the lock across tap creation.

use std::sync::{Arc, Mutex, MutexGuard};

use rebinder_core::{decide, ButtonNumber, ButtonPhase, KeyCode, MappingConfig, TapVerdict};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for event-tap installation.
///
/// None of these are surfaced to the user: a failed installation leaves the
/// daemon in the "inactive" state, and the next settings change retries.
#[derive(Debug, Error)]
pub enum TapError {
    /// The OS refused to create the interception point.
    #[error("the OS refused to create the event tap")]
    CreationFailed,
    /// The dedicated processing thread could not be spawned.
    #[error("failed to spawn the event-tap thread: {0}")]
    ThreadSpawn(String),
    /// No tap backend exists for this OS.
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Error type for synthetic key injection.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// No event source was available to stamp the synthetic events with.
    #[error("failed to obtain an event source for key synthesis")]
    NoEventSource,
    /// The synthetic key event itself could not be constructed.
    #[error("failed to construct the synthetic keyboard event")]
    EventConstruction,
}

/// Callback invoked on the tap thread for every secondary-button event.
///
/// Returns the verdict the platform must apply to the raw event.  Must be
/// fast: the OS disables taps whose callbacks stall.
pub type TapEventHandler = Arc<dyn Fn(ButtonPhase, ButtonNumber) -> TapVerdict + Send + Sync>;

/// A live installed hook plus its processing thread.
///
/// Created by [`TapPlatform::install`]; destroyed by [`TapHandle::shutdown`].
pub trait TapHandle: Send {
    /// Begins teardown: invalidates the hook's resources and asks its run
    /// loop to exit.  Fire-and-forget — it must not wait for the
    /// processing thread to finish, and it must be safe to call from the
    /// control thread while that thread is blocked in its event loop.
    fn shutdown(self: Box<Self>);
}

/// Platform seam for the permission check and hook installation.
pub trait TapPlatform: Send + Sync {
    /// Whether the input-monitoring permission is currently granted.
    ///
    /// Synchronous, best-effort; the controller re-checks on every
    /// `configure` that needs a tap.
    fn permission_granted(&self) -> bool;

    /// Creates the hook, spawns its dedicated processing thread, and
    /// enables event delivery to `handler`.
    fn install(&self, handler: TapEventHandler) -> Result<Box<dyn TapHandle>, TapError>;
}

/// Platform seam for posting synthetic keyboard events into the OS input
/// stream.
pub trait KeySynthesizer: Send + Sync {
    /// Posts one key-down/key-up pair for `key`, as if typed on a physical
    /// keyboard.
    fn post_key_tap(&self, key: KeyCode) -> Result<(), SynthesisError>;
}

/// State guarded by the controller's single mutex.
#[derive(Default)]
struct TapState {
    config: MappingConfig,
    handle: Option<Box<dyn TapHandle>>,
    /// Set while an install attempt is in flight outside the lock, so a
    /// concurrent `configure` cannot start a second one.
    installing: bool,
}

/// Owns the event tap lifecycle and the per-event decision.
///
/// Explicitly constructed and explicitly owned — there is no global
/// singleton.  Clone the surrounding `Arc` to share it between the
/// settings layer and the shutdown path.
pub struct TapController {
    platform: Arc<dyn TapPlatform>,
    synthesizer: Arc<dyn KeySynthesizer>,
    state: Arc<Mutex<TapState>>,
}

impl TapController {
    /// Creates a controller with no config and no hook.
    pub fn new(platform: Arc<dyn TapPlatform>, synthesizer: Arc<dyn KeySynthesizer>) -> Self {
        Self {
            platform,
            synthesizer,
            state: Arc::new(Mutex::new(TapState::default())),
        }
    }

    /// Atomically replaces the config snapshot and reconciles hook
    /// existence with it.
    ///
    /// Installs a hook when the new config needs one and none exists
    /// (silently doing nothing if permission is missing or the OS refuses);
    /// tears the hook down when no longer needed; leaves a still-needed
    /// hook running untouched so unrelated event flow is never
    /// interrupted.  Idempotent: repeating an identical config is a no-op
    /// on the hook.
    pub fn configure(&self, config: MappingConfig) {
        let needs_tap = {
            let mut state = self.lock_state();
            state.config = config;
            state.config.needs_tap()
        };

        if needs_tap {
            self.start_if_needed();
        } else {
            self.stop();
        }
    }

    /// Whether a hook is currently installed — the "Active" indicator for
    /// status surfaces.
    pub fn is_active(&self) -> bool {
        let state = self.lock_state();
        state.handle.is_some()
    }

    fn start_if_needed(&self) {
        {
            let mut state = self.lock_state();
            if state.handle.is_some() || state.installing {
                return;
            }
            state.installing = true;
        }

        // Permission check and tap creation are blocking OS calls; both run
        // outside the lock so the tap thread's event handler is never held up.
        if !self.platform.permission_granted() {
            self.lock_state().installing = false;
            debug!("input-monitoring permission not granted; remapping stays inactive");
            return;
        }

        let installed = self.platform.install(self.event_handler());

        let mut state = self.lock_state();
        state.installing = false;
        match installed {
            Ok(handle) => {
                // The config may have flipped to inactive while we were
                // installing; re-check before publishing the handle.
                if state.config.needs_tap() && state.handle.is_none() {
                    state.handle = Some(handle);
                    info!("event tap installed");
                } else {
                    drop(state);
                    handle.shutdown();
                    debug!("config changed during installation; discarding fresh tap");
                }
            }
            Err(e) => {
                debug!(error = %e, "event tap installation failed; remapping stays inactive");
            }
        }
    }

    fn stop(&self) {
        // Snapshot the handle under the lock, then tear it down outside it
        // so shutdown never blocks a handler racing for the same lock.
        let handle = {
            let mut state = self.lock_state();
            state.handle.take()
        };

        if let Some(handle) = handle {
            handle.shutdown();
            info!("event tap removed");
        }
    }

    /// Builds the handler the platform invokes on the tap thread.
    ///
    /// The handler reads one consistent config snapshot under the lock,
    /// releases it, then synthesizes outside the lock.  A synthesis failure
    /// is swallowed: the mapped button event is suppressed either way so
    /// the foreground application never sees the raw click.
    fn event_handler(&self) -> TapEventHandler {
        let state = Arc::clone(&self.state);
        let synthesizer = Arc::clone(&self.synthesizer);

        Arc::new(move |phase, button| {
            let decision = {
                let guard = state.lock().unwrap_or_else(|e| e.into_inner());
                decide(&guard.config, button, phase)
            };

            if let Some(key) = decision.synthesize {
                if let Err(e) = synthesizer.post_key_tap(key) {
                    debug!(key, error = %e, "key synthesis failed; original event stays suppressed");
                }
            }

            decision.verdict
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, TapState> {
        // A poisoned lock only means another thread panicked mid-update of
        // plain fields; the state itself is still coherent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
