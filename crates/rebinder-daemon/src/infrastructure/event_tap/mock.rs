//! Mock tap platform for unit and integration testing.
//!
//! Mirrors the shape of the real backend closely enough to exercise every
//! lifecycle path: each "install" spawns a real processing thread that
//! receives injected button events and answers with the handler's verdict,
//! each hook gets a distinct identity so tests can detect reinstalls, and
//! threads retired by `shutdown()` stay joinable so tests can prove the
//! processing thread actually exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rebinder_core::{ButtonNumber, ButtonPhase, KeyCode, TapVerdict};

use crate::application::tap_controller::{
    KeySynthesizer, SynthesisError, TapError, TapEventHandler, TapHandle, TapPlatform,
};

/// How long an injected event waits for its verdict before the test fails.
const VERDICT_TIMEOUT: Duration = Duration::from_secs(5);

enum MockCommand {
    Event {
        phase: ButtonPhase,
        button: ButtonNumber,
        verdict_tx: Sender<TapVerdict>,
    },
    Stop,
}

struct MockPlatformState {
    next_tap_id: u64,
    install_count: u64,
    install_fails: bool,
    /// Live taps as (id, command sender).  The controller's invariant says
    /// this never holds more than one entry; tests assert on it.
    live: Vec<(u64, Sender<MockCommand>)>,
    /// Threads whose taps were shut down, kept joinable for tests.
    retired: Vec<JoinHandle<()>>,
}

/// A mock implementation of `TapPlatform`.
pub struct MockTapPlatform {
    permission: AtomicBool,
    state: Arc<Mutex<MockPlatformState>>,
}

impl MockTapPlatform {
    /// Creates a mock platform with permission granted.
    pub fn new() -> Self {
        Self::with_permission(true)
    }

    /// Creates a mock platform with the given permission state.
    pub fn with_permission(granted: bool) -> Self {
        Self {
            permission: AtomicBool::new(granted),
            state: Arc::new(Mutex::new(MockPlatformState {
                next_tap_id: 1,
                install_count: 0,
                install_fails: false,
                live: Vec::new(),
                retired: Vec::new(),
            })),
        }
    }

    /// Grants or revokes the simulated input-monitoring permission.
    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Makes subsequent installs fail as if the OS refused the tap.
    pub fn set_install_fails(&self, fails: bool) {
        self.lock().install_fails = fails;
    }

    /// Total number of successful installs so far.
    pub fn install_count(&self) -> u64 {
        self.lock().install_count
    }

    /// Number of currently live taps (0 or 1 when the controller behaves).
    pub fn live_tap_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Identity of the live tap, if any.
    pub fn live_tap_id(&self) -> Option<u64> {
        self.lock().live.first().map(|(id, _)| *id)
    }

    /// Injects a button event into the live tap and waits for the verdict
    /// computed on its processing thread.  Returns `None` when no tap is
    /// installed (the event would have reached applications untouched).
    pub fn send_event(&self, phase: ButtonPhase, button: ButtonNumber) -> Option<TapVerdict> {
        let tap_tx = self.lock().live.first().map(|(_, tx)| tx.clone())?;
        let (verdict_tx, verdict_rx) = mpsc::channel();
        tap_tx
            .send(MockCommand::Event {
                phase,
                button,
                verdict_tx,
            })
            .ok()?;
        Some(
            verdict_rx
                .recv_timeout(VERDICT_TIMEOUT)
                .expect("tap thread did not answer"),
        )
    }

    /// Joins every processing thread retired by `shutdown()`.  Panics if a
    /// retired thread does not exit — the teardown guarantee tests rely on.
    pub fn join_retired(&self) {
        let retired = std::mem::take(&mut self.lock().retired);
        for handle in retired {
            handle.join().expect("retired tap thread panicked");
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockPlatformState> {
        self.state.lock().expect("lock poisoned")
    }
}

impl Default for MockTapPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TapPlatform for MockTapPlatform {
    fn permission_granted(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn install(&self, handler: TapEventHandler) -> Result<Box<dyn TapHandle>, TapError> {
        let mut state = self.lock();
        if state.install_fails {
            return Err(TapError::CreationFailed);
        }

        let id = state.next_tap_id;
        state.next_tap_id += 1;

        let (tx, rx) = mpsc::channel::<MockCommand>();
        let thread = thread::Builder::new()
            .name(format!("mock-tap-{id}"))
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        MockCommand::Event {
                            phase,
                            button,
                            verdict_tx,
                        } => {
                            let verdict = handler(phase, button);
                            let _ = verdict_tx.send(verdict);
                        }
                        MockCommand::Stop => break,
                    }
                }
            })
            .map_err(|e| TapError::ThreadSpawn(e.to_string()))?;

        state.install_count += 1;
        state.live.push((id, tx.clone()));

        Ok(Box::new(MockTapHandle {
            id,
            tx,
            join: Some(thread),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockTapHandle {
    id: u64,
    tx: Sender<MockCommand>,
    join: Option<JoinHandle<()>>,
    state: Arc<Mutex<MockPlatformState>>,
}

impl TapHandle for MockTapHandle {
    fn shutdown(mut self: Box<Self>) {
        // Fire-and-forget, like the real backend: signal the thread and
        // return without joining.  The join handle moves to the retired
        // list so tests can verify the exit.
        let _ = self.tx.send(MockCommand::Stop);
        let mut state = self.state.lock().expect("lock poisoned");
        state.live.retain(|(id, _)| *id != self.id);
        if let Some(join) = self.join.take() {
            state.retired.push(join);
        }
    }
}

/// A mock implementation of `KeySynthesizer` that records posted key taps.
pub struct MockKeySynthesizer {
    posted: Mutex<Vec<KeyCode>>,
    fail: AtomicBool,
}

impl MockKeySynthesizer {
    /// Creates a synthesizer that records every posted key tap.
    pub fn new() -> Self {
        Self {
            posted: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Makes subsequent posts fail, simulating an unconstructible event.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every key tap posted so far, one entry per key-down/key-up pair.
    pub fn posted_keys(&self) -> Vec<KeyCode> {
        self.posted.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockKeySynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySynthesizer for MockKeySynthesizer {
    fn post_key_tap(&self, key: KeyCode) -> Result<(), SynthesisError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SynthesisError::EventConstruction);
        }
        self.posted.lock().expect("lock poisoned").push(key);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn suppress_all() -> TapEventHandler {
        Arc::new(|_, _| TapVerdict::Suppress)
    }

    #[test]
    fn test_install_assigns_fresh_identities() {
        let platform = MockTapPlatform::new();

        let first = platform.install(suppress_all()).expect("install");
        let first_id = platform.live_tap_id();
        first.shutdown();
        let second = platform.install(suppress_all()).expect("install");

        assert_ne!(platform.live_tap_id(), first_id);
        assert_eq!(platform.install_count(), 2);
        second.shutdown();
        platform.join_retired();
    }

    #[test]
    fn test_send_event_returns_the_handler_verdict() {
        let platform = MockTapPlatform::new();
        let handle = platform
            .install(Arc::new(|phase, button| {
                if phase == ButtonPhase::Pressed && button == 3 {
                    TapVerdict::Suppress
                } else {
                    TapVerdict::PassThrough
                }
            }))
            .expect("install");

        assert_eq!(
            platform.send_event(ButtonPhase::Pressed, 3),
            Some(TapVerdict::Suppress)
        );
        assert_eq!(
            platform.send_event(ButtonPhase::Released, 3),
            Some(TapVerdict::PassThrough)
        );

        handle.shutdown();
        platform.join_retired();
    }

    #[test]
    fn test_send_event_without_live_tap_returns_none() {
        let platform = MockTapPlatform::new();
        assert_eq!(platform.send_event(ButtonPhase::Pressed, 3), None);
    }

    #[test]
    fn test_shutdown_retires_and_exits_the_thread() {
        let platform = MockTapPlatform::new();
        let handle = platform.install(suppress_all()).expect("install");

        handle.shutdown();

        assert_eq!(platform.live_tap_count(), 0);
        // join_retired panics if the thread failed to exit.
        platform.join_retired();
    }

    #[test]
    fn test_failing_install_reports_creation_failure() {
        let platform = MockTapPlatform::new();
        platform.set_install_fails(true);

        let result = platform.install(suppress_all());

        assert!(matches!(result, Err(TapError::CreationFailed)));
        assert_eq!(platform.install_count(), 0);
    }

    #[test]
    fn test_mock_synthesizer_records_and_fails_on_demand() {
        let synthesizer = MockKeySynthesizer::new();

        synthesizer.post_key_tap(0).expect("post");
        synthesizer.set_fail(true);
        let failed = synthesizer.post_key_tap(53);

        assert!(matches!(failed, Err(SynthesisError::EventConstruction)));
        assert_eq!(synthesizer.posted_keys(), vec![0]);
    }
}
