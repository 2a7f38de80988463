//! Integration tests for the event-tap lifecycle and per-event behaviour.
//!
//! These run the real [`TapController`] against the mock platform: every
//! "install" spawns an actual processing thread, injected events travel
//! through that thread to the controller's handler, and retired threads are
//! joined to prove teardown completes.

use std::sync::Arc;

use rebinder_core::{ActionCatalog, ButtonPhase, MappingConfig, TapVerdict};
use rebinder_daemon::application::settings::{
    RemapControl, RemapSettings, SettingsService, SettingsStore, TrackedButton,
};
use rebinder_daemon::application::tap_controller::{KeySynthesizer, TapController, TapPlatform};
use rebinder_daemon::infrastructure::event_tap::mock::{MockKeySynthesizer, MockTapPlatform};

fn harness() -> (Arc<MockTapPlatform>, Arc<MockKeySynthesizer>, TapController) {
    let platform = Arc::new(MockTapPlatform::new());
    let synthesizer = Arc::new(MockKeySynthesizer::new());
    let controller = TapController::new(
        Arc::clone(&platform) as Arc<dyn TapPlatform>,
        Arc::clone(&synthesizer) as Arc<dyn KeySynthesizer>,
    );
    (platform, synthesizer, controller)
}

/// enabled=true, button 3 bound to "a" (key code 0).
fn button3_to_a() -> MappingConfig {
    let mut config = MappingConfig::new(true);
    config.bind(3, ActionCatalog::lookup("a"));
    config
}

// ── Hook existence ────────────────────────────────────────────────────────────

#[test]
fn test_hook_exists_only_while_the_config_needs_it() {
    let (platform, _synthesizer, controller) = harness();

    // Disabled config, bindings present: no hook.
    let mut disabled = MappingConfig::new(false);
    disabled.bind(3, ActionCatalog::lookup("a"));
    controller.configure(disabled);
    assert_eq!(platform.live_tap_count(), 0);

    // Enabled with no bindings: still no hook.
    controller.configure(MappingConfig::new(true));
    assert_eq!(platform.live_tap_count(), 0);

    // Enabled with a binding: hook appears.
    controller.configure(button3_to_a());
    assert_eq!(platform.live_tap_count(), 1);
    assert!(controller.is_active());

    // Back to disabled: hook is torn down and its thread exits.
    controller.configure(MappingConfig::disabled());
    assert_eq!(platform.live_tap_count(), 0);
    assert!(!controller.is_active());
    platform.join_retired();
}

#[test]
fn test_unbinding_the_last_button_tears_the_hook_down() {
    let (platform, _synthesizer, controller) = harness();
    controller.configure(button3_to_a());
    assert!(controller.is_active());

    let mut config = MappingConfig::new(true);
    config.bind(3, ActionCatalog::none());
    controller.configure(config);

    assert!(!controller.is_active());
    platform.join_retired();
}

#[test]
fn test_reinstall_after_teardown_uses_a_fresh_hook() {
    let (platform, _synthesizer, controller) = harness();

    controller.configure(button3_to_a());
    let first_id = platform.live_tap_id().expect("hook installed");
    controller.configure(MappingConfig::disabled());
    controller.configure(button3_to_a());
    let second_id = platform.live_tap_id().expect("hook reinstalled");

    assert_ne!(first_id, second_id);
    assert_eq!(platform.install_count(), 2);
    platform.join_retired();
}

#[test]
fn test_unchanged_config_leaves_the_running_hook_untouched() {
    let (platform, _synthesizer, controller) = harness();

    controller.configure(button3_to_a());
    let id = platform.live_tap_id();
    controller.configure(button3_to_a());
    controller.configure(button3_to_a());

    assert_eq!(platform.install_count(), 1);
    assert_eq!(platform.live_tap_id(), id);
}

// ── Per-event behaviour ───────────────────────────────────────────────────────

#[test]
fn test_mapped_press_is_suppressed_and_synthesizes_the_key() {
    let (platform, synthesizer, controller) = harness();
    controller.configure(button3_to_a());

    let verdict = platform.send_event(ButtonPhase::Pressed, 3);

    assert_eq!(verdict, Some(TapVerdict::Suppress));
    // "a" is virtual key code 0; exactly one key pair posted.
    assert_eq!(synthesizer.posted_keys(), vec![0]);
}

#[test]
fn test_mapped_release_is_suppressed_without_synthesis() {
    let (platform, synthesizer, controller) = harness();
    controller.configure(button3_to_a());

    platform.send_event(ButtonPhase::Pressed, 3);
    let release = platform.send_event(ButtonPhase::Released, 3);

    assert_eq!(release, Some(TapVerdict::Suppress));
    // Still just the one press-time synthesis.
    assert_eq!(synthesizer.posted_keys(), vec![0]);
}

#[test]
fn test_unmapped_button_passes_through_while_others_are_remapped() {
    let (platform, synthesizer, controller) = harness();
    controller.configure(button3_to_a());

    let other_press = platform.send_event(ButtonPhase::Pressed, 4);
    let other_release = platform.send_event(ButtonPhase::Released, 4);

    assert_eq!(other_press, Some(TapVerdict::PassThrough));
    assert_eq!(other_release, Some(TapVerdict::PassThrough));
    assert!(synthesizer.posted_keys().is_empty());
}

#[test]
fn test_binding_change_is_visible_to_the_next_event() {
    let (platform, synthesizer, controller) = harness();
    controller.configure(button3_to_a());
    assert_eq!(
        platform.send_event(ButtonPhase::Pressed, 3),
        Some(TapVerdict::Suppress)
    );

    // Rebind button 3 to escape without touching hook existence.
    let mut config = MappingConfig::new(true);
    config.bind(3, ActionCatalog::lookup("escape"));
    config.bind(4, ActionCatalog::lookup("space"));
    controller.configure(config);

    assert_eq!(
        platform.send_event(ButtonPhase::Pressed, 3),
        Some(TapVerdict::Suppress)
    );
    assert_eq!(
        platform.send_event(ButtonPhase::Pressed, 4),
        Some(TapVerdict::Suppress)
    );
    assert_eq!(synthesizer.posted_keys(), vec![0, 53, 49]); // a, escape, space
    assert_eq!(platform.install_count(), 1);
}

#[test]
fn test_synthesis_failure_still_suppresses_the_event() {
    let (platform, synthesizer, controller) = harness();
    controller.configure(button3_to_a());
    synthesizer.set_fail(true);

    let verdict = platform.send_event(ButtonPhase::Pressed, 3);

    // The raw click must never leak to applications, even when the
    // replacement key could not be posted.
    assert_eq!(verdict, Some(TapVerdict::Suppress));
    assert!(synthesizer.posted_keys().is_empty());
}

// ── Permission and failure paths ──────────────────────────────────────────────

#[test]
fn test_missing_permission_leaves_events_flowing_untouched() {
    let platform = Arc::new(MockTapPlatform::with_permission(false));
    let synthesizer = Arc::new(MockKeySynthesizer::new());
    let controller = TapController::new(
        Arc::clone(&platform) as Arc<dyn TapPlatform>,
        Arc::clone(&synthesizer) as Arc<dyn KeySynthesizer>,
    );

    controller.configure(button3_to_a());

    // No hook means send_event has nothing to deliver to: the OS would
    // route every event straight to applications.
    assert!(!controller.is_active());
    assert_eq!(platform.send_event(ButtonPhase::Pressed, 3), None);
}

#[test]
fn test_granting_permission_takes_effect_on_the_next_configure() {
    let platform = Arc::new(MockTapPlatform::with_permission(false));
    let synthesizer = Arc::new(MockKeySynthesizer::new());
    let controller = TapController::new(
        Arc::clone(&platform) as Arc<dyn TapPlatform>,
        Arc::clone(&synthesizer) as Arc<dyn KeySynthesizer>,
    );
    controller.configure(button3_to_a());
    assert!(!controller.is_active());

    platform.set_permission(true);
    controller.configure(button3_to_a());

    assert!(controller.is_active());
}

#[test]
fn test_shutdown_processing_thread_exits() {
    let (platform, _synthesizer, controller) = harness();
    controller.configure(button3_to_a());
    platform.send_event(ButtonPhase::Pressed, 3);

    controller.configure(MappingConfig::disabled());

    // join_retired panics if the thread is still alive.
    platform.join_retired();
}

// ── Settings service wiring ───────────────────────────────────────────────────

struct NullStore;

impl SettingsStore for NullStore {
    fn save(&self, _settings: &RemapSettings) -> Result<(), String> {
        Ok(())
    }
}

#[test]
fn test_settings_changes_drive_the_tap_end_to_end() {
    // Arrange: controller shared between the settings layer and the test.
    let platform = Arc::new(MockTapPlatform::new());
    let synthesizer = Arc::new(MockKeySynthesizer::new());
    let controller = Arc::new(TapController::new(
        Arc::clone(&platform) as Arc<dyn TapPlatform>,
        Arc::clone(&synthesizer) as Arc<dyn KeySynthesizer>,
    ));
    let mut service = SettingsService::new(
        RemapSettings::default(),
        Box::new(NullStore),
        Arc::clone(&controller) as Arc<dyn RemapControl>,
    );

    // Default settings bind nothing, so construction installs no hook.
    assert!(!controller.is_active());

    // Act: bind Mouse4 (button 3) to "a".
    service.set_binding(TrackedButton::Mouse4, "a").unwrap();
    assert!(controller.is_active());
    assert_eq!(
        platform.send_event(ButtonPhase::Pressed, 3),
        Some(TapVerdict::Suppress)
    );
    assert_eq!(synthesizer.posted_keys(), vec![0]);

    // Toggling off tears the hook down and its thread exits.
    service.set_enabled(false).unwrap();
    assert!(!controller.is_active());
    platform.join_retired();

    // Toggling back on reinstalls with the stored binding intact.
    service.set_enabled(true).unwrap();
    assert!(controller.is_active());
    assert_eq!(
        platform.send_event(ButtonPhase::Pressed, 3),
        Some(TapVerdict::Suppress)
    );
}
