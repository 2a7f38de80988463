//! The settings provider: persisted user settings and the push into the
//! tap controller.
//!
//! Four values are persisted — the enabled flag plus one action identifier
//! per tracked button.  Every individual change recomputes the full
//! [`MappingConfig`] (filtering out "none" bindings) and pushes it
//! synchronously into the controller through [`RemapControl`]; there is no
//! batching.  Persistence goes through the [`SettingsStore`] trait so tests
//! run without a file system.

use std::sync::Arc;

use rebinder_core::{ActionCatalog, ButtonNumber, MappingConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::tap_controller::TapController;

/// Error type for settings mutations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The new value was applied to the live tap but could not be written
    /// to disk.
    #[error("failed to persist settings: {0}")]
    Store(String),
}

/// The mouse buttons this utility tracks.
///
/// Button numbers follow the OS event stream: 0 is the primary click and 1
/// the secondary click, so the tracked extras start at 2 (the scroll-wheel
/// click, conventionally called "Mouse3").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedButton {
    /// Button 2 — middle/scroll click.
    Mouse3,
    /// Button 3 — first side button.
    Mouse4,
    /// Button 4 — second side button.
    Mouse5,
}

impl TrackedButton {
    pub const ALL: [TrackedButton; 3] = [
        TrackedButton::Mouse3,
        TrackedButton::Mouse4,
        TrackedButton::Mouse5,
    ];

    /// The button-number field value the OS reports for this button.
    pub fn button_number(self) -> ButtonNumber {
        match self {
            TrackedButton::Mouse3 => 2,
            TrackedButton::Mouse4 => 3,
            TrackedButton::Mouse5 => 4,
        }
    }
}

/// The persisted remap settings: the `[remap]` section of the config file.
///
/// Serde defaults make a missing file or a partial section behave like a
/// first run: enabled, nothing bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemapSettings {
    /// Master enable toggle.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Action identifier bound to Mouse3 (button 2).
    #[serde(default = "default_action_id")]
    pub mouse3: String,
    /// Action identifier bound to Mouse4 (button 3).
    #[serde(default = "default_action_id")]
    pub mouse4: String,
    /// Action identifier bound to Mouse5 (button 4).
    #[serde(default = "default_action_id")]
    pub mouse5: String,
}

fn default_true() -> bool {
    true
}

fn default_action_id() -> String {
    "none".to_string()
}

impl Default for RemapSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            mouse3: default_action_id(),
            mouse4: default_action_id(),
            mouse5: default_action_id(),
        }
    }
}

impl RemapSettings {
    /// The persisted action identifier for `button`.
    pub fn action_id(&self, button: TrackedButton) -> &str {
        match button {
            TrackedButton::Mouse3 => &self.mouse3,
            TrackedButton::Mouse4 => &self.mouse4,
            TrackedButton::Mouse5 => &self.mouse5,
        }
    }

    fn action_id_mut(&mut self, button: TrackedButton) -> &mut String {
        match button {
            TrackedButton::Mouse3 => &mut self.mouse3,
            TrackedButton::Mouse4 => &mut self.mouse4,
            TrackedButton::Mouse5 => &mut self.mouse5,
        }
    }

    /// Recomputes the mapping config from the current settings.  Buttons
    /// bound to "none" (or to an identifier the catalog does not know) are
    /// left unmapped.
    pub fn mapping_config(&self) -> MappingConfig {
        MappingConfig::from_actions(
            self.enabled,
            TrackedButton::ALL
                .iter()
                .map(|&button| (button.button_number(), ActionCatalog::lookup(self.action_id(button)))),
        )
    }
}

/// Persistence seam for the remap settings.
///
/// The production implementation writes the TOML config file; tests record
/// calls in memory.
pub trait SettingsStore: Send + Sync {
    /// Persists the given settings.
    fn save(&self, settings: &RemapSettings) -> Result<(), String>;
}

/// Consumer of recomputed mapping configs.
///
/// Implemented by [`TapController`]; tests substitute a recorder.
pub trait RemapControl: Send + Sync {
    /// Replaces the active mapping config.
    fn configure(&self, config: MappingConfig);
}

impl RemapControl for TapController {
    fn configure(&self, config: MappingConfig) {
        TapController::configure(self, config);
    }
}

/// The settings provider.
///
/// Owns the live [`RemapSettings`], pushes the recomputed config on
/// construction (so the tap comes up with the persisted state) and after
/// every mutation, and persists each change through the store.
pub struct SettingsService {
    settings: RemapSettings,
    store: Box<dyn SettingsStore>,
    control: Arc<dyn RemapControl>,
}

impl SettingsService {
    /// Creates the service and immediately applies `settings` to the
    /// controller.
    pub fn new(
        settings: RemapSettings,
        store: Box<dyn SettingsStore>,
        control: Arc<dyn RemapControl>,
    ) -> Self {
        let service = Self {
            settings,
            store,
            control,
        };
        service.push();
        service
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> &RemapSettings {
        &self.settings
    }

    /// Sets the master enable toggle.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), SettingsError> {
        self.settings.enabled = enabled;
        self.apply_and_persist()
    }

    /// Binds `button` to the action identified by `action_id`.
    ///
    /// Unknown identifiers degrade to "none" via the catalog's total
    /// lookup, so a stale identifier can never poison the stored settings.
    pub fn set_binding(
        &mut self,
        button: TrackedButton,
        action_id: &str,
    ) -> Result<(), SettingsError> {
        let id = ActionCatalog::lookup(action_id).id;
        *self.settings.action_id_mut(button) = id.to_string();
        self.apply_and_persist()
    }

    /// Applies first, persists second: the live behavior changes even when
    /// the disk write fails.
    fn apply_and_persist(&self) -> Result<(), SettingsError> {
        self.push();
        self.store
            .save(&self.settings)
            .map_err(SettingsError::Store)
    }

    fn push(&self) {
        let config = self.settings.mapping_config();
        debug!(
            enabled = config.enabled(),
            bindings = config.binding_count(),
            "pushing mapping config"
        );
        self.control.configure(config);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
