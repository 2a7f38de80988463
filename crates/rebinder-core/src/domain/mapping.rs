//! `MappingConfig`: the immutable settings snapshot consumed by the tap.
//!
//! A fresh `MappingConfig` is built by the settings layer on every
//! individual setting change and handed by value into the tap controller,
//! which replaces its previous copy atomically under its lock.  There is no
//! shared mutable ownership: the snapshot the event handler reads for one
//! event is internally consistent by construction.

use std::collections::HashMap;

use crate::catalog::{Action, KeyCode};

/// A mouse button number as reported by the OS event stream.
///
/// Button 0 is the primary button, 1 the secondary (right) button; the
/// "secondary buttons" this utility tracks start at 2 (middle click).
pub type ButtonNumber = i64;

/// Enabled flag plus the button → key-code bindings.
///
/// Invariant: `bindings` never contains an entry for the "none" action —
/// actions without a key code are omitted at construction, not stored as
/// null.  A button absent from the map is unmapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConfig {
    enabled: bool,
    bindings: HashMap<ButtonNumber, KeyCode>,
}

impl MappingConfig {
    /// Creates a config with the given enabled flag and no bindings.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bindings: HashMap::new(),
        }
    }

    /// Creates the inactive config: disabled, no bindings.
    ///
    /// Pushing this into the tap controller tears down any live hook.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Builds a config from `(button, action)` pairs, dropping every pair
    /// whose action has no key code.
    pub fn from_actions<'a, I>(enabled: bool, pairs: I) -> Self
    where
        I: IntoIterator<Item = (ButtonNumber, &'a Action)>,
    {
        let mut config = Self::new(enabled);
        for (button, action) in pairs {
            config.bind(button, action);
        }
        config
    }

    /// Binds `button` to `action`.  Binding the "none" action (or any action
    /// without a key code) removes the button's entry instead.
    pub fn bind(&mut self, button: ButtonNumber, action: &Action) {
        match action.key_code {
            Some(key) => {
                self.bindings.insert(button, key);
            }
            None => {
                self.bindings.remove(&button);
            }
        }
    }

    /// Whether remapping is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The key code bound to `button`, if any.
    pub fn key_for(&self, button: ButtonNumber) -> Option<KeyCode> {
        self.bindings.get(&button).copied()
    }

    /// Number of bound buttons.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// `true` when no button is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether this config requires a live event tap: enabled with at least
    /// one binding.  An enabled config with no bindings needs no hook.
    pub fn needs_tap(&self) -> bool {
        self.enabled && !self.bindings.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionCatalog;

    #[test]
    fn test_new_config_is_empty() {
        let config = MappingConfig::new(true);
        assert!(config.enabled());
        assert!(config.is_empty());
        assert_eq!(config.binding_count(), 0);
    }

    #[test]
    fn test_bind_stores_the_action_key_code() {
        let mut config = MappingConfig::new(true);
        config.bind(3, ActionCatalog::lookup("a"));
        assert_eq!(config.key_for(3), Some(0));
        assert_eq!(config.binding_count(), 1);
    }

    #[test]
    fn test_binding_the_none_action_is_omitted_not_stored() {
        // Arrange: bindings must never contain the "none" action as a value.
        let mut config = MappingConfig::new(true);

        // Act
        config.bind(3, ActionCatalog::none());

        // Assert
        assert!(config.is_empty());
        assert_eq!(config.key_for(3), None);
    }

    #[test]
    fn test_rebinding_to_none_removes_the_existing_entry() {
        let mut config = MappingConfig::new(true);
        config.bind(3, ActionCatalog::lookup("escape"));
        assert_eq!(config.binding_count(), 1);

        config.bind(3, ActionCatalog::none());
        assert!(config.is_empty());
    }

    #[test]
    fn test_from_actions_filters_keyless_actions() {
        let config = MappingConfig::from_actions(
            true,
            [
                (2, ActionCatalog::lookup("space")),
                (3, ActionCatalog::none()),
                (4, ActionCatalog::lookup("f5")),
            ],
        );

        assert_eq!(config.binding_count(), 2);
        assert_eq!(config.key_for(2), Some(49));
        assert_eq!(config.key_for(3), None);
        assert_eq!(config.key_for(4), Some(96));
    }

    #[test]
    fn test_needs_tap_requires_enabled_and_non_empty() {
        let mut enabled_empty = MappingConfig::new(true);
        assert!(!enabled_empty.needs_tap());

        enabled_empty.bind(3, ActionCatalog::lookup("a"));
        assert!(enabled_empty.needs_tap());

        let mut disabled_bound = MappingConfig::new(false);
        disabled_bound.bind(3, ActionCatalog::lookup("a"));
        assert!(!disabled_bound.needs_tap());
    }

    #[test]
    fn test_disabled_constructor_never_needs_a_tap() {
        let config = MappingConfig::disabled();
        assert!(!config.enabled());
        assert!(!config.needs_tap());
    }

    #[test]
    fn test_unmapped_button_has_no_key() {
        let mut config = MappingConfig::new(true);
        config.bind(3, ActionCatalog::lookup("a"));
        assert_eq!(config.key_for(4), None);
    }
}
