//! The fixed catalog of bindable keyboard actions.
//!
//! Key code values are macOS virtual key codes as defined in Carbon's
//! Events.h (HIToolbox framework) — e.g. `kVK_ANSI_A = 0`.  Identifiers are
//! stable strings used for persistence and must never change meaning across
//! releases; labels are display-only and may.

/// A macOS virtual key code (`CGKeyCode`).
pub type KeyCode = u16;

/// One bindable target action: a keyboard key a mouse button can stand in for.
///
/// The first catalog entry is the designated "none" action, whose
/// `key_code` is `None`; binding a button to it means "no substitution".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    /// Stable identifier used in the persisted configuration.
    pub id: &'static str,
    /// Human-readable label shown by configuration surfaces.
    pub label: &'static str,
    /// Virtual key code to synthesize, or `None` for the "none" action.
    pub key_code: Option<KeyCode>,
}

/// The fixed, ordered action list.
///
/// Covers the alphanumeric keys, the function keys, the modifier keys, and
/// a handful of punctuation/whitespace keys.
const ACTIONS: &[Action] = &[
    Action { id: "none", label: "None", key_code: None },
    Action { id: "a", label: "A", key_code: Some(0) },
    Action { id: "b", label: "B", key_code: Some(11) },
    Action { id: "c", label: "C", key_code: Some(8) },
    Action { id: "d", label: "D", key_code: Some(2) },
    Action { id: "e", label: "E", key_code: Some(14) },
    Action { id: "f", label: "F", key_code: Some(3) },
    Action { id: "g", label: "G", key_code: Some(5) },
    Action { id: "h", label: "H", key_code: Some(4) },
    Action { id: "i", label: "I", key_code: Some(34) },
    Action { id: "j", label: "J", key_code: Some(38) },
    Action { id: "k", label: "K", key_code: Some(40) },
    Action { id: "l", label: "L", key_code: Some(37) },
    Action { id: "m", label: "M", key_code: Some(46) },
    Action { id: "n", label: "N", key_code: Some(45) },
    Action { id: "o", label: "O", key_code: Some(31) },
    Action { id: "p", label: "P", key_code: Some(35) },
    Action { id: "q", label: "Q", key_code: Some(12) },
    Action { id: "r", label: "R", key_code: Some(15) },
    Action { id: "s", label: "S", key_code: Some(1) },
    Action { id: "t", label: "T", key_code: Some(17) },
    Action { id: "u", label: "U", key_code: Some(32) },
    Action { id: "v", label: "V", key_code: Some(9) },
    Action { id: "w", label: "W", key_code: Some(13) },
    Action { id: "x", label: "X", key_code: Some(7) },
    Action { id: "y", label: "Y", key_code: Some(16) },
    Action { id: "z", label: "Z", key_code: Some(6) },
    Action { id: "1", label: "1", key_code: Some(18) },
    Action { id: "2", label: "2", key_code: Some(19) },
    Action { id: "3", label: "3", key_code: Some(20) },
    Action { id: "4", label: "4", key_code: Some(21) },
    Action { id: "5", label: "5", key_code: Some(23) },
    Action { id: "6", label: "6", key_code: Some(22) },
    Action { id: "7", label: "7", key_code: Some(26) },
    Action { id: "8", label: "8", key_code: Some(28) },
    Action { id: "9", label: "9", key_code: Some(25) },
    Action { id: "0", label: "0", key_code: Some(29) },
    Action { id: "f1", label: "F1", key_code: Some(122) },
    Action { id: "f2", label: "F2", key_code: Some(120) },
    Action { id: "f3", label: "F3", key_code: Some(99) },
    Action { id: "f4", label: "F4", key_code: Some(118) },
    Action { id: "f5", label: "F5", key_code: Some(96) },
    Action { id: "f6", label: "F6", key_code: Some(97) },
    Action { id: "f7", label: "F7", key_code: Some(98) },
    Action { id: "f8", label: "F8", key_code: Some(100) },
    Action { id: "f9", label: "F9", key_code: Some(101) },
    Action { id: "f10", label: "F10", key_code: Some(109) },
    Action { id: "f11", label: "F11", key_code: Some(103) },
    Action { id: "f12", label: "F12", key_code: Some(111) },
    Action { id: "control", label: "Control ⌃", key_code: Some(59) },
    Action { id: "option", label: "Option ⌥", key_code: Some(58) },
    Action { id: "command", label: "Command ⌘", key_code: Some(55) },
    Action { id: "tilde", label: "Tilde (~)", key_code: Some(50) },
    Action { id: "minus", label: "Minus (-)", key_code: Some(27) },
    Action { id: "equal", label: "Equal (=)", key_code: Some(24) },
    Action { id: "return", label: "Return", key_code: Some(36) },
    Action { id: "escape", label: "Escape", key_code: Some(53) },
    Action { id: "shift", label: "Shift", key_code: Some(56) },
    Action { id: "space", label: "Space", key_code: Some(49) },
    Action { id: "tab", label: "Tab", key_code: Some(48) },
    Action { id: "fn", label: "Fn", key_code: Some(63) },
];

/// Read-only access to the fixed action catalog.
pub struct ActionCatalog;

impl ActionCatalog {
    /// Returns all actions in their fixed catalog order.
    pub fn all() -> &'static [Action] {
        ACTIONS
    }

    /// Returns the designated "none" action (no substitution).
    pub fn none() -> &'static Action {
        &ACTIONS[0]
    }

    /// Looks up an action by its stable identifier.
    ///
    /// This is a total function: unknown identifiers resolve to the "none"
    /// action, so stale or corrupted persisted values degrade to "no
    /// substitution" instead of failing.
    pub fn lookup(id: &str) -> &'static Action {
        ACTIONS.iter().find(|a| a.id == id).unwrap_or(Self::none())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_entry_is_the_none_action() {
        let first = &ActionCatalog::all()[0];
        assert_eq!(first.id, "none");
        assert_eq!(first.key_code, None);
        assert_eq!(ActionCatalog::none(), first);
    }

    #[test]
    fn test_lookup_known_identifier_returns_matching_action() {
        let action = ActionCatalog::lookup("a");
        assert_eq!(action.id, "a");
        assert_eq!(action.key_code, Some(0)); // kVK_ANSI_A
    }

    #[test]
    fn test_lookup_unknown_identifier_falls_back_to_none() {
        let action = ActionCatalog::lookup("no-such-key");
        assert_eq!(action, ActionCatalog::none());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        // Identifiers are stored lowercase; "A" is not a valid identifier.
        assert_eq!(ActionCatalog::lookup("A"), ActionCatalog::none());
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut seen = HashSet::new();
        for action in ActionCatalog::all() {
            assert!(seen.insert(action.id), "duplicate identifier {:?}", action.id);
        }
    }

    #[test]
    fn test_every_action_except_none_has_a_key_code() {
        for action in &ActionCatalog::all()[1..] {
            assert!(
                action.key_code.is_some(),
                "{:?} must carry a key code",
                action.id
            );
        }
    }

    #[test]
    fn test_all_letter_identifiers_are_present() {
        for letter in 'a'..='z' {
            let id = letter.to_string();
            assert_eq!(ActionCatalog::lookup(&id).id, id.as_str());
        }
    }

    #[test]
    fn test_all_function_key_identifiers_are_present() {
        for n in 1..=12 {
            let id = format!("f{n}");
            assert_eq!(ActionCatalog::lookup(&id).id, id.as_str());
        }
    }

    #[test]
    fn test_well_known_key_codes_match_carbon_constants() {
        // Spot-check against Events.h values.
        assert_eq!(ActionCatalog::lookup("return").key_code, Some(36)); // kVK_Return
        assert_eq!(ActionCatalog::lookup("escape").key_code, Some(53)); // kVK_Escape
        assert_eq!(ActionCatalog::lookup("space").key_code, Some(49)); // kVK_Space
        assert_eq!(ActionCatalog::lookup("tab").key_code, Some(48)); // kVK_Tab
        assert_eq!(ActionCatalog::lookup("command").key_code, Some(55)); // kVK_Command
    }
}
