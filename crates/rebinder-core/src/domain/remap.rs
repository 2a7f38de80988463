//! The per-event remap decision.
//!
//! [`decide`] runs inside the event-tap callback for every secondary-button
//! press and release, so it must be fast and allocation-free: one flag read
//! and one hash-map lookup against the current [`MappingConfig`] snapshot.
//!
//! Semantics:
//!
//! - Disabled, or button unmapped → the raw event passes through unchanged.
//! - Mapped and pressed → suppress the raw event and synthesize one
//!   key-down/key-up pair.  Triggering on press (not release) keeps the
//!   substituted action responsive while the mouse is moving.
//! - Mapped and released → suppress with no synthesis.  Both phases of a
//!   mapped button are consumed so the foreground application never sees
//!   the raw click alongside the substituted key.

use crate::catalog::KeyCode;
use crate::domain::mapping::{ButtonNumber, MappingConfig};

/// Which half of a button gesture an event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Pressed,
    Released,
}

/// What happens to the raw mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapVerdict {
    /// Deliver the original event to the system unchanged.
    PassThrough,
    /// Consume the original event; the system never sees it.
    Suppress,
}

/// The full outcome for one event: the verdict on the raw event plus the
/// key to synthesize in its place, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapDecision {
    pub verdict: TapVerdict,
    /// `Some(key)` exactly when a key-down/key-up pair must be posted.
    pub synthesize: Option<KeyCode>,
}

impl RemapDecision {
    /// The no-op decision: original event continues, nothing synthesized.
    pub fn pass_through() -> Self {
        Self {
            verdict: TapVerdict::PassThrough,
            synthesize: None,
        }
    }
}

/// Decides the fate of one secondary-button event against the current
/// config snapshot.
pub fn decide(config: &MappingConfig, button: ButtonNumber, phase: ButtonPhase) -> RemapDecision {
    if !config.enabled() {
        return RemapDecision::pass_through();
    }
    let Some(key) = config.key_for(button) else {
        return RemapDecision::pass_through();
    };

    RemapDecision {
        verdict: TapVerdict::Suppress,
        synthesize: (phase == ButtonPhase::Pressed).then_some(key),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
