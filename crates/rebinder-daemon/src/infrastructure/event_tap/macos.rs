//! Quartz event-tap backend for macOS.
//!
//! Installs a `CGEventTap` at the HID tap location, head-inserted, listening
//! to exactly `otherMouseDown`/`otherMouseUp` — never primary-button or
//! motion events.  The tap runs on a dedicated `CFRunLoop` thread; the
//! callback reaches the controller through the opaque context pointer
//! registered at creation time, so there is no global mutable state.
//!
//! # Permissions
//!
//! Observing and injecting global input requires Accessibility permission
//! (System Settings > Privacy & Security > Accessibility).  The check is
//! synchronous; the prompt is only issued by [`request_accessibility_access`]
//! at daemon startup.
//!
//! # Safety
//!
//! This module uses `unsafe` exclusively for Core Graphics / Core Foundation
//! FFI calls.  All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "macos")]

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;
use std::thread;

use core_foundation::base::{CFRelease, CFTypeRef, TCFType};
use core_foundation::runloop::kCFRunLoopCommonModes;
use rebinder_core::{ButtonPhase, KeyCode, TapVerdict};
use tracing::debug;

use crate::application::tap_controller::{
    KeySynthesizer, SynthesisError, TapError, TapEventHandler, TapHandle, TapPlatform,
};

// Core Graphics event types
type CGEventRef = CFTypeRef;
type CGEventTapProxy = *const c_void;
type CGEventMask = u64;

// CGEventTap location
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code, clippy::enum_variant_names)]
enum CGEventTapLocation {
    HIDEventTap = 0,
    SessionEventTap = 1,
    AnnotatedSessionEventTap = 2,
}

// CGEventTap placement
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code, clippy::enum_variant_names)]
enum CGEventTapPlacement {
    HeadInsertEventTap = 0,
    TailAppendEventTap = 1,
}

// CGEventTap options
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code)]
enum CGEventTapOptions {
    DefaultTap = 0,
    ListenOnly = 1,
}

// CGEventType values for the secondary-button events we subscribe to.
const CG_EVENT_OTHER_MOUSE_DOWN: u32 = 25;
const CG_EVENT_OTHER_MOUSE_UP: u32 = 26;

// CGEventField: the button number carried by a mouse event.
const CG_MOUSE_EVENT_BUTTON_NUMBER: u32 = 3;

// CGEventSourceStateID: combined session state, matching real user input.
const CG_EVENT_SOURCE_STATE_COMBINED_SESSION: i32 = 0;

// CGEventTapLocation value for CGEventPost: kCGHIDEventTap.
const CG_HID_EVENT_TAP: u32 = 0;

/// Event mask selecting exactly the secondary-button press/release events.
fn secondary_button_mask() -> CGEventMask {
    (1 << CG_EVENT_OTHER_MOUSE_DOWN) | (1 << CG_EVENT_OTHER_MOUSE_UP)
}

// FFI declarations for Core Graphics
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: CGEventTapPlacement,
        options: CGEventTapOptions,
        events_of_interest: CGEventMask,
        callback: extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef,
        user_info: *mut c_void,
    ) -> CFTypeRef;

    fn CGEventTapEnable(tap: CFTypeRef, enable: bool);

    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;

    fn CGEventSourceCreate(state_id: i32) -> CFTypeRef;

    fn CGEventCreateKeyboardEvent(
        source: CFTypeRef,
        virtual_key: u16,
        key_down: bool,
    ) -> CGEventRef;

    fn CGEventPost(tap: u32, event: CGEventRef);
}

// FFI declarations for Core Foundation
#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFTypeRef,
        port: CFTypeRef,
        order: i64,
    ) -> CFTypeRef;

    fn CFMachPortInvalidate(port: CFTypeRef);

    fn CFRunLoopGetCurrent() -> CFTypeRef;
    fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRun();
    fn CFRunLoopStop(rl: CFTypeRef);
    fn CFRunLoopSourceInvalidate(source: CFTypeRef);
}

// FFI declarations for Accessibility
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFTypeRef) -> bool;
}

/// Checks whether Accessibility permission is currently granted.
pub fn accessibility_granted() -> bool {
    // SAFETY: AXIsProcessTrusted takes no arguments and only reads process state.
    unsafe { AXIsProcessTrusted() }
}

/// Requests Accessibility permission, showing the system dialog if it has
/// not been granted yet.  Returns `true` if already granted.
pub fn request_accessibility_access() -> bool {
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    // SAFETY: `options` outlives the call; the function only reads it.
    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as CFTypeRef) }
}

/// Context handed to the tap callback through `user_info`.
///
/// Owned by the tap thread: it is freed only after `CFRunLoopRun` returns,
/// and the callback runs exclusively on that same thread, so the reference
/// taken in the callback can never dangle.
struct TapContext {
    handler: TapEventHandler,
}

/// The event tap callback, invoked by the OS on the tap thread for each
/// subscribed event.  Returns the event to deliver it, null to suppress it.
extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    if user_info.is_null() {
        return event;
    }
    // SAFETY: user_info is the TapContext registered at tap creation; see
    // the TapContext lifetime note above.
    let context = unsafe { &*(user_info as *const TapContext) };

    let phase = match event_type {
        CG_EVENT_OTHER_MOUSE_DOWN => ButtonPhase::Pressed,
        CG_EVENT_OTHER_MOUSE_UP => ButtonPhase::Released,
        // Anything else (including kCGEventTapDisabledByTimeout) passes
        // through untouched.
        _ => return event,
    };

    // SAFETY: event is a valid CGEvent for the duration of the callback.
    let button = unsafe { CGEventGetIntegerValueField(event, CG_MOUSE_EVENT_BUTTON_NUMBER) };

    match (context.handler)(phase, button) {
        TapVerdict::PassThrough => event,
        TapVerdict::Suppress => ptr::null(),
    }
}

/// Raw CF pointer wrapper so tap resources can move onto the tap thread.
#[derive(Copy, Clone)]
struct SendPtr(CFTypeRef);

// SAFETY: the wrapped CFMachPort/CFRunLoopSource are thread-safe CF objects;
// each pointer is only invalidated once (shutdown) and released once (tap
// thread, after the run loop exits).
unsafe impl Send for SendPtr {}

/// Raw context pointer wrapper; freed by the tap thread after its loop exits.
#[derive(Copy, Clone)]
struct SendContext(*mut TapContext);

// SAFETY: ownership is transferred to the tap thread; no other thread
// dereferences the pointer after the handle is constructed.
unsafe impl Send for SendContext {}

/// Quartz implementation of [`TapPlatform`].
pub struct QuartzTapPlatform;

impl QuartzTapPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuartzTapPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TapPlatform for QuartzTapPlatform {
    fn permission_granted(&self) -> bool {
        accessibility_granted()
    }

    fn install(&self, handler: TapEventHandler) -> Result<Box<dyn TapHandle>, TapError> {
        let context = Box::into_raw(Box::new(TapContext { handler }));

        // SAFETY: the callback and context stay valid for the tap's
        // lifetime; the context is freed by the tap thread after its run
        // loop exits.
        let tap = unsafe {
            CGEventTapCreate(
                CGEventTapLocation::HIDEventTap,
                CGEventTapPlacement::HeadInsertEventTap,
                CGEventTapOptions::DefaultTap,
                secondary_button_mask(),
                tap_callback,
                context as *mut c_void,
            )
        };
        if tap.is_null() {
            // SAFETY: the context was never registered with a live tap.
            unsafe { drop(Box::from_raw(context)) };
            return Err(TapError::CreationFailed);
        }

        // SAFETY: tap is a valid CFMachPort created above.
        let source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
        if source.is_null() {
            // SAFETY: releasing the tap we own; context never registered.
            unsafe {
                CFRelease(tap);
                drop(Box::from_raw(context));
            }
            return Err(TapError::CreationFailed);
        }

        // Published by the tap thread once its run loop exists, read by
        // shutdown() for cancellation.
        let run_loop = Arc::new(AtomicPtr::<c_void>::new(ptr::null_mut()));

        let thread_tap = SendPtr(tap);
        let thread_source = SendPtr(source);
        let thread_context = SendContext(context);
        let run_loop_slot = Arc::clone(&run_loop);

        let spawned = thread::Builder::new()
            .name("rebinder-event-tap".to_string())
            .spawn(move || {
                // SAFETY: standard attach-source/enable-tap/run sequence on
                // the thread that owns this run loop.  After CFRunLoopRun
                // returns no callback can execute (callbacks only run on
                // this thread), so releasing the CF objects and freeing the
                // context here cannot race a live callback.
                unsafe {
                    let rl = CFRunLoopGetCurrent();
                    run_loop_slot.store(rl as *mut c_void, Ordering::SeqCst);
                    CFRunLoopAddSource(rl, thread_source.0, kCFRunLoopCommonModes as CFTypeRef);
                    CGEventTapEnable(thread_tap.0, true);
                    CFRunLoopRun();

                    CFRelease(thread_source.0);
                    CFRelease(thread_tap.0);
                    drop(Box::from_raw(thread_context.0));
                }
                debug!("event-tap thread exited");
            });

        if let Err(e) = spawned {
            // The closure never ran, so we still own everything.
            // SAFETY: releasing objects created above; context unregistered.
            unsafe {
                CFRelease(source);
                CFRelease(tap);
                drop(Box::from_raw(context));
            }
            return Err(TapError::ThreadSpawn(e.to_string()));
        }

        Ok(Box::new(QuartzTapHandle {
            tap: SendPtr(tap),
            source: SendPtr(source),
            run_loop,
        }))
    }
}

/// Handle to a live Quartz tap: the mach port, its run-loop source, and the
/// run loop driving it.
struct QuartzTapHandle {
    tap: SendPtr,
    source: SendPtr,
    run_loop: Arc<AtomicPtr<c_void>>,
}

impl TapHandle for QuartzTapHandle {
    fn shutdown(self: Box<Self>) {
        // Order matters: invalidate the source, then the port, then ask the
        // loop to stop, so the tap thread observes a clean teardown and
        // exits CFRunLoopRun instead of touching a freed resource.
        //
        // If this races ahead of the thread publishing its run loop, the
        // invalidated source leaves that loop with nothing to wait on and
        // CFRunLoopRun returns on its own; the thread still exits.
        // SAFETY: each pointer is invalidated exactly once; release happens
        // later on the tap thread.
        unsafe {
            CFRunLoopSourceInvalidate(self.source.0);
            CFMachPortInvalidate(self.tap.0);
            let rl = self.run_loop.load(Ordering::SeqCst);
            if !rl.is_null() {
                CFRunLoopStop(rl as CFTypeRef);
            }
        }
    }
}

/// Quartz implementation of [`KeySynthesizer`]: posts a key-down/key-up
/// pair to the HID event tap, as the original hardware path would.
pub struct QuartzKeySynthesizer;

impl QuartzKeySynthesizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuartzKeySynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySynthesizer for QuartzKeySynthesizer {
    fn post_key_tap(&self, key: KeyCode) -> Result<(), SynthesisError> {
        // SAFETY: every created CF object is released before returning;
        // CGEventPost copies the event into the system queue.
        unsafe {
            let source = CGEventSourceCreate(CG_EVENT_SOURCE_STATE_COMBINED_SESSION);
            if source.is_null() {
                return Err(SynthesisError::NoEventSource);
            }

            let key_down = CGEventCreateKeyboardEvent(source, key, true);
            let key_up = CGEventCreateKeyboardEvent(source, key, false);
            if key_down.is_null() || key_up.is_null() {
                if !key_down.is_null() {
                    CFRelease(key_down);
                }
                if !key_up.is_null() {
                    CFRelease(key_up);
                }
                CFRelease(source);
                return Err(SynthesisError::EventConstruction);
            }

            CGEventPost(CG_HID_EVENT_TAP, key_down);
            CGEventPost(CG_HID_EVENT_TAP, key_up);

            CFRelease(key_down);
            CFRelease(key_up);
            CFRelease(source);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessibility_check_does_not_panic() {
        // Returns false in CI where no permission is granted.
        let _granted = accessibility_granted();
    }

    #[test]
    fn test_mask_selects_exactly_secondary_button_events() {
        let mask = secondary_button_mask();
        assert!(mask & (1 << CG_EVENT_OTHER_MOUSE_DOWN) != 0);
        assert!(mask & (1 << CG_EVENT_OTHER_MOUSE_UP) != 0);
        // Primary-button and motion events must not be selected.
        for excluded in [1u32, 2, 3, 4, 5, 6, 7, 27] {
            assert_eq!(mask & (1 << excluded), 0, "event type {excluded} selected");
        }
    }

    #[test]
    fn test_install_without_permission_reports_creation_failure() {
        if accessibility_granted() {
            // Can't exercise the failure path on a trusted host.
            return;
        }
        let platform = QuartzTapPlatform::new();
        let result = platform.install(Arc::new(|_, _| TapVerdict::PassThrough));
        assert!(matches!(result, Err(TapError::CreationFailed)));
    }
}
