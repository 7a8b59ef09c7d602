//! Native tweaks for locked overlay windows.
//!
//! Tauri already covers frame, transparency, always-on-top and cursor
//! pass-through. On top of that a locked window should:
//! - float above normal windows and follow the user across spaces (macOS)
//! - stay out of Alt+Tab and the taskbar (Windows)
//! - cast no shadow, which would otherwise catch clicks at its edge
//!
//! Unlocked windows are left as ordinary application windows.

use chatlay_core::{Error, OverlayMode};
use tauri::{Runtime, WebviewWindow};
use tracing::debug;

pub fn configure_overlay<R: Runtime>(
    window: &WebviewWindow<R>,
    mode: OverlayMode,
) -> Result<(), Error> {
    if !mode.is_locked() {
        return Ok(());
    }

    debug!("Applying native overlay settings to {}", window.label());

    #[cfg(target_os = "macos")]
    configure_overlay_macos(window)?;

    #[cfg(target_os = "windows")]
    configure_overlay_windows(window)?;

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let _ = window;

    Ok(())
}

#[cfg(target_os = "macos")]
fn configure_overlay_macos<R: Runtime>(window: &WebviewWindow<R>) -> Result<(), Error> {
    use objc2::rc::Retained;
    use objc2_app_kit::{NSFloatingWindowLevel, NSWindow, NSWindowCollectionBehavior};

    let ns_window_ptr = window
        .ns_window()
        .map_err(|e| Error::WindowOperation(format!("Failed to get NSWindow handle: {}", e)))?;

    // SAFETY: the pointer stays valid while the Tauri window exists, and the
    // retain keeps it alive for the duration of this call.
    let ns_window: Retained<NSWindow> = unsafe { Retained::retain(ns_window_ptr as *mut NSWindow) }
        .ok_or_else(|| Error::WindowOperation("NSWindow pointer was null".to_string()))?;

    ns_window.setLevel(NSFloatingWindowLevel);
    ns_window.setHasShadow(false);
    ns_window.setCollectionBehavior(
        NSWindowCollectionBehavior::CanJoinAllSpaces
            | NSWindowCollectionBehavior::Stationary
            | NSWindowCollectionBehavior::IgnoresCycle
            | NSWindowCollectionBehavior::FullScreenAuxiliary,
    );

    Ok(())
}

#[cfg(target_os = "windows")]
fn configure_overlay_windows<R: Runtime>(window: &WebviewWindow<R>) -> Result<(), Error> {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        GWL_EXSTYLE, GetWindowLongPtrW, HWND_TOPMOST, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
        SetWindowLongPtrW, SetWindowPos, WS_EX_TOOLWINDOW,
    };

    let hwnd = window
        .hwnd()
        .map_err(|e| Error::WindowOperation(format!("Failed to get HWND handle: {}", e)))?;

    unsafe {
        let hwnd = HWND(hwnd.0);

        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE) | WS_EX_TOOLWINDOW.0 as isize;
        SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style);

        SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        )
        .map_err(|e| Error::WindowOperation(format!("Failed to raise overlay: {}", e)))?;
    }

    Ok(())
}
