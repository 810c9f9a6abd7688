//! DesktopBlocks Platform Win32
//!
//! Supplies the DesktopBlocks core with desktop snapshots using Win32 APIs.
//!
//! This crate handles:
//! - Monitor enumeration with per-monitor DPI (EnumDisplayMonitors, GetDpiForMonitor)
//! - Top-level window enumeration in z-order with owner links (EnumWindows)
//! - Raw pixel capture of a monitor for the overlay variant (BitBlt, GetDIBits)
//! - Process DPI awareness
//!
//! On other targets every entry point returns [`Win32Error::Unsupported`].

mod capture;
mod monitors;
mod toplevel;

pub use capture::capture_screen;
pub use monitors::enumerate_monitors;
pub use toplevel::enumerate_windows;

use desktopblocks_core::{
    DesktopSource, Monitor, PixelBuffer, RawWindow, Rect, ScreenCapture, SourceError,
};
use thiserror::Error;

/// Errors that can occur during Win32 operations.
#[derive(Debug, Error)]
pub enum Win32Error {
    #[error("Failed to enumerate: {0}")]
    EnumerationFailed(String),

    #[error("Failed to capture screen: {0}")]
    CaptureFailed(String),

    #[error("Failed to create window: {0}")]
    WindowCreationFailed(String),

    #[error("Win32 APIs are not available on this platform")]
    Unsupported,
}

impl From<Win32Error> for SourceError {
    fn from(err: Win32Error) -> Self {
        match err {
            Win32Error::CaptureFailed(msg) => SourceError::Capture(msg),
            other => SourceError::Enumeration(other.to_string()),
        }
    }
}

/// Opt the process into per-monitor DPI awareness so that monitor and
/// window rectangles are reported in physical pixels.
///
/// Must run before any window is created. Failure is logged and ignored;
/// the desktop is then reported in scaled coordinates.
#[cfg(windows)]
pub fn set_dpi_awareness() {
    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };

    match unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
        Ok(()) => tracing::debug!("Per-monitor DPI awareness enabled"),
        Err(e) => tracing::warn!("Could not enable per-monitor DPI awareness: {}", e),
    }
}

#[cfg(not(windows))]
pub fn set_dpi_awareness() {
    tracing::warn!("DPI awareness is only available on Windows");
}

/// The live Windows desktop.
///
/// Implements both collaborator traits of the core. Each call takes a
/// fresh snapshot; nothing is cached between refreshes.
#[derive(Debug, Default)]
pub struct Win32Desktop {
    _private: (),
}

impl Win32Desktop {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DesktopSource for Win32Desktop {
    fn refresh_monitors(&mut self) -> Result<Vec<Monitor>, SourceError> {
        let monitors = enumerate_monitors()?;
        tracing::debug!("Enumerated {} monitors", monitors.len());
        Ok(monitors)
    }

    fn refresh_windows(&mut self) -> Result<Vec<RawWindow>, SourceError> {
        let windows = enumerate_windows()?;
        tracing::debug!("Enumerated {} top-level windows", windows.len());
        Ok(windows)
    }
}

impl ScreenCapture for Win32Desktop {
    fn capture(&mut self, bounds: Rect) -> Result<PixelBuffer, SourceError> {
        Ok(capture_screen(bounds)?)
    }
}

/// Decode a NUL-terminated UTF-16 buffer as filled in by Win32.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}
