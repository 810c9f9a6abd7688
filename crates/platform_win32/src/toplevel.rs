//! Top-level window enumeration.
//!
//! EnumWindows reports windows front to back, so the order of the returned
//! list is the z-order the core indexes by.

use crate::Win32Error;
use desktopblocks_core::RawWindow;

#[cfg(windows)]
use desktopblocks_core::{Rect, WindowId};
#[cfg(windows)]
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindow, GetWindowRect, GetWindowTextW, IsWindowVisible,
    GW_OWNER,
};

#[cfg(windows)]
const TEXT_CAPACITY: usize = 256;

#[cfg(windows)]
fn hwnd_id(hwnd: HWND) -> WindowId {
    hwnd.0 as usize as WindowId
}

/// Read one window; `None` if its rectangle cannot be queried.
#[cfg(windows)]
unsafe fn read_window(hwnd: HWND) -> Option<RawWindow> {
    let mut rect = RECT::default();
    if GetWindowRect(hwnd, &mut rect).is_err() {
        return None;
    }

    let mut title = [0u16; TEXT_CAPACITY];
    GetWindowTextW(hwnd, &mut title);
    let mut class_name = [0u16; TEXT_CAPACITY];
    GetClassNameW(hwnd, &mut class_name);

    let parent_id = GetWindow(hwnd, GW_OWNER)
        .ok()
        .filter(|owner| !owner.is_invalid())
        .map(hwnd_id);

    Some(RawWindow {
        id: hwnd_id(hwnd),
        parent_id,
        bounds: Rect::new(rect.left, rect.top, rect.right, rect.bottom),
        title: crate::from_wide(&title),
        class_name: crate::from_wide(&class_name),
        os_visible: IsWindowVisible(hwnd).as_bool(),
    })
}

#[cfg(windows)]
unsafe extern "system" fn enum_windows_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<RawWindow>);
    match read_window(hwnd) {
        Some(window) => windows.push(window),
        None => tracing::debug!("Skipping window {:?}: no rectangle", hwnd.0),
    }
    TRUE
}

/// Enumerate every top-level window, frontmost first.
///
/// Hidden and untitled windows are included; the core decides what is
/// drawn.
#[cfg(windows)]
pub fn enumerate_windows() -> Result<Vec<RawWindow>, Win32Error> {
    let mut windows: Vec<RawWindow> = Vec::new();
    unsafe {
        EnumWindows(
            Some(enum_windows_proc),
            LPARAM(&mut windows as *mut Vec<RawWindow> as isize),
        )
    }
    .map_err(|e| Win32Error::EnumerationFailed(format!("EnumWindows: {}", e)))?;

    Ok(windows)
}

#[cfg(not(windows))]
pub fn enumerate_windows() -> Result<Vec<RawWindow>, Win32Error> {
    Err(Win32Error::Unsupported)
}
