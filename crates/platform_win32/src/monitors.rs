//! Monitor enumeration.

use crate::Win32Error;
use desktopblocks_core::{Monitor, Rect};

#[cfg(windows)]
use windows::Win32::Foundation::{BOOL, LPARAM, RECT, TRUE};
#[cfg(windows)]
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};
#[cfg(windows)]
use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};

/// MONITORINFOF_PRIMARY
#[cfg_attr(not(windows), allow(dead_code))]
const PRIMARY_FLAG: u32 = 1;

/// Build a [`Monitor`] from the fields of a MONITORINFOEXW.
///
/// The `\\.\` prefix of GDI device names is dropped.
#[cfg_attr(not(windows), allow(dead_code))]
fn to_monitor(
    id: u64,
    bounds: Rect,
    work_area: Rect,
    flags: u32,
    device: &[u16],
    dpi: Option<u32>,
) -> Monitor {
    let mut monitor = Monitor::new(id, bounds);
    monitor.work_area = work_area;
    monitor.is_primary = flags & PRIMARY_FLAG != 0;
    monitor.device_name = crate::from_wide(device)
        .trim_start_matches("\\\\.\\")
        .to_string();
    monitor.scale_factor = Monitor::scale_factor_from_dpi(dpi);
    monitor
}

#[cfg(windows)]
fn from_win32_rect(rect: &RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

#[cfg(windows)]
unsafe extern "system" fn enum_monitor_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let monitors = &mut *(lparam.0 as *mut Vec<Monitor>);

    let mut info = MONITORINFOEXW {
        monitorInfo: MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFOEXW>() as u32,
            ..Default::default()
        },
        ..Default::default()
    };
    if !GetMonitorInfoW(hmonitor, &mut info.monitorInfo).as_bool() {
        // Keep going; a partial list beats none.
        tracing::warn!("GetMonitorInfoW failed for monitor {:?}", hmonitor.0);
        return TRUE;
    }

    let mut dpi_x = 0u32;
    let mut dpi_y = 0u32;
    let dpi = match GetDpiForMonitor(hmonitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) {
        Ok(()) => Some(dpi_x),
        Err(e) => {
            tracing::warn!("DPI query failed for monitor {:?}, using 100%: {}", hmonitor.0, e);
            None
        }
    };

    monitors.push(to_monitor(
        hmonitor.0 as usize as u64,
        from_win32_rect(&info.monitorInfo.rcMonitor),
        from_win32_rect(&info.monitorInfo.rcWork),
        info.monitorInfo.dwFlags,
        &info.szDevice,
        dpi,
    ));
    TRUE
}

/// Enumerate all display monitors in system order.
#[cfg(windows)]
pub fn enumerate_monitors() -> Result<Vec<Monitor>, Win32Error> {
    let mut monitors: Vec<Monitor> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_proc),
            LPARAM(&mut monitors as *mut Vec<Monitor> as isize),
        )
    };
    if !ok.as_bool() {
        return Err(Win32Error::EnumerationFailed(
            "EnumDisplayMonitors returned FALSE".to_string(),
        ));
    }

    for m in &monitors {
        tracing::debug!(
            "Monitor {} at ({}, {}) {}x{} scale {:.2}{}",
            m.device_name,
            m.bounds.left,
            m.bounds.top,
            m.bounds.width(),
            m.bounds.height(),
            m.scale_factor,
            if m.is_primary { " (primary)" } else { "" }
        );
    }
    Ok(monitors)
}

#[cfg(not(windows))]
pub fn enumerate_monitors() -> Result<Vec<Monitor>, Win32Error> {
    Err(Win32Error::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str) -> [u16; 32] {
        let mut buf = [0u16; 32];
        for (i, c) in name.encode_utf16().enumerate() {
            buf[i] = c;
        }
        buf
    }

    #[test]
    fn test_to_monitor_primary_with_dpi() {
        let m = to_monitor(
            7,
            Rect::new(0, 0, 2560, 1440),
            Rect::new(0, 0, 2560, 1400),
            PRIMARY_FLAG,
            &device("\\\\.\\DISPLAY1"),
            Some(144),
        );
        assert_eq!(m.id, 7);
        assert!(m.is_primary);
        assert_eq!(m.device_name, "DISPLAY1");
        assert_eq!(m.caption(), "DISPLAY1 2560x1440 (150%) *");
        assert_eq!(m.work_area.height(), 1400);
        assert_eq!(m.scale_factor, 1.5);
    }

    #[test]
    fn test_to_monitor_dpi_fallback() {
        let m = to_monitor(
            8,
            Rect::new(-1920, 0, 0, 1080),
            Rect::new(-1920, 0, 0, 1040),
            0,
            &device("\\\\.\\DISPLAY2"),
            None,
        );
        assert!(!m.is_primary);
        assert_eq!(m.scale_factor, 1.0);
    }
}
