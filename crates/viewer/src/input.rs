//! Mapping of toolkit input onto session events.
//!
//! Kept free of Win32 types so the bindings can be tested anywhere.

use desktopblocks_core::{HostEvent, MouseButton, PointF, ZoomDirection};

// Menu command identifiers.
pub const IDM_ZOOM_RESET: u16 = 1001;
pub const IDM_ZOOM_IN: u16 = 1002;
pub const IDM_ZOOM_OUT: u16 = 1003;
pub const IDM_REFRESH: u16 = 1004;
pub const IDM_CLEAR_SELECTION: u16 = 1005;

/// Control identifier of the window list.
pub const IDC_WINDOW_LIST: u16 = 2001;

/// Keys the canvas reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Plus,
    Minus,
    Zero,
    Left,
    Right,
    Up,
    Down,
    Refresh,
    Escape,
}

impl Key {
    /// Translate a Win32 virtual-key code.
    pub fn from_virtual_key(vk: u16) -> Option<Key> {
        match vk {
            0x6B | 0xBB => Some(Key::Plus), // VK_ADD, VK_OEM_PLUS
            0x6D | 0xBD => Some(Key::Minus), // VK_SUBTRACT, VK_OEM_MINUS
            0x30 | 0x60 => Some(Key::Zero), // '0', VK_NUMPAD0
            0x25 => Some(Key::Left),
            0x26 => Some(Key::Up),
            0x27 => Some(Key::Right),
            0x28 => Some(Key::Down),
            0x74 => Some(Key::Refresh), // VK_F5
            0x1B => Some(Key::Escape),
            _ => None,
        }
    }
}

/// Event for a key press. Arrow keys move the view toward that side, so
/// the content shifts the opposite way.
pub fn key_event(key: Key, pan_step: f64) -> HostEvent {
    match key {
        Key::Plus => HostEvent::Zoom(ZoomDirection::In),
        Key::Minus => HostEvent::Zoom(ZoomDirection::Out),
        Key::Zero => HostEvent::ResetZoom,
        Key::Left => HostEvent::Pan {
            dx: pan_step,
            dy: 0.0,
        },
        Key::Right => HostEvent::Pan {
            dx: -pan_step,
            dy: 0.0,
        },
        Key::Up => HostEvent::Pan {
            dx: 0.0,
            dy: pan_step,
        },
        Key::Down => HostEvent::Pan {
            dx: 0.0,
            dy: -pan_step,
        },
        Key::Refresh => HostEvent::Refresh,
        Key::Escape => HostEvent::ClearSelection,
    }
}

pub fn menu_event(id: u16) -> Option<HostEvent> {
    match id {
        IDM_ZOOM_RESET => Some(HostEvent::ResetZoom),
        IDM_ZOOM_IN => Some(HostEvent::Zoom(ZoomDirection::In)),
        IDM_ZOOM_OUT => Some(HostEvent::Zoom(ZoomDirection::Out)),
        IDM_REFRESH => Some(HostEvent::Refresh),
        IDM_CLEAR_SELECTION => Some(HostEvent::ClearSelection),
        _ => None,
    }
}

/// Mouse messages the canvas handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseInput {
    LeftDown,
    RightDown,
    MiddleDown,
    LeftDoubleClick,
}

pub fn mouse_event(input: MouseInput, at: PointF) -> HostEvent {
    match input {
        MouseInput::LeftDown => HostEvent::Click {
            button: MouseButton::Primary,
            at,
        },
        MouseInput::RightDown => HostEvent::Click {
            button: MouseButton::Secondary,
            at,
        },
        MouseInput::MiddleDown => HostEvent::SelectAt(at),
        MouseInput::LeftDoubleClick => HostEvent::DoubleClick { at },
    }
}

/// Client coordinates packed into a mouse message LPARAM. Both words are
/// signed; they go negative on multi-monitor setups.
pub fn point_from_lparam(lparam: isize) -> PointF {
    let x = (lparam & 0xFFFF) as u16 as i16;
    let y = ((lparam >> 16) & 0xFFFF) as u16 as i16;
    PointF::new(f64::from(x), f64::from(y))
}

/// Width and height packed into a WM_SIZE LPARAM.
pub fn size_from_lparam(lparam: isize) -> (i32, i32) {
    let width = (lparam & 0xFFFF) as i32;
    let height = ((lparam >> 16) & 0xFFFF) as i32;
    (width, height)
}

/// (LOWORD, HIWORD) of a WM_COMMAND WPARAM.
pub fn split_command(wparam: usize) -> (u16, u16) {
    ((wparam & 0xFFFF) as u16, ((wparam >> 16) & 0xFFFF) as u16)
}
