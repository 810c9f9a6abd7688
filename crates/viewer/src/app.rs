//! Win32 host window.
//!
//! One top-level window with a menu bar, a canvas on the left and the window
//! list on the right. All state lives in a thread-local [`App`]; the window
//! procedure translates messages into [`HostEvent`]s and applies the
//! resulting [`Outcome`]s.

use crate::config::{Config, ViewerMode};
use crate::input::{
    key_event, menu_event, mouse_event, point_from_lparam, size_from_lparam, split_command, Key,
    MouseInput, IDC_WINDOW_LIST, IDM_CLEAR_SELECTION, IDM_REFRESH, IDM_ZOOM_IN, IDM_ZOOM_OUT,
    IDM_ZOOM_RESET,
};
use crate::paint::paint_frame;
use anyhow::{anyhow, Context, Result};
use desktopblocks_core::overlay::overlay_frame;
use desktopblocks_core::{
    Frame, Generation, HostEvent, Outcome, OverlayLayout, OverlayOptions, PixelBuffer, Primitive,
    ScreenCapture, Session, Size, Snapshot, WindowCatalog,
};
use desktopblocks_platform_win32::{Win32Desktop, Win32Error};
use std::cell::RefCell;
use std::ffi::c_void;
use tracing::{debug, error, info, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, EndPaint, InvalidateRect, UpdateWindow, PAINTSTRUCT,
};
use windows::Win32::UI::Input::KeyboardAndMouse::SetFocus;
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, AppendMenuW, CreateMenu, CreatePopupMenu, CreateWindowExW, DefWindowProcW,
    DispatchMessageW, GetClientRect, GetMessageW, LoadCursorW, MoveWindow, PostQuitMessage,
    RegisterClassW, SendMessageW, SetMenu, SetWindowTextW, ShowWindow, TranslateMessage,
    CS_DBLCLKS, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, HMENU, IDC_ARROW, LBN_SELCHANGE,
    LBS_NOINTEGRALHEIGHT, LBS_NOTIFY, LB_ADDSTRING, LB_ERR, LB_GETCURSEL, LB_RESETCONTENT,
    LB_SETCURSEL, MF_POPUP, MF_SEPARATOR, MF_STRING, MSG, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE,
    WM_COMMAND, WM_DESTROY, WM_ERASEBKGND, WM_KEYDOWN, WM_LBUTTONDBLCLK, WM_LBUTTONDOWN,
    WM_MBUTTONDOWN, WM_PAINT, WM_RBUTTONDOWN, WM_SIZE, WNDCLASSW, WS_CAPTION, WS_CHILD,
    WS_CLIPCHILDREN, WS_EX_CLIENTEDGE, WS_MINIMIZEBOX, WS_OVERLAPPEDWINDOW, WS_SYSMENU,
    WS_VISIBLE, WS_VSCROLL,
};

const TITLE: &str = "Desktop Blocks";
const OVERLAY_TITLE: &str = "Desktop Blocks - Background";

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// Zero-terminated UTF-16 for Win32 string parameters.
fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Screenshot view of a single monitor.
struct OverlayView {
    layout: OverlayLayout,
    windows: WindowCatalog,
    image: Option<PixelBuffer>,
    options: OverlayOptions,
}

impl OverlayView {
    /// Snapshot the desktop and capture the primary monitor. Runs before
    /// the host window exists so the window is not part of the capture.
    fn capture(config: &Config) -> Result<Self> {
        let mut desktop = Win32Desktop::new();
        let snapshot = Snapshot::capture(Generation::default().next(), &mut desktop)
            .context("Failed to enumerate the desktop")?;

        let monitor = snapshot
            .monitors()
            .primary()
            .or_else(|| snapshot.monitors().monitors().first())
            .ok_or_else(|| anyhow!("No monitors were enumerated"))?
            .clone();

        let layout = OverlayLayout::for_monitor(monitor.bounds, config.overlay.max_height)?;
        info!("Overlay on {}: {}", monitor.device_name, layout.debug_line());

        let image = match desktop.capture(monitor.bounds) {
            Ok(image) => {
                info!("Captured image: {}x{}", image.width(), image.height());
                Some(image)
            }
            Err(e) => {
                warn!("Drawing outlines without a background: {}", e);
                None
            }
        };

        Ok(Self {
            layout,
            windows: snapshot.windows().clone(),
            image,
            options: config.overlay_options(),
        })
    }
}

enum Mode {
    Wireframe(Box<Session<Win32Desktop>>),
    Overlay(OverlayView),
}

struct App {
    hwnd: HWND,
    list: Option<HWND>,
    mode: Mode,
    pan_step: f64,
    list_width: i32,
    title: String,
}

impl App {
    fn set_title(&mut self, title: String) {
        if title == self.title {
            return;
        }
        let text = wide(&title);
        // WM_SETTEXT re-enters the window procedure while APP is borrowed;
        // it falls through to DefWindowProcW there.
        if let Err(e) = unsafe { SetWindowTextW(self.hwnd, PCWSTR(text.as_ptr())) } {
            warn!("SetWindowTextW failed: {}", e);
        }
        self.title = title;
    }

    fn invalidate(&self) {
        unsafe {
            let _ = InvalidateRect(Some(self.hwnd), None, false);
        }
    }

    fn dispatch(&mut self, event: HostEvent) {
        let outcomes = match &mut self.mode {
            Mode::Wireframe(session) => {
                session.push(event);
                session.pump()
            }
            Mode::Overlay(_) => return,
        };
        for outcome in outcomes {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        let Mode::Wireframe(session) = &self.mode else {
            return;
        };

        if let Some(err) = &outcome.error {
            if err.is_configuration() {
                warn!("Nothing to draw: {}", err);
            } else {
                error!("{}", err);
            }
            self.set_title(format!("{} - {}", TITLE, err));
        } else if outcome.table_changed {
            let title = match session.snapshot() {
                Some(snapshot) => format!(
                    "{} - {} monitors, {} windows",
                    TITLE,
                    snapshot.monitors().len(),
                    snapshot.windows().len()
                ),
                None => TITLE.to_string(),
            };
            self.set_title(title);
        }

        if outcome.table_changed {
            self.reload_list();
        }
        // Keep the list highlight in step with the canvas, including after
        // Esc or "Clear Selection".
        if outcome.selection_cleared || outcome.selected.is_some() {
            self.sync_list_selection();
        }
        if let Some(id) = outcome.selected {
            debug!("Selected window {:#x}", id);
        }
        if outcome.redraw {
            self.invalidate();
        }
    }

    fn reload_list(&self) {
        let (Some(list), Mode::Wireframe(session)) = (self.list, &self.mode) else {
            return;
        };

        let table = session.table();
        unsafe {
            SendMessageW(list, LB_RESETCONTENT, None, None);
            for row in &table {
                let line = wide(&row.display_line());
                SendMessageW(list, LB_ADDSTRING, None, Some(LPARAM(line.as_ptr() as isize)));
            }
        }

        let monitors = session.snapshot().map_or(0, |s| s.monitors().len());
        info!(
            "Loaded {} monitors and {} windows (generation {})",
            monitors,
            table.len(),
            session.generation().0
        );
        match serde_json::to_string_pretty(&table) {
            Ok(json) => debug!("Window table:\n{}", json),
            Err(e) => debug!("Could not serialize window table: {}", e),
        }
    }

    fn sync_list_selection(&self) {
        let (Some(list), Mode::Wireframe(session)) = (self.list, &self.mode) else {
            return;
        };
        // WPARAM(-1) clears the list selection.
        let row = session.selected_row().unwrap_or(usize::MAX);
        unsafe {
            SendMessageW(list, LB_SETCURSEL, Some(WPARAM(row)), None);
        }
    }

    fn on_size(&mut self, width: i32, height: i32) -> LRESULT {
        match self.mode {
            Mode::Wireframe(_) => {
                let canvas = (width - self.list_width).max(0);
                if let Some(list) = self.list {
                    let moved =
                        unsafe { MoveWindow(list, canvas, 0, width - canvas, height, true) };
                    if let Err(e) = moved {
                        warn!("Could not move the window list: {}", e);
                    }
                }
                self.dispatch(HostEvent::Resize {
                    width: canvas,
                    height,
                });
            }
            Mode::Overlay(_) => self.invalidate(),
        }
        LRESULT(0)
    }

    fn on_paint(&self) -> LRESULT {
        let mut ps = PAINTSTRUCT::default();
        let hdc = unsafe { BeginPaint(self.hwnd, &mut ps) };

        match &self.mode {
            Mode::Wireframe(session) => {
                let canvas = session.canvas();
                let frame = session.render().unwrap_or_else(|_| Frame {
                    generation: session.generation(),
                    canvas,
                    primitives: vec![Primitive::Clear {
                        color: session.options().palette.background,
                    }],
                });
                paint_frame(hdc, &frame, None, canvas.width, canvas.height);
            }
            Mode::Overlay(view) => {
                let frame = overlay_frame(&view.layout, &view.windows, &view.options);
                let size = view.layout.window;
                paint_frame(hdc, &frame, view.image.as_ref(), size.width, size.height);
            }
        }

        unsafe {
            let _ = EndPaint(self.hwnd, &ps);
        }
        LRESULT(0)
    }

    fn on_mouse(&mut self, input: MouseInput, lparam: LPARAM) -> LRESULT {
        // Take focus back from the list so the keyboard drives the canvas.
        unsafe {
            let _ = SetFocus(Some(self.hwnd));
        }
        self.dispatch(mouse_event(input, point_from_lparam(lparam.0)));
        LRESULT(0)
    }

    fn on_key(&mut self, wparam: WPARAM) -> Option<LRESULT> {
        let key = Key::from_virtual_key(wparam.0 as u16)?;
        self.dispatch(key_event(key, self.pan_step));
        Some(LRESULT(0))
    }

    fn on_command(&mut self, wparam: WPARAM) -> Option<LRESULT> {
        let (id, code) = split_command(wparam.0);
        if id == IDC_WINDOW_LIST {
            if u32::from(code) != LBN_SELCHANGE {
                return None;
            }
            let list = self.list?;
            let row = unsafe { SendMessageW(list, LB_GETCURSEL, None, None) };
            if row.0 != LB_ERR as isize {
                self.dispatch(HostEvent::RowSelected(row.0 as usize));
            }
            return Some(LRESULT(0));
        }

        let event = menu_event(id)?;
        self.dispatch(event);
        Some(LRESULT(0))
    }
}

/// Run `f` against the app unless it is missing or already borrowed
/// further up the stack.
fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map(f),
        Err(_) => None,
    })
}

/// Window procedure for the host window.
///
/// Wrapped with catch_unwind so a panic does not unwind into user32.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        window_proc_inner(hwnd, msg, wparam, lparam)
    }));

    match result {
        Ok(lresult) => lresult,
        Err(e) => {
            error!("Panic in window_proc: {:?}", e);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
    }
}

fn window_proc_inner(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let handled = match msg {
        WM_SIZE => {
            let (width, height) = size_from_lparam(lparam.0);
            with_app(|app| app.on_size(width, height))
        }
        WM_PAINT => with_app(|app| app.on_paint()),
        // The canvas paints every pixel itself.
        WM_ERASEBKGND => Some(LRESULT(1)),
        WM_LBUTTONDOWN => with_app(|app| app.on_mouse(MouseInput::LeftDown, lparam)),
        WM_RBUTTONDOWN => with_app(|app| app.on_mouse(MouseInput::RightDown, lparam)),
        WM_MBUTTONDOWN => with_app(|app| app.on_mouse(MouseInput::MiddleDown, lparam)),
        WM_LBUTTONDBLCLK => with_app(|app| app.on_mouse(MouseInput::LeftDoubleClick, lparam)),
        WM_KEYDOWN => with_app(|app| app.on_key(wparam)).flatten(),
        WM_COMMAND => with_app(|app| app.on_command(wparam)).flatten(),
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            Some(LRESULT(0))
        }
        _ => None,
    };

    match handled {
        Some(lresult) => lresult,
        None => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

fn window_error(what: &str, err: windows::core::Error) -> Win32Error {
    Win32Error::WindowCreationFailed(format!("{}: {}", what, err))
}

unsafe fn build_menu(hwnd: HWND) -> Result<(), Win32Error> {
    let bar = CreateMenu().map_err(|e| window_error("CreateMenu", e))?;
    let zoom = CreatePopupMenu().map_err(|e| window_error("CreatePopupMenu", e))?;
    let view = CreatePopupMenu().map_err(|e| window_error("CreatePopupMenu", e))?;

    let items = [
        (zoom, MF_STRING, usize::from(IDM_ZOOM_RESET), w!("Reset Zoom\t0")),
        (zoom, MF_STRING, usize::from(IDM_ZOOM_IN), w!("Zoom In\t+")),
        (zoom, MF_STRING, usize::from(IDM_ZOOM_OUT), w!("Zoom Out\t-")),
        (view, MF_STRING, usize::from(IDM_REFRESH), w!("Refresh\tF5")),
        (view, MF_SEPARATOR, 0, PCWSTR::null()),
        (
            view,
            MF_STRING,
            usize::from(IDM_CLEAR_SELECTION),
            w!("Clear Selection\tEsc"),
        ),
        (bar, MF_POPUP, zoom.0 as usize, w!("Zoom")),
        (bar, MF_POPUP, view.0 as usize, w!("View")),
    ];
    for (menu, flags, id, label) in items {
        AppendMenuW(menu, flags, id, label).map_err(|e| window_error("AppendMenuW", e))?;
    }

    SetMenu(hwnd, Some(bar)).map_err(|e| window_error("SetMenu", e))
}

unsafe fn create_list(parent: HWND) -> Result<HWND, Win32Error> {
    let style = WS_CHILD
        | WS_VISIBLE
        | WS_VSCROLL
        | WINDOW_STYLE((LBS_NOTIFY | LBS_NOINTEGRALHEIGHT) as u32);
    CreateWindowExW(
        WS_EX_CLIENTEDGE,
        w!("LISTBOX"),
        None,
        style,
        0,
        0,
        0,
        0,
        Some(parent),
        Some(HMENU(usize::from(IDC_WINDOW_LIST) as *mut c_void)),
        None,
        None,
    )
    .map_err(|e| window_error("CreateWindowExW(LISTBOX)", e))
}

/// Outer size of a fixed window whose client area is `client`.
unsafe fn outer_size(client: Size, style: WINDOW_STYLE) -> (i32, i32) {
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: client.width,
        bottom: client.height,
    };
    if let Err(e) = AdjustWindowRect(&mut rect, style, false) {
        warn!("AdjustWindowRect failed: {}", e);
    }
    (rect.right - rect.left, rect.bottom - rect.top)
}

/// Create the host window and run the message loop until it closes.
pub fn run(config: &Config) -> Result<()> {
    let overlay = match config.behavior.mode {
        ViewerMode::Overlay => Some(OverlayView::capture(config)?),
        ViewerMode::Wireframe => None,
    };

    let class_name = w!("DesktopBlocksWindow");
    unsafe {
        let wc = WNDCLASSW {
            // The session undoes the zoom of the click that opens a double-click.
            style: CS_DBLCLKS | CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            lpszClassName: class_name,
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(window_error("RegisterClassW", windows::core::Error::from_win32()).into());
        }
    }

    let (title, style, width, height) = match &overlay {
        Some(view) => {
            let style = WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
            let (width, height) = unsafe { outer_size(view.layout.window, style) };
            (OVERLAY_TITLE, style, width, height)
        }
        None => (
            TITLE,
            WS_OVERLAPPEDWINDOW | WS_CLIPCHILDREN,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
        ),
    };

    let title_wide = wide(title);
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            class_name,
            PCWSTR(title_wide.as_ptr()),
            style,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            width,
            height,
            None,
            None,
            None,
            None,
        )
    }
    .map_err(|e| window_error("CreateWindowExW", e))?;

    let (mode, list) = match overlay {
        Some(view) => (Mode::Overlay(view), None),
        None => {
            unsafe { build_menu(hwnd)? };
            let list = unsafe { create_list(hwnd)? };
            let session = Session::new(Win32Desktop::new(), config.session_options());
            (Mode::Wireframe(Box::new(session)), Some(list))
        }
    };

    APP.with(|cell| {
        *cell.borrow_mut() = Some(App {
            hwnd,
            list,
            mode,
            pan_step: config.view.pan_step,
            list_width: config.view.list_width,
            title: title.to_string(),
        })
    });
    debug!("Host window created");

    // WM_SIZE during creation arrived before the app existed; replay it.
    let mut client = RECT::default();
    unsafe { GetClientRect(hwnd, &mut client) }.context("GetClientRect failed")?;
    with_app(|app| {
        app.on_size(client.right - client.left, client.bottom - client.top);
        app.dispatch(HostEvent::Load);
    });

    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    let mut msg = MSG::default();
    loop {
        let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        if result.0 == -1 {
            return Err(anyhow!(
                "GetMessageW failed: {}",
                windows::core::Error::from_win32()
            ));
        }
        if result.0 == 0 {
            break;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }

    APP.with(|cell| cell.borrow_mut().take());
    info!("Host window closed");
    Ok(())
}
