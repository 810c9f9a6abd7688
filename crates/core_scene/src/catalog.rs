//! Monitor and window catalogs.
//!
//! A catalog is an immutable snapshot produced by one refresh. Both catalogs
//! of a refresh carry the same [`Generation`] so identities taken from
//! different refreshes are never compared by accident.

use crate::overlay::PixelBuffer;
use crate::{MonitorId, PointF, Rect, SceneError, SourceError, WindowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical DPI that corresponds to a scale factor of 1.0.
pub const BASE_DPI: u32 = 96;

/// Label reported for a window whose owner is unknown.
pub const NO_PARENT: &str = "None";

/// Tag identifying one atomic refresh of both catalogs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// Supplies raw desktop snapshots. Implemented by the platform layer.
///
/// Both calls are bounded and synchronous; they are made back to back for
/// every refresh.
pub trait DesktopSource {
    /// Current monitors. Order is irrelevant.
    fn refresh_monitors(&mut self) -> Result<Vec<Monitor>, SourceError>;

    /// Current top-level windows in front-to-back order.
    fn refresh_windows(&mut self) -> Result<Vec<RawWindow>, SourceError>;
}

/// Copies raw pixels of a desktop region. Implemented by the platform layer.
pub trait ScreenCapture {
    fn capture(&mut self, bounds: Rect) -> Result<PixelBuffer, SourceError>;
}

/// A physical display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub device_name: String,
    pub bounds: Rect,
    pub work_area: Rect,
    pub is_primary: bool,
    /// DPI / 96; 1.0 when the DPI could not be queried.
    pub scale_factor: f64,
}

impl Monitor {
    pub fn new(id: MonitorId, bounds: Rect) -> Self {
        Self {
            id,
            device_name: String::new(),
            bounds,
            work_area: bounds,
            is_primary: false,
            scale_factor: 1.0,
        }
    }

    /// Convert a queried DPI into a scale factor, falling back to 1.0.
    pub fn scale_factor_from_dpi(dpi: Option<u32>) -> f64 {
        match dpi {
            Some(dpi) if dpi > 0 => f64::from(dpi) / f64::from(BASE_DPI),
            _ => 1.0,
        }
    }

    pub fn scale_percent(&self) -> u32 {
        (self.scale_factor * 100.0).round().max(0.0) as u32
    }

    /// Short caption such as `DISPLAY1 1920x1080 (150%) *`.
    pub fn caption(&self) -> String {
        let name = if self.device_name.is_empty() {
            format!("Monitor {}", self.id)
        } else {
            self.device_name.clone()
        };
        let primary = if self.is_primary { " *" } else { "" };
        format!(
            "{} {}x{} ({}%){}",
            name,
            self.bounds.width(),
            self.bounds.height(),
            self.scale_percent(),
            primary
        )
    }
}

/// A window as reported by the platform layer, before indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWindow {
    pub id: WindowId,
    pub parent_id: Option<WindowId>,
    pub bounds: Rect,
    pub title: String,
    pub class_name: String,
    /// The OS visibility flag alone; see [`Window::is_visible`].
    pub os_visible: bool,
}

/// A window inside a catalog snapshot.
///
/// Built once per refresh from a [`RawWindow`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    id: WindowId,
    parent_id: Option<WindowId>,
    bounds: Rect,
    title: String,
    class_name: String,
    is_visible: bool,
    z_index: usize,
}

impl Window {
    fn from_raw(raw: RawWindow, z_index: usize) -> Self {
        let is_visible =
            raw.os_visible && !raw.bounds.is_degenerate() && !raw.title.trim().is_empty();
        Self {
            id: raw.id,
            parent_id: raw.parent_id,
            bounds: raw.bounds,
            title: raw.title,
            class_name: raw.class_name,
            is_visible,
            z_index,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn parent_id(&self) -> Option<WindowId> {
        self.parent_id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// OS-visible, non-degenerate and titled.
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Position in the front-to-back enumeration (0 = frontmost).
    pub fn z_index(&self) -> usize {
        self.z_index
    }
}

/// Extent of world space: all monitors, with the origin at the top-left of
/// the leftmost/topmost monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
}

impl WorldBounds {
    /// Desktop point to world point.
    pub fn to_world(&self, desktop: PointF) -> PointF {
        PointF::new(
            desktop.x - f64::from(self.origin_x),
            desktop.y - f64::from(self.origin_y),
        )
    }

    /// World point to desktop point.
    pub fn to_desktop(&self, world: PointF) -> PointF {
        PointF::new(
            world.x + f64::from(self.origin_x),
            world.y + f64::from(self.origin_y),
        )
    }
}

/// Monitors of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorCatalog {
    generation: Generation,
    monitors: Vec<Monitor>,
}

impl MonitorCatalog {
    pub fn new(generation: Generation, monitors: Vec<Monitor>) -> Self {
        Self {
            generation,
            monitors,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// The primary monitor, or the first one if none is flagged.
    pub fn primary(&self) -> Option<&Monitor> {
        self.monitors
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| self.monitors.first())
    }

    /// Compute world extents over all monitors.
    pub fn world_bounds(&self) -> Result<WorldBounds, SceneError> {
        if self.monitors.is_empty() {
            return Err(SceneError::NoMonitors);
        }

        let origin_x = self.monitors.iter().map(|m| m.bounds.left).min().unwrap_or(0);
        let origin_y = self.monitors.iter().map(|m| m.bounds.top).min().unwrap_or(0);
        let max_right = self.monitors.iter().map(|m| m.bounds.right).max().unwrap_or(0);
        let max_bottom = self.monitors.iter().map(|m| m.bounds.bottom).max().unwrap_or(0);

        let width = max_right - origin_x;
        let height = max_bottom - origin_y;
        if width <= 0 || height <= 0 {
            return Err(SceneError::EmptyWorld { width, height });
        }

        Ok(WorldBounds {
            origin_x,
            origin_y,
            width,
            height,
        })
    }
}

/// Windows of one generation, in front-to-back order.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCatalog {
    generation: Generation,
    windows: Vec<Window>,
    by_id: HashMap<WindowId, usize>,
}

impl WindowCatalog {
    /// Index raw windows: `z_index` is the position in `raw`.
    pub fn from_raw(generation: Generation, raw: Vec<RawWindow>) -> Self {
        let windows: Vec<Window> = raw
            .into_iter()
            .enumerate()
            .map(|(z_index, w)| Window::from_raw(w, z_index))
            .collect();

        let mut by_id = HashMap::with_capacity(windows.len());
        for (idx, window) in windows.iter().enumerate() {
            // Keep the frontmost entry if the OS reported a handle twice.
            by_id.entry(window.id).or_insert(idx);
        }

        Self {
            generation,
            windows,
            by_id,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Window at a table row (rows are in `z_index` order).
    pub fn at(&self, row: usize) -> Option<&Window> {
        self.windows.get(row)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.by_id.get(&id).map(|&idx| &self.windows[idx])
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Resolve the owner of a window inside this snapshot.
    pub fn parent_of(&self, window: &Window) -> Option<&Window> {
        window
            .parent_id
            .filter(|&pid| pid != window.id)
            .and_then(|pid| self.get(pid))
    }

    /// Owner title, or `"None"` when the owner is absent from this snapshot.
    pub fn parent_title(&self, window: &Window) -> &str {
        self.parent_of(window)
            .map(|p| p.title())
            .unwrap_or(NO_PARENT)
    }

    pub fn visible(&self) -> impl DoubleEndedIterator<Item = &Window> {
        self.windows.iter().filter(|w| w.is_visible)
    }

    /// Frontmost visible window containing a desktop point.
    pub fn topmost_at(&self, desktop: PointF) -> Option<&Window> {
        self.visible().find(|w| w.bounds.contains(desktop))
    }

    /// The tabular dataset for the external list view, in `z_index` order.
    pub fn table(&self) -> Vec<TableRow> {
        self.windows
            .iter()
            .map(|w| TableRow {
                title: w.title.clone(),
                x: w.bounds.left,
                y: w.bounds.top,
                z_index: w.z_index,
                parent_title: self.parent_title(w).to_string(),
                visible: w.is_visible,
            })
            .collect()
    }
}

/// One row of the window table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub z_index: usize,
    pub parent_title: String,
    pub visible: bool,
}

impl TableRow {
    /// Single-line rendering for list widgets.
    pub fn display_line(&self) -> String {
        let title = if self.title.trim().is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        };
        format!(
            "{:>3}  {}  ({}, {})  parent: {}",
            self.z_index, title, self.x, self.y, self.parent_title
        )
    }
}

/// Both catalogs of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    generation: Generation,
    monitors: MonitorCatalog,
    windows: WindowCatalog,
}

impl Snapshot {
    pub fn new(generation: Generation, monitors: Vec<Monitor>, windows: Vec<RawWindow>) -> Self {
        Self {
            generation,
            monitors: MonitorCatalog::new(generation, monitors),
            windows: WindowCatalog::from_raw(generation, windows),
        }
    }

    /// Pull a fresh snapshot from the collaborator.
    pub fn capture(
        generation: Generation,
        source: &mut dyn DesktopSource,
    ) -> Result<Self, SourceError> {
        let monitors = source.refresh_monitors()?;
        let windows = source.refresh_windows()?;
        Ok(Self::new(generation, monitors, windows))
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn monitors(&self) -> &MonitorCatalog {
        &self.monitors
    }

    pub fn windows(&self) -> &WindowCatalog {
        &self.windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: WindowId, bounds: Rect, title: &str) -> RawWindow {
        RawWindow {
            id,
            parent_id: None,
            bounds,
            title: title.to_string(),
            class_name: "TestClass".to_string(),
            os_visible: true,
        }
    }

    fn monitor(id: MonitorId, bounds: Rect) -> Monitor {
        Monitor::new(id, bounds)
    }

    #[test]
    fn test_z_index_is_enumeration_position() {
        let raws: Vec<RawWindow> = (0..6)
            .map(|i| raw(100 + i, Rect::from_xywh(0, 0, 10, 10), "w"))
            .collect();
        let catalog = WindowCatalog::from_raw(Generation(1), raws);

        for (i, w) in catalog.windows().iter().enumerate() {
            assert_eq!(w.z_index(), i);
            assert_eq!(w.id(), 100 + i as u64);
        }
    }

    #[test]
    fn test_visibility_derivation() {
        let mut hidden = raw(1, Rect::from_xywh(0, 0, 10, 10), "Hidden");
        hidden.os_visible = false;
        let raws = vec![
            hidden,
            raw(2, Rect::from_xywh(0, 0, 0, 10), "Zero width"),
            raw(3, Rect::from_xywh(0, 0, 10, 0), "Zero height"),
            raw(4, Rect::from_xywh(0, 0, 10, 10), "   "),
            raw(5, Rect::from_xywh(0, 0, 10, 10), "Shown"),
        ];
        let catalog = WindowCatalog::from_raw(Generation(1), raws);

        let visible: Vec<WindowId> = catalog.visible().map(|w| w.id()).collect();
        assert_eq!(visible, vec![5]);
    }

    #[test]
    fn test_parent_lookup() {
        let mut child = raw(2, Rect::from_xywh(0, 0, 10, 10), "Dialog");
        child.parent_id = Some(1);
        let mut orphan = raw(3, Rect::from_xywh(0, 0, 10, 10), "Orphan");
        orphan.parent_id = Some(999);
        let mut own = raw(4, Rect::from_xywh(0, 0, 10, 10), "Self");
        own.parent_id = Some(4);

        let catalog = WindowCatalog::from_raw(
            Generation(1),
            vec![raw(1, Rect::from_xywh(0, 0, 10, 10), "Main"), child, orphan, own],
        );

        let w = catalog.windows();
        assert_eq!(catalog.parent_title(&w[0]), "None");
        assert_eq!(catalog.parent_title(&w[1]), "Main");
        assert_eq!(catalog.parent_title(&w[2]), "None");
        assert_eq!(catalog.parent_title(&w[3]), "None");
    }

    #[test]
    fn test_world_bounds_from_origin() {
        let catalog = MonitorCatalog::new(
            Generation(1),
            vec![
                monitor(1, Rect::new(0, 0, 1920, 1080)),
                monitor(2, Rect::new(1920, 0, 3840, 1080)),
            ],
        );
        let world = catalog.world_bounds().unwrap();
        assert_eq!((world.origin_x, world.origin_y), (0, 0));
        assert_eq!((world.width, world.height), (3840, 1080));
    }

    #[test]
    fn test_world_bounds_with_negative_monitor() {
        let catalog = MonitorCatalog::new(
            Generation(1),
            vec![
                monitor(1, Rect::new(0, 0, 1920, 1080)),
                monitor(2, Rect::new(-1280, -200, 0, 824)),
            ],
        );
        let world = catalog.world_bounds().unwrap();
        assert_eq!((world.origin_x, world.origin_y), (-1280, -200));
        assert_eq!((world.width, world.height), (3200, 1280));
        assert_eq!(
            world.to_world(PointF::new(-1280.0, -200.0)),
            PointF::new(0.0, 0.0)
        );
        assert_eq!(
            world.to_desktop(PointF::new(1280.0, 200.0)),
            PointF::new(0.0, 0.0)
        );
    }

    #[test]
    fn test_world_bounds_errors() {
        let empty = MonitorCatalog::new(Generation(1), vec![]);
        assert_eq!(empty.world_bounds(), Err(SceneError::NoMonitors));

        let flat = MonitorCatalog::new(Generation(1), vec![monitor(1, Rect::new(0, 0, 1920, 0))]);
        assert_eq!(
            flat.world_bounds(),
            Err(SceneError::EmptyWorld {
                width: 1920,
                height: 0
            })
        );
    }

    #[test]
    fn test_primary_falls_back_to_first() {
        let mut second = monitor(2, Rect::new(1920, 0, 3840, 1080));
        let catalog = MonitorCatalog::new(
            Generation(1),
            vec![monitor(1, Rect::new(0, 0, 1920, 1080)), second.clone()],
        );
        assert_eq!(catalog.primary().map(|m| m.id), Some(1));

        second.is_primary = true;
        let catalog = MonitorCatalog::new(
            Generation(1),
            vec![monitor(1, Rect::new(0, 0, 1920, 1080)), second],
        );
        assert_eq!(catalog.primary().map(|m| m.id), Some(2));
    }

    #[test]
    fn test_scale_factor_from_dpi() {
        assert_eq!(Monitor::scale_factor_from_dpi(Some(96)), 1.0);
        assert_eq!(Monitor::scale_factor_from_dpi(Some(144)), 1.5);
        assert_eq!(Monitor::scale_factor_from_dpi(Some(0)), 1.0);
        assert_eq!(Monitor::scale_factor_from_dpi(None), 1.0);
    }

    #[test]
    fn test_monitor_caption() {
        let mut m = monitor(7, Rect::new(0, 0, 2560, 1440));
        m.device_name = r"\\.\DISPLAY1".to_string();
        m.scale_factor = 1.25;
        m.is_primary = true;
        assert_eq!(m.caption(), r"\\.\DISPLAY1 2560x1440 (125%) *");

        let unnamed = monitor(3, Rect::new(0, 0, 800, 600));
        assert_eq!(unnamed.caption(), "Monitor 3 800x600 (100%)");
    }

    #[test]
    fn test_topmost_prefers_front() {
        let catalog = WindowCatalog::from_raw(
            Generation(1),
            vec![
                raw(1, Rect::new(50, 50, 150, 150), "Front"),
                raw(2, Rect::new(0, 0, 200, 200), "Back"),
            ],
        );
        assert_eq!(catalog.topmost_at(PointF::new(100.0, 100.0)).map(|w| w.id()), Some(1));
        assert_eq!(catalog.topmost_at(PointF::new(10.0, 10.0)).map(|w| w.id()), Some(2));
        assert!(catalog.topmost_at(PointF::new(500.0, 500.0)).is_none());
    }

    #[test]
    fn test_table_rows() {
        let mut dialog = raw(2, Rect::new(30, 40, 130, 140), "Save As");
        dialog.parent_id = Some(1);
        let catalog = WindowCatalog::from_raw(
            Generation(1),
            vec![raw(1, Rect::new(10, 20, 500, 400), "Editor"), dialog],
        );

        let rows = catalog.table();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].z_index, 0);
        assert_eq!(rows[0].parent_title, "None");
        assert_eq!(rows[1].title, "Save As");
        assert_eq!((rows[1].x, rows[1].y), (30, 40));
        assert_eq!(rows[1].parent_title, "Editor");

        let json = serde_json::to_string(&rows[1]).unwrap();
        assert!(json.contains("\"parent_title\":\"Editor\""));
        assert!(json.contains("\"z_index\":1"));
    }

    #[test]
    fn test_table_row_display_line() {
        let row = TableRow {
            title: String::new(),
            x: -8,
            y: 0,
            z_index: 4,
            parent_title: "None".to_string(),
            visible: false,
        };
        assert_eq!(row.display_line(), "  4  (untitled)  (-8, 0)  parent: None");
    }

    #[test]
    fn test_duplicate_handles_resolve_to_front() {
        let catalog = WindowCatalog::from_raw(
            Generation(1),
            vec![
                raw(9, Rect::new(0, 0, 10, 10), "First"),
                raw(9, Rect::new(0, 0, 10, 10), "Second"),
            ],
        );
        assert_eq!(catalog.get(9).map(|w| w.title()), Some("First"));
    }
}
