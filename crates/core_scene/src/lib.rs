//! DesktopBlocks Core
//!
//! Platform-agnostic geometry pipeline for the DesktopBlocks desktop viewer.
//!
//! The platform layer hands this crate two read-only snapshots (monitors and
//! top-level windows). From those it produces a scaled, zoomable wireframe:
//! - [`catalog`]: generation-tagged monitor and window catalogs
//! - [`transform`]: world-to-view mapping with pivot-anchored zoom
//! - [`scene`]: the ordered primitive list for one frame
//! - [`selection`]: identity-based highlight state
//! - [`session`]: the event queue that ties the pieces together
//! - [`overlay`]: layout for the screenshot overlay variant

pub mod catalog;
pub mod overlay;
pub mod scene;
pub mod selection;
pub mod session;
pub mod transform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::{
    DesktopSource, Generation, Monitor, MonitorCatalog, RawWindow, ScreenCapture, Snapshot,
    TableRow, Window, WindowCatalog, WorldBounds,
};
pub use overlay::{OverlayLayout, OverlayOptions, PixelBuffer, PixelFormat};
pub use scene::{Frame, Palette, Primitive, Rgb, Stroke, LABEL_MAX_CHARS};
pub use selection::{Selection, WindowRef};
pub use session::{EventQueue, HostEvent, MouseButton, Outcome, Session, SessionOptions};
pub use transform::{ViewTransform, ZoomDirection};

/// Opaque window handle (HWND cast to u64 on Windows).
pub type WindowId = u64;

/// Opaque monitor handle (HMONITOR cast to u64 on Windows).
pub type MonitorId = u64;

/// Errors raised while building or interacting with a scene.
///
/// The configuration variants mean "skip rendering this cycle"; the host
/// decides how to present them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("No monitors were enumerated")]
    NoMonitors,

    #[error("World extents are empty ({width}x{height})")]
    EmptyWorld { width: i32, height: i32 },

    #[error("Canvas is empty ({width}x{height})")]
    EmptyCanvas { width: i32, height: i32 },

    #[error("No catalog snapshot has been loaded")]
    NotLoaded,

    #[error("Row {0} is out of bounds (rows: {1})")]
    RowOutOfBounds(usize, usize),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl SceneError {
    /// Whether this error comes from missing or degenerate geometry rather
    /// than from a failed collaborator or a bad request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SceneError::NoMonitors | SceneError::EmptyWorld { .. } | SceneError::EmptyCanvas { .. }
        )
    }
}

/// Errors reported by the platform collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Failed to enumerate desktop: {0}")]
    Enumeration(String),

    #[error("Failed to capture screen: {0}")]
    Capture(String),
}

/// A rectangle in desktop-pixel coordinates.
///
/// Stored as edges; `right >= left` and `bottom >= top` always hold for
/// values built through the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle from its edges. Inverted edges collapse to zero size.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right: right.max(left),
            bottom: bottom.max(top),
        }
    }

    /// Create a rectangle from an origin and a size.
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width.max(0)), y.saturating_add(height.max(0)))
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Zero-width or zero-height rectangles are valid but never drawn.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not.
    pub fn contains(&self, point: PointF) -> bool {
        point.x >= f64::from(self.left)
            && point.x < f64::from(self.right)
            && point.y >= f64::from(self.top)
            && point.y < f64::from(self.bottom)
    }

    pub fn top_left(&self) -> PointF {
        PointF::new(f64::from(self.left), f64::from(self.top))
    }

    pub fn bottom_right(&self) -> PointF {
        PointF::new(f64::from(self.right), f64::from(self.bottom))
    }
}

/// A point in floating-point coordinates (world or view space).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const ORIGIN: PointF = PointF { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance, used for tolerance checks.
    pub fn distance(&self, other: PointF) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A rectangle in view space, ready for rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectF {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl RectF {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_corners(top_left: PointF, bottom_right: PointF) -> Self {
        Self::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn top_left(&self) -> PointF {
        PointF::new(self.left, self.top)
    }
}

/// Canvas size in view pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> PointF {
        PointF::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}
