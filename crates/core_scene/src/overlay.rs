//! Screenshot overlay variant.
//!
//! Instead of a wireframe of the whole desktop, this variant shows a scaled
//! screenshot of one monitor with the outlines and titles of the windows on
//! that monitor drawn over it.

use crate::catalog::WindowCatalog;
use crate::scene::{Frame, LabelBackground, OutlineKind, Primitive, Rgb, Stroke};
use crate::{PointF, Rect, RectF, SceneError, Size, SourceError};
use serde::{Deserialize, Serialize};

/// Default cap on the overlay window height.
pub const DEFAULT_MAX_HEIGHT: i32 = 1080;

/// Font height at scale 1.0.
const BASE_FONT_SIZE: f64 = 10.0;

/// Distance the title sits above the outline, at scale 1.0.
const LABEL_RISE: f64 = 15.0;

const LABEL_PADDING: f64 = 2.0;

/// Channel order of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// GDI order.
    Bgra8,
    Rgba8,
}

/// Raw 32-bit pixels of a captured region, top-down rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, SourceError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(SourceError::Capture(format!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert to RGBA by swapping the red and blue channels if needed.
    pub fn into_rgba(mut self) -> Self {
        if self.format == PixelFormat::Bgra8 {
            for px in self.data.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            self.format = PixelFormat::Rgba8;
        }
        self
    }
}

/// Size and scale of the overlay window for one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayout {
    pub monitor: Rect,
    pub window: Size,
    pub scale: f64,
}

impl OverlayLayout {
    /// Fit a monitor into a window no taller than `max_height`, keeping the
    /// monitor's aspect ratio.
    pub fn for_monitor(monitor: Rect, max_height: i32) -> Result<Self, SceneError> {
        if monitor.is_degenerate() {
            return Err(SceneError::EmptyWorld {
                width: monitor.width(),
                height: monitor.height(),
            });
        }

        let height = monitor.height().min(max_height.max(1));
        let aspect = f64::from(monitor.width()) / f64::from(monitor.height());
        let width = (f64::from(height) * aspect) as i32;
        let scale = f64::from(height) / f64::from(monitor.height());

        Ok(Self {
            monitor,
            window: Size::new(width, height),
            scale,
        })
    }

    pub fn font_size(&self) -> f64 {
        (BASE_FONT_SIZE * self.scale).trunc()
    }

    /// Map a desktop rectangle into the overlay window, clipped to it.
    /// Returns `None` if nothing is left after clipping.
    pub fn to_view(&self, rect: Rect) -> Option<RectF> {
        let left = f64::from(rect.left - self.monitor.left) * self.scale;
        let top = f64::from(rect.top - self.monitor.top) * self.scale;
        let right = f64::from(rect.right - self.monitor.left) * self.scale;
        let bottom = f64::from(rect.bottom - self.monitor.top) * self.scale;

        let clipped = RectF::new(
            left.max(0.0),
            top.max(0.0),
            right.min(f64::from(self.window.width)),
            bottom.min(f64::from(self.window.height)),
        );
        if clipped.width() > 0.0 && clipped.height() > 0.0 {
            Some(clipped)
        } else {
            None
        }
    }

    pub fn debug_line(&self) -> String {
        format!(
            "Monitor: {}x{}, Window: {}x{}, Scale: {:.2}",
            self.monitor.width(),
            self.monitor.height(),
            self.window.width,
            self.window.height,
            self.scale
        )
    }
}

/// Styles for the overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub outline: Stroke,
    pub label: Rgb,
    pub label_background: Rgb,
    pub show_debug_info: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            outline: Stroke::new(Rgb::BLUE, 2.0),
            label: Rgb::BLACK,
            label_background: Rgb::WHITE,
            show_debug_info: true,
        }
    }
}

/// Build the overlay frame: screenshot, then outlines of the visible
/// windows that touch the monitor, back to front.
pub fn overlay_frame(
    layout: &OverlayLayout,
    windows: &WindowCatalog,
    options: &OverlayOptions,
) -> Frame {
    let canvas = layout.window;
    let mut primitives = vec![
        Primitive::Clear { color: Rgb::BLACK },
        Primitive::Image {
            dest: RectF::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height)),
        },
    ];

    let font_size = layout.font_size();
    for window in windows.visible().rev() {
        if !window.bounds().intersects(&layout.monitor) {
            continue;
        }
        let Some(rect) = layout.to_view(window.bounds()) else {
            continue;
        };

        primitives.push(Primitive::Outline {
            rect,
            stroke: options.outline,
            kind: OutlineKind::Window {
                id: window.id(),
                z_index: window.z_index(),
                selected: false,
            },
        });
        primitives.push(Primitive::Label {
            text: window.title().to_string(),
            origin: PointF::new(rect.left, rect.top - LABEL_RISE * layout.scale),
            color: options.label,
            size: Some(font_size),
            background: Some(LabelBackground {
                color: options.label_background,
                padding: LABEL_PADDING,
            }),
        });
    }

    if options.show_debug_info {
        primitives.push(Primitive::Label {
            text: layout.debug_line(),
            origin: PointF::new(10.0, 30.0),
            color: Rgb::LIME,
            size: Some(BASE_FONT_SIZE),
            background: None,
        });
    }

    Frame {
        generation: windows.generation(),
        canvas,
        primitives,
    }
}
