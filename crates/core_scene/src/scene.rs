//! Scene builder.
//!
//! Turns one catalog snapshot, the view transform and the selection into an
//! ordered list of view-space primitives. The list is a pure function of its
//! inputs: same inputs, same primitives, same order.

use crate::catalog::{Generation, Snapshot};
use crate::selection::Selection;
use crate::transform::ViewTransform;
use crate::{MonitorId, PointF, RectF, Size, WindowId};
use serde::{Deserialize, Serialize};

/// Window labels are cut to this many characters (not bytes, not pixels).
pub const LABEL_MAX_CHARS: usize = 30;

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);
    pub const BLUE: Rgb = Rgb::new(0x00, 0x00, 0xFF);
    pub const LIME: Rgb = Rgb::new(0x00, 0xFF, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Windows COLORREF layout (0x00BBGGRR).
    pub fn to_colorref(&self) -> u32 {
        u32::from(self.r) | (u32::from(self.g) << 8) | (u32::from(self.b) << 16)
    }
}

/// Outline color and thickness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f32,
}

impl Stroke {
    pub const fn new(color: Rgb, width: f32) -> Self {
        Self { color, width }
    }
}

/// Styles used by the scene builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub background: Rgb,
    pub monitor: Stroke,
    pub window: Stroke,
    pub selected: Stroke,
    pub label: Rgb,
    pub show_monitor_labels: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::WHITE,
            monitor: Stroke::new(Rgb::RED, 1.0),
            window: Stroke::new(Rgb::BLUE, 1.0),
            selected: Stroke::new(Rgb::RED, 3.0),
            label: Rgb::BLACK,
            show_monitor_labels: true,
        }
    }
}

/// What an outline stands for, so hosts can map primitives back to entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineKind {
    Monitor(MonitorId),
    Window {
        id: WindowId,
        z_index: usize,
        selected: bool,
    },
}

/// A drawable item in view space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Fill the whole canvas.
    Clear { color: Rgb },
    /// Draw the host-supplied background image into `dest`.
    Image { dest: RectF },
    Outline {
        rect: RectF,
        stroke: Stroke,
        kind: OutlineKind,
    },
    /// Text with its top-left at `origin`. `size` is a font height in view
    /// pixels; `None` means the host's default font.
    Label {
        text: String,
        origin: PointF,
        color: Rgb,
        size: Option<f64>,
        background: Option<LabelBackground>,
    },
}

/// Filled box drawn behind a label, grown by `padding` on every side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelBackground {
    pub color: Rgb,
    pub padding: f64,
}

/// One composed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub generation: Generation,
    pub canvas: Size,
    pub primitives: Vec<Primitive>,
}

impl Frame {
    /// Outlines of windows, front-most last.
    pub fn window_outlines(&self) -> impl Iterator<Item = (&RectF, &OutlineKind)> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Outline { rect, kind, .. } if matches!(kind, OutlineKind::Window { .. }) => {
                Some((rect, kind))
            }
            _ => None,
        })
    }
}

/// Cut a title to [`LABEL_MAX_CHARS`] characters, without a marker.
pub fn truncate_label(title: &str) -> String {
    title.chars().take(LABEL_MAX_CHARS).collect()
}

/// Build the primitives for one frame.
///
/// Expects `transform` to have been fitted to `snapshot`'s world.
pub fn build_frame(
    snapshot: &Snapshot,
    transform: &ViewTransform,
    selection: &Selection,
    canvas: Size,
    palette: &Palette,
) -> Frame {
    let monitors = snapshot.monitors();
    let windows = snapshot.windows();
    let mut primitives = Vec::with_capacity(1 + monitors.len() * 2 + windows.len() * 2);

    primitives.push(Primitive::Clear {
        color: palette.background,
    });

    for monitor in monitors.monitors() {
        if monitor.bounds.is_degenerate() {
            continue;
        }
        let rect = transform.rect_to_view(monitor.bounds);
        primitives.push(Primitive::Outline {
            rect,
            stroke: palette.monitor,
            kind: OutlineKind::Monitor(monitor.id),
        });
        if palette.show_monitor_labels {
            primitives.push(Primitive::Label {
                text: monitor.caption(),
                origin: rect.top_left(),
                color: palette.monitor.color,
                size: None,
                background: None,
            });
        }
    }

    let selected = selection.resolve(windows);

    // Back to front, so the frontmost window is painted last.
    for window in windows.visible().rev() {
        let is_selected = selected == Some(window.id());
        let rect = transform.rect_to_view(window.bounds());
        primitives.push(Primitive::Outline {
            rect,
            stroke: if is_selected {
                palette.selected
            } else {
                palette.window
            },
            kind: OutlineKind::Window {
                id: window.id(),
                z_index: window.z_index(),
                selected: is_selected,
            },
        });
        primitives.push(Primitive::Label {
            text: truncate_label(window.title()),
            origin: rect.top_left(),
            color: palette.label,
            size: None,
            background: None,
        });
    }

    Frame {
        generation: snapshot.generation(),
        canvas,
        primitives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Monitor, RawWindow};
    use crate::transform::ZoomDirection;
    use crate::Rect;

    fn raw(id: WindowId, bounds: Rect, title: &str, class_name: &str) -> RawWindow {
        RawWindow {
            id,
            parent_id: None,
            bounds,
            title: title.to_string(),
            class_name: class_name.to_string(),
            os_visible: true,
        }
    }

    fn snapshot(windows: Vec<RawWindow>) -> Snapshot {
        Snapshot::new(
            Generation(1),
            vec![
                Monitor::new(1, Rect::new(0, 0, 1920, 1080)),
                Monitor::new(2, Rect::new(1920, 0, 3840, 1080)),
            ],
            windows,
        )
    }

    fn fitted(snapshot: &Snapshot, canvas: Size) -> ViewTransform {
        let mut t = ViewTransform::new();
        t.fit(canvas, snapshot.monitors().world_bounds().unwrap())
            .unwrap();
        t
    }

    fn palette() -> Palette {
        Palette {
            show_monitor_labels: false,
            ..Palette::default()
        }
    }

    #[test]
    fn test_truncate_label() {
        let title = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHI";
        assert_eq!(title.chars().count(), 45);
        assert_eq!(truncate_label(title), "abcdefghijklmnopqrstuvwxyz0123");
        assert_eq!(truncate_label("short"), "short");
    }

    #[test]
    fn test_truncate_label_counts_characters() {
        let title = "Ü".repeat(40);
        let label = truncate_label(&title);
        assert_eq!(label.chars().count(), 30);
        assert_eq!(label.len(), 60);
    }

    #[test]
    fn test_frame_geometry() {
        let snap = snapshot(vec![raw(10, Rect::new(100, 100, 300, 200), "Editor", "Edit")]);
        let canvas = Size::new(960, 270);
        let t = fitted(&snap, canvas);
        let frame = build_frame(&snap, &t, &Selection::new(), canvas, &palette());

        assert_eq!(
            frame.primitives[0],
            Primitive::Clear {
                color: Rgb::WHITE
            }
        );
        let outlines: Vec<_> = frame.window_outlines().collect();
        assert_eq!(outlines.len(), 1);
        assert_eq!(*outlines[0].0, RectF::new(25.0, 25.0, 75.0, 50.0));
    }

    #[test]
    fn test_primitive_order() {
        let mut hidden = raw(2, Rect::new(0, 0, 100, 100), "Hidden", "A");
        hidden.os_visible = false;
        let snap = snapshot(vec![
            raw(1, Rect::new(0, 0, 100, 100), "Front", "A"),
            hidden,
            raw(3, Rect::new(0, 0, 100, 100), "Back", "A"),
        ]);
        let canvas = Size::new(960, 270);
        let t = fitted(&snap, canvas);
        let mut pal = palette();
        pal.show_monitor_labels = true;
        let frame = build_frame(&snap, &t, &Selection::new(), canvas, &pal);

        let kinds: Vec<String> = frame
            .primitives
            .iter()
            .map(|p| match p {
                Primitive::Clear { .. } => "clear".to_string(),
                Primitive::Outline {
                    kind: OutlineKind::Monitor(id),
                    ..
                } => format!("monitor{}", id),
                Primitive::Outline {
                    kind: OutlineKind::Window { id, .. },
                    ..
                } => format!("window{}", id),
                Primitive::Label { text, .. } => format!("label:{}", text),
                other => format!("{:?}", other),
            })
            .collect();

        assert_eq!(
            kinds,
            vec![
                "clear",
                "monitor1",
                "label:Monitor 1 1920x1080 (100%)",
                "monitor2",
                "label:Monitor 2 1920x1080 (100%)",
                "window3",
                "label:Back",
                "window1",
                "label:Front",
            ]
        );
    }

    #[test]
    fn test_invisible_windows_are_skipped() {
        let mut hidden = raw(2, Rect::new(0, 0, 100, 100), "Hidden", "A");
        hidden.os_visible = false;
        let snap = snapshot(vec![
            raw(1, Rect::new(0, 0, 0, 100), "Zero", "A"),
            hidden,
            raw(3, Rect::new(0, 0, 100, 100), "", "A"),
        ]);
        let canvas = Size::new(960, 270);
        let t = fitted(&snap, canvas);
        let frame = build_frame(&snap, &t, &Selection::new(), canvas, &palette());
        assert_eq!(frame.window_outlines().count(), 0);
    }

    #[test]
    fn test_degenerate_monitor_is_skipped() {
        let snap = Snapshot::new(
            Generation(1),
            vec![
                Monitor::new(1, Rect::new(0, 0, 1920, 1080)),
                Monitor::new(2, Rect::new(1920, 0, 1920, 1080)),
            ],
            vec![],
        );
        let canvas = Size::new(960, 270);
        let t = fitted(&snap, canvas);
        let frame = build_frame(&snap, &t, &Selection::new(), canvas, &palette());
        let monitors = frame
            .primitives
            .iter()
            .filter(|p| {
                matches!(
                    p,
                    Primitive::Outline {
                        kind: OutlineKind::Monitor(_),
                        ..
                    }
                )
            })
            .count();
        assert_eq!(monitors, 1);
    }

    #[test]
    fn test_selection_highlight_is_by_identity() {
        // Same class name on both; only the selected handle is highlighted.
        let snap = snapshot(vec![
            raw(1, Rect::new(0, 0, 100, 100), "One", "Chrome_WidgetWin_1"),
            raw(2, Rect::new(200, 0, 300, 100), "Two", "Chrome_WidgetWin_1"),
        ]);
        let canvas = Size::new(960, 270);
        let t = fitted(&snap, canvas);
        let mut selection = Selection::new();
        selection.select_by_row(snap.windows(), 1).unwrap();

        let frame = build_frame(&snap, &t, &selection, canvas, &palette());
        for p in &frame.primitives {
            if let Primitive::Outline {
                stroke,
                kind: OutlineKind::Window { id, selected, .. },
                ..
            } = p
            {
                if *id == 2 {
                    assert!(*selected);
                    assert_eq!(*stroke, palette().selected);
                } else {
                    assert!(!*selected);
                    assert_eq!(*stroke, palette().window);
                }
            }
        }
    }

    #[test]
    fn test_stale_selection_is_not_drawn() {
        let snap = snapshot(vec![raw(1, Rect::new(0, 0, 100, 100), "One", "A")]);
        let mut selection = Selection::new();
        selection.select_by_row(snap.windows(), 0).unwrap();

        // Same handle, newer generation, selection never revalidated.
        let newer = Snapshot::new(
            Generation(2),
            snap.monitors().monitors().to_vec(),
            vec![raw(1, Rect::new(0, 0, 100, 100), "One", "A")],
        );
        let canvas = Size::new(960, 270);
        let t = fitted(&newer, canvas);
        let frame = build_frame(&newer, &t, &selection, canvas, &palette());
        assert!(frame
            .window_outlines()
            .all(|(_, kind)| !matches!(kind, OutlineKind::Window { selected: true, .. })));
    }

    #[test]
    fn test_build_is_deterministic() {
        let snap = snapshot(
            (0..20)
                .map(|i| {
                    raw(
                        i,
                        Rect::from_xywh(i as i32 * 50, 10, 300, 200),
                        &format!("Window number {} with a fairly long title", i),
                        "A",
                    )
                })
                .collect(),
        );
        let canvas = Size::new(1280, 720);
        let mut t = fitted(&snap, canvas);
        t.apply_zoom(ZoomDirection::In, PointF::new(400.0, 300.0));
        let mut selection = Selection::new();
        selection.select_by_row(snap.windows(), 7).unwrap();

        let a = build_frame(&snap, &t, &selection, canvas, &Palette::default());
        let b = build_frame(&snap, &t, &selection, canvas, &Palette::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::from_hex("#FF8040"), Some(Rgb::new(0xFF, 0x80, 0x40)));
        assert_eq!(Rgb::from_hex("00ff00"), Some(Rgb::LIME));
        assert_eq!(Rgb::from_hex("#FFF"), None);
        assert_eq!(Rgb::from_hex("#GG0000"), None);
        assert_eq!(Rgb::new(0x12, 0x34, 0x56).to_hex(), "#123456");
        assert_eq!(Rgb::new(0x40, 0x80, 0xFF).to_colorref(), 0x00FF8040);
    }
}
