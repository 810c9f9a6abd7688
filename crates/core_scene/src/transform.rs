//! World-to-view transform.
//!
//! The view is a uniform scale of world space (`base_scale * zoom`) plus a
//! translation chosen so that the world point under the last zoom pivot
//! stays under that pivot:
//!
//! ```text
//! view = translate(pivot) ∘ scale(base_scale * zoom) ∘ translate(-anchor)
//! ```
//!
//! `anchor` is the world point that was under `pivot` when the zoom event
//! happened. Starting from the reset state it equals `pivot / base_scale`.

use crate::catalog::WorldBounds;
use crate::{PointF, Rect, RectF, SceneError, Size};
use serde::{Deserialize, Serialize};

/// Multiplier applied per zoom step.
pub const DEFAULT_ZOOM_STEP: f64 = 1.2;

/// Zoom floor; keeps the scale positive and invertible.
pub const MIN_ZOOM: f64 = 0.01;

/// Zoom ceiling; keeps the scale finite.
pub const MAX_ZOOM: f64 = 1e4;

/// Direction of a zoom event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Axis-aligned 2x3 affine matrix without rotation or shear.
///
/// Maps `(x, y)` to `(sx * x + tx, sy * y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translate(dx: f64, dy: f64) -> Self {
        Self {
            tx: dx,
            ty: dy,
            ..Self::IDENTITY
        }
    }

    pub fn scale(s: f64) -> Self {
        Self {
            sx: s,
            sy: s,
            ..Self::IDENTITY
        }
    }

    /// `self ∘ inner`: apply `inner` first, then `self`.
    pub fn compose(&self, inner: &Affine) -> Affine {
        Affine {
            sx: self.sx * inner.sx,
            sy: self.sy * inner.sy,
            tx: self.sx * inner.tx + self.tx,
            ty: self.sy * inner.ty + self.ty,
        }
    }

    pub fn apply(&self, p: PointF) -> PointF {
        PointF::new(self.sx * p.x + self.tx, self.sy * p.y + self.ty)
    }

    pub fn invert(&self) -> Option<Affine> {
        if self.sx == 0.0 || self.sy == 0.0 {
            return None;
        }
        Some(Affine {
            sx: 1.0 / self.sx,
            sy: 1.0 / self.sy,
            tx: -self.tx / self.sx,
            ty: -self.ty / self.sy,
        })
    }

    /// Row-major `[[a, b, c], [d, e, f]]` form.
    pub fn to_matrix(&self) -> [[f64; 3]; 2] {
        [[self.sx, 0.0, self.tx], [0.0, self.sy, self.ty]]
    }
}

/// Fit-to-canvas scale: `min(canvas_w / world_w, canvas_h / world_h)`.
pub fn fit_scale(
    canvas_w: i32,
    canvas_h: i32,
    world_w: i32,
    world_h: i32,
) -> Result<f64, SceneError> {
    if world_w <= 0 || world_h <= 0 {
        return Err(SceneError::EmptyWorld {
            width: world_w,
            height: world_h,
        });
    }
    if canvas_w <= 0 || canvas_h <= 0 {
        return Err(SceneError::EmptyCanvas {
            width: canvas_w,
            height: canvas_h,
        });
    }

    let sx = f64::from(canvas_w) / f64::from(world_w);
    let sy = f64::from(canvas_h) / f64::from(world_h);
    Ok(sx.min(sy))
}

/// Pan/zoom state mapping world space onto the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    base_scale: f64,
    zoom: f64,
    pivot: PointF,
    anchor: PointF,
    origin: PointF,
    zoom_step: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            base_scale: 1.0,
            zoom: 1.0,
            pivot: PointF::ORIGIN,
            anchor: PointF::ORIGIN,
            origin: PointF::ORIGIN,
            zoom_step: DEFAULT_ZOOM_STEP,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with custom zoom tuning. Out-of-range values fall
    /// back to the defaults; the ceiling never drops below the floor.
    pub fn with_zoom_limits(zoom_step: f64, min_zoom: f64, max_zoom: f64) -> Self {
        let min_zoom = if min_zoom.is_finite() && min_zoom > 0.0 {
            min_zoom
        } else {
            MIN_ZOOM
        };
        let max_zoom = if max_zoom.is_finite() && max_zoom >= min_zoom {
            max_zoom
        } else {
            MAX_ZOOM.max(min_zoom)
        };
        Self {
            zoom_step: if zoom_step.is_finite() && zoom_step > 1.0 {
                zoom_step
            } else {
                DEFAULT_ZOOM_STEP
            },
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pivot(&self) -> PointF {
        self.pivot
    }

    /// Effective world-to-view scale.
    pub fn scale(&self) -> f64 {
        self.base_scale * self.zoom
    }

    /// Recompute the base scale for a canvas and world. Zoom, pivot and
    /// anchor are kept.
    pub fn fit(&mut self, canvas: Size, world: WorldBounds) -> Result<f64, SceneError> {
        let base = fit_scale(canvas.width, canvas.height, world.width, world.height)?;
        self.base_scale = base;
        self.origin = PointF::new(f64::from(world.origin_x), f64::from(world.origin_y));
        Ok(base)
    }

    /// Zoom by one step around a view-space pivot.
    pub fn apply_zoom(&mut self, direction: ZoomDirection, pivot: PointF) {
        let anchor = self.view_to_world(pivot);
        self.zoom = match direction {
            ZoomDirection::In => (self.zoom * self.zoom_step).min(self.max_zoom),
            ZoomDirection::Out => (self.zoom / self.zoom_step).max(self.min_zoom),
        };
        self.pivot = pivot;
        self.anchor = anchor;
    }

    /// Shift the view by a view-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pivot = PointF::new(self.pivot.x + dx, self.pivot.y + dy);
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pivot = PointF::ORIGIN;
        self.anchor = PointF::ORIGIN;
    }

    /// World-to-view matrix: translate(pivot) ∘ scale ∘ translate(-anchor).
    pub fn matrix(&self) -> Affine {
        Affine::translate(self.pivot.x, self.pivot.y)
            .compose(&Affine::scale(self.scale()))
            .compose(&Affine::translate(-self.anchor.x, -self.anchor.y))
    }

    pub fn world_to_view(&self, world: PointF) -> PointF {
        self.matrix().apply(world)
    }

    pub fn view_to_world(&self, view: PointF) -> PointF {
        // scale() is positive and finite: base_scale comes from a successful
        // fit and zoom is clamped on both sides.
        let s = self.scale();
        PointF::new(
            self.anchor.x + (view.x - self.pivot.x) / s,
            self.anchor.y + (view.y - self.pivot.y) / s,
        )
    }

    pub fn desktop_to_view(&self, desktop: PointF) -> PointF {
        self.world_to_view(PointF::new(desktop.x - self.origin.x, desktop.y - self.origin.y))
    }

    pub fn view_to_desktop(&self, view: PointF) -> PointF {
        let world = self.view_to_world(view);
        PointF::new(world.x + self.origin.x, world.y + self.origin.y)
    }

    /// Map a desktop rectangle into view space.
    pub fn rect_to_view(&self, rect: Rect) -> RectF {
        RectF::from_corners(
            self.desktop_to_view(rect.top_left()),
            self.desktop_to_view(rect.bottom_right()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn world(width: i32, height: i32) -> WorldBounds {
        WorldBounds {
            origin_x: 0,
            origin_y: 0,
            width,
            height,
        }
    }

    fn fitted(canvas: Size, w: WorldBounds) -> ViewTransform {
        let mut t = ViewTransform::new();
        t.fit(canvas, w).unwrap();
        t
    }

    #[test]
    fn test_fit_is_min_ratio() {
        assert_eq!(fit_scale(960, 270, 3840, 1080).unwrap(), 0.25);
        assert_eq!(fit_scale(800, 600, 1920, 1080).unwrap(), 800.0 / 1920.0);
        assert_eq!(fit_scale(800, 300, 1920, 1080).unwrap(), 300.0 / 1080.0);
    }

    #[test]
    fn test_fit_rejects_empty_world_and_canvas() {
        assert_eq!(
            fit_scale(800, 600, 0, 1080),
            Err(SceneError::EmptyWorld {
                width: 0,
                height: 1080
            })
        );
        assert_eq!(
            fit_scale(0, 600, 1920, 1080),
            Err(SceneError::EmptyCanvas {
                width: 0,
                height: 600
            })
        );
    }

    #[test]
    fn test_failed_fit_keeps_previous_scale() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        assert!(t.fit(Size::new(0, 0), world(3840, 1080)).is_err());
        assert_eq!(t.base_scale(), 0.25);
    }

    #[test]
    fn test_zoom_in_then_out_restores() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        t.apply_zoom(ZoomDirection::In, PointF::new(10.0, 20.0));
        assert!((t.zoom() - 1.2).abs() < EPS);
        t.apply_zoom(ZoomDirection::Out, PointF::new(10.0, 20.0));
        assert!((t.zoom() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_zoom_is_multiplicative() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        for _ in 0..3 {
            t.apply_zoom(ZoomDirection::In, PointF::ORIGIN);
        }
        assert!((t.zoom() - 1.2f64.powi(3)).abs() < EPS);
    }

    #[test]
    fn test_zoom_out_clamps_at_floor() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        for _ in 0..100 {
            t.apply_zoom(ZoomDirection::Out, PointF::new(5.0, 5.0));
        }
        assert_eq!(t.zoom(), MIN_ZOOM);
        assert!(t.scale() > 0.0);
    }

    #[test]
    fn test_pivot_invariance_from_reset() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        let pivot = PointF::new(100.0, 100.0);
        let under = t.view_to_world(pivot);

        t.apply_zoom(ZoomDirection::In, pivot);
        assert!(t.world_to_view(under).distance(pivot) < 1e-6);
    }

    #[test]
    fn test_pivot_invariance_across_consecutive_zooms() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        let steps = [
            (ZoomDirection::In, PointF::new(100.0, 100.0)),
            (ZoomDirection::In, PointF::new(700.0, 30.0)),
            (ZoomDirection::Out, PointF::new(12.0, 250.0)),
            (ZoomDirection::In, PointF::new(480.0, 135.0)),
        ];
        for (dir, pivot) in steps {
            let under = t.view_to_world(pivot);
            t.apply_zoom(dir, pivot);
            assert!(t.world_to_view(under).distance(pivot) < 1e-6);
        }
    }

    #[test]
    fn test_matrix_matches_pivot_formula_from_reset() {
        // From reset the anchor is pivot / base_scale.
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        let pivot = PointF::new(100.0, 60.0);
        t.apply_zoom(ZoomDirection::In, pivot);

        let s = t.scale();
        let base = t.base_scale();
        let p = PointF::new(1234.0, 567.0);
        let expected = PointF::new(
            pivot.x + s * (p.x - pivot.x / base),
            pivot.y + s * (p.y - pivot.y / base),
        );
        assert!(t.world_to_view(p).distance(expected) < 1e-9);

        // Reversed order keeps a different point fixed.
        let reversed = Affine::translate(-pivot.x / base, -pivot.y / base)
            .compose(&Affine::scale(s))
            .compose(&Affine::translate(pivot.x, pivot.y));
        assert!(reversed.apply(p).distance(expected) > 1.0);
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut t = fitted(Size::new(800, 600), world(1920, 1080));
        t.apply_zoom(ZoomDirection::In, PointF::new(300.0, 200.0));
        t.pan_by(-40.0, 25.0);

        let p = PointF::new(640.0, 480.0);
        let back = t.view_to_world(t.world_to_view(p));
        assert!(back.distance(p) < 1e-9);

        let inv = t.matrix().invert().unwrap();
        assert!(inv.apply(t.world_to_view(p)).distance(p) < 1e-9);
    }

    #[test]
    fn test_pan_shifts_view() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        let before = t.world_to_view(PointF::new(400.0, 400.0));
        t.pan_by(10.0, -5.0);
        let after = t.world_to_view(PointF::new(400.0, 400.0));
        assert!((after.x - before.x - 10.0).abs() < EPS);
        assert!((after.y - before.y + 5.0).abs() < EPS);
    }

    #[test]
    fn test_reset() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        t.apply_zoom(ZoomDirection::In, PointF::new(50.0, 50.0));
        t.pan_by(30.0, 30.0);
        t.reset();
        assert_eq!(t.zoom(), 1.0);
        assert_eq!(t.pivot(), PointF::ORIGIN);
        assert_eq!(t.world_to_view(PointF::new(400.0, 400.0)), PointF::new(100.0, 100.0));
    }

    #[test]
    fn test_desktop_origin_offset() {
        let mut t = ViewTransform::new();
        t.fit(
            Size::new(640, 360),
            WorldBounds {
                origin_x: -1920,
                origin_y: 0,
                width: 3840,
                height: 1080,
            },
        )
        .unwrap();
        let v = t.desktop_to_view(PointF::new(-1920.0, 0.0));
        assert!(v.distance(PointF::ORIGIN) < EPS);
        let d = t.view_to_desktop(PointF::new(320.0, 0.0));
        assert!(d.distance(PointF::new(0.0, 0.0)) < EPS);
    }

    #[test]
    fn test_rect_to_view() {
        let t = fitted(Size::new(960, 270), world(3840, 1080));
        let r = t.rect_to_view(Rect::new(100, 100, 300, 200));
        assert_eq!(r, RectF::new(25.0, 25.0, 75.0, 50.0));
    }

    #[test]
    fn test_custom_zoom_limits() {
        let t = ViewTransform::with_zoom_limits(0.5, -1.0, f64::INFINITY);
        assert_eq!(t.zoom_step, DEFAULT_ZOOM_STEP);
        assert_eq!(t.min_zoom, MIN_ZOOM);
        assert_eq!(t.max_zoom, MAX_ZOOM);

        let t = ViewTransform::with_zoom_limits(1.2, 2e4, 10.0);
        assert_eq!(t.max_zoom, 2e4);

        let mut t = ViewTransform::with_zoom_limits(2.0, 0.25, 8.0);
        t.fit(Size::new(100, 100), world(100, 100)).unwrap();
        t.apply_zoom(ZoomDirection::In, PointF::ORIGIN);
        assert_eq!(t.zoom(), 2.0);
        for _ in 0..5 {
            t.apply_zoom(ZoomDirection::Out, PointF::ORIGIN);
        }
        assert_eq!(t.zoom(), 0.25);
        for _ in 0..10 {
            t.apply_zoom(ZoomDirection::In, PointF::ORIGIN);
        }
        assert_eq!(t.zoom(), 8.0);
    }

    #[test]
    fn test_zoom_in_is_clamped_and_recoverable() {
        let mut t = fitted(Size::new(960, 270), world(3840, 1080));
        let pivot = PointF::new(100.0, 100.0);
        for _ in 0..5000 {
            t.apply_zoom(ZoomDirection::In, pivot);
        }
        assert_eq!(t.zoom(), MAX_ZOOM);
        assert!(t.scale().is_finite());

        let view = t.world_to_view(PointF::new(400.0, 400.0));
        assert!(view.x.is_finite() && view.y.is_finite());

        t.apply_zoom(ZoomDirection::Out, pivot);
        assert!((t.zoom() - MAX_ZOOM / DEFAULT_ZOOM_STEP).abs() < 1e-6);
        let back = t.view_to_world(pivot);
        assert!(back.x.is_finite() && back.y.is_finite());
    }
}
