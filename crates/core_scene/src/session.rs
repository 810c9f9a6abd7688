//! Viewer session.
//!
//! Owns the single (snapshot, transform, selection) state and processes host
//! events from one ordered queue on the calling thread. A refresh replaces
//! the snapshot as a whole and re-fits the transform before anything can be
//! rendered from it.

use crate::catalog::{DesktopSource, Generation, Snapshot, TableRow};
use crate::scene::{build_frame, Frame, Palette};
use crate::selection::Selection;
use crate::transform::{ViewTransform, ZoomDirection, DEFAULT_ZOOM_STEP, MAX_ZOOM, MIN_ZOOM};
use crate::{PointF, SceneError, Size, WindowId};
use std::collections::VecDeque;

/// Mouse buttons the host reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Zooms in at the click position.
    Primary,
    /// Zooms out at the click position.
    Secondary,
}

/// Inbound events from the host toolkit.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host window was shown for the first time.
    Load,
    /// The canvas changed size.
    Resize { width: i32, height: i32 },
    Click { button: MouseButton, at: PointF },
    /// Re-enumerate monitors and windows. Undoes the zoom of the primary
    /// click that immediately precedes it as part of the same double-click.
    DoubleClick { at: PointF },
    /// A row of the external list view was selected.
    RowSelected(usize),
    /// Click-to-select on the canvas.
    SelectAt(PointF),
    ClearSelection,
    /// Zoom centered on the canvas (menu or keyboard).
    Zoom(ZoomDirection),
    Pan { dx: f64, dy: f64 },
    ResetZoom,
    Refresh,
}

/// What processing one event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// The frame must be rendered again.
    pub redraw: bool,
    /// The tabular dataset was replaced.
    pub table_changed: bool,
    /// The selection became empty: a refresh dropped the selected window
    /// or it was cleared explicitly.
    pub selection_cleared: bool,
    /// Window selected by this event.
    pub selected: Option<WindowId>,
    pub error: Option<SceneError>,
}

impl Outcome {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn failed(error: SceneError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// FIFO of pending host events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<HostEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: HostEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<HostEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Tuning for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub palette: Palette,
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            zoom_step: DEFAULT_ZOOM_STEP,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

/// The viewer state machine.
pub struct Session<S: DesktopSource> {
    source: S,
    options: SessionOptions,
    generation: Generation,
    snapshot: Option<Snapshot>,
    transform: ViewTransform,
    selection: Selection,
    canvas: Size,
    fit_error: Option<SceneError>,
    /// Transform as it was before the last event, if that event was a
    /// primary click.
    before_click: Option<ViewTransform>,
    queue: EventQueue,
}

impl<S: DesktopSource> Session<S> {
    pub fn new(source: S, options: SessionOptions) -> Self {
        let transform =
            ViewTransform::with_zoom_limits(options.zoom_step, options.min_zoom, options.max_zoom);
        Self {
            source,
            options,
            generation: Generation::default(),
            snapshot: None,
            transform,
            selection: Selection::new(),
            canvas: Size::default(),
            fit_error: None,
            before_click: None,
            queue: EventQueue::new(),
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Queue an event for the next [`pump`](Self::pump).
    pub fn push(&mut self, event: HostEvent) {
        self.queue.push(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Process every queued event in order; one outcome per event.
    pub fn pump(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            outcomes.push(self.handle(event));
        }
        outcomes
    }

    /// Process a single event immediately.
    pub fn handle(&mut self, event: HostEvent) -> Outcome {
        let before_click = self.before_click.take();
        match event {
            HostEvent::Load | HostEvent::Refresh => self.refresh_outcome(),
            HostEvent::DoubleClick { .. } => {
                // The toolkit reports the first half of a double-click as a
                // primary click.
                if let Some(transform) = before_click {
                    self.transform = transform;
                }
                self.refresh_outcome()
            }
            HostEvent::Resize { width, height } => {
                self.resize(Size::new(width, height));
                Outcome {
                    error: self.fit_error.clone(),
                    ..Outcome::redraw()
                }
            }
            HostEvent::Click { button, at } => {
                let direction = match button {
                    MouseButton::Primary => {
                        self.before_click = Some(self.transform.clone());
                        ZoomDirection::In
                    }
                    MouseButton::Secondary => ZoomDirection::Out,
                };
                self.transform.apply_zoom(direction, at);
                Outcome::redraw()
            }
            HostEvent::Zoom(direction) => {
                self.transform.apply_zoom(direction, self.canvas.center());
                Outcome::redraw()
            }
            HostEvent::Pan { dx, dy } => {
                self.transform.pan_by(dx, dy);
                Outcome::redraw()
            }
            HostEvent::ResetZoom => {
                self.transform.reset();
                Outcome::redraw()
            }
            HostEvent::RowSelected(row) => match self.select_row(row) {
                Ok(id) => Outcome {
                    selected: Some(id),
                    ..Outcome::redraw()
                },
                Err(e) => Outcome::failed(e),
            },
            HostEvent::SelectAt(at) => match self.select_at(at) {
                Ok(Some(id)) => Outcome {
                    selected: Some(id),
                    ..Outcome::redraw()
                },
                Ok(None) => Outcome::default(),
                Err(e) => Outcome::failed(e),
            },
            HostEvent::ClearSelection => {
                let had_selection = !self.selection.is_empty();
                self.selection.clear();
                Outcome {
                    selection_cleared: had_selection,
                    ..Outcome::redraw()
                }
            }
        }
    }

    /// Refresh and describe the result. A snapshot that loads but cannot be
    /// fitted still replaces the table; the fit error rides along.
    fn refresh_outcome(&mut self) -> Outcome {
        match self.refresh() {
            Ok(cleared) => Outcome {
                redraw: true,
                table_changed: true,
                selection_cleared: cleared,
                selected: None,
                error: self.fit_error.clone(),
            },
            Err(e) => Outcome::failed(e),
        }
    }

    /// Take a new snapshot of both catalogs as one generation.
    ///
    /// On success the selection is carried over by handle; returns `true`
    /// if it had to be cleared. A failed source leaves the previous
    /// generation in place.
    pub fn refresh(&mut self) -> Result<bool, SceneError> {
        let generation = self.generation.next();
        let snapshot = Snapshot::capture(generation, &mut self.source)?;

        let cleared = self.selection.revalidate(snapshot.windows());
        self.snapshot = Some(snapshot);
        self.generation = generation;
        self.refit();
        Ok(cleared)
    }

    /// Re-fit the base scale for a new canvas size; zoom, pivot and
    /// selection are kept.
    pub fn resize(&mut self, canvas: Size) {
        self.canvas = canvas;
        self.refit();
    }

    fn refit(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let fitted = snapshot
            .monitors()
            .world_bounds()
            .and_then(|world| self.transform.fit(self.canvas, world));
        self.fit_error = fitted.err();
    }

    pub fn select_row(&mut self, row: usize) -> Result<WindowId, SceneError> {
        let snapshot = self.snapshot.as_ref().ok_or(SceneError::NotLoaded)?;
        self.selection.select_by_row(snapshot.windows(), row)
    }

    /// Select the frontmost window under a canvas point; a miss keeps the
    /// current selection.
    pub fn select_at(&mut self, at: PointF) -> Result<Option<WindowId>, SceneError> {
        let snapshot = self.snapshot.as_ref().ok_or(SceneError::NotLoaded)?;
        if let Some(e) = &self.fit_error {
            return Err(e.clone());
        }
        Ok(self
            .selection
            .select_by_point(snapshot.windows(), &self.transform, at))
    }

    /// Compose the frame for the current generation.
    pub fn render(&self) -> Result<Frame, SceneError> {
        let snapshot = self.snapshot.as_ref().ok_or(SceneError::NotLoaded)?;
        if let Some(e) = &self.fit_error {
            return Err(e.clone());
        }
        Ok(build_frame(
            snapshot,
            &self.transform,
            &self.selection,
            self.canvas,
            &self.options.palette,
        ))
    }

    /// Rows for the external list view, in z-order.
    pub fn table(&self) -> Vec<TableRow> {
        self.snapshot
            .as_ref()
            .map(|s| s.windows().table())
            .unwrap_or_default()
    }

    /// Table row of the current selection, for syncing the list view.
    pub fn selected_row(&self) -> Option<usize> {
        let snapshot = self.snapshot.as_ref()?;
        let id = self.selection.resolve(snapshot.windows())?;
        snapshot.windows().get(id).map(|w| w.z_index())
    }
}
