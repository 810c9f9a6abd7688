//! Selection index.
//!
//! Holds at most one highlighted window. Both the table-row path and the
//! click path end in the same [`WindowRef`], tagged with the generation of
//! the catalog it was taken from.

use crate::catalog::{Generation, WindowCatalog};
use crate::transform::ViewTransform;
use crate::{PointF, SceneError, WindowId};
use serde::{Deserialize, Serialize};

/// A window identity valid within one catalog generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowRef {
    pub generation: Generation,
    pub id: WindowId,
}

/// The currently highlighted window, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<WindowRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<WindowRef> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The selected handle if it belongs to `catalog`'s generation and is
    /// present in it.
    pub fn resolve(&self, catalog: &WindowCatalog) -> Option<WindowId> {
        self.current
            .filter(|r| r.generation == catalog.generation() && catalog.contains(r.id))
            .map(|r| r.id)
    }

    /// Select the window at a table row. An out-of-range row leaves the
    /// selection untouched.
    pub fn select_by_row(
        &mut self,
        catalog: &WindowCatalog,
        row: usize,
    ) -> Result<WindowId, SceneError> {
        let window = catalog
            .at(row)
            .ok_or(SceneError::RowOutOfBounds(row, catalog.len()))?;
        self.current = Some(WindowRef {
            generation: catalog.generation(),
            id: window.id(),
        });
        Ok(window.id())
    }

    /// Select the frontmost visible window under a view-space point.
    ///
    /// Returns `None` and keeps the current selection when nothing is hit.
    pub fn select_by_point(
        &mut self,
        catalog: &WindowCatalog,
        transform: &ViewTransform,
        view: PointF,
    ) -> Option<WindowId> {
        let desktop = transform.view_to_desktop(view);
        let window = catalog.topmost_at(desktop)?;
        self.current = Some(WindowRef {
            generation: catalog.generation(),
            id: window.id(),
        });
        Some(window.id())
    }

    /// Carry the selection over to a newer catalog by handle.
    ///
    /// Returns `true` if a selection existed and had to be cleared.
    pub fn revalidate(&mut self, catalog: &WindowCatalog) -> bool {
        let Some(current) = self.current else {
            return false;
        };

        if catalog.contains(current.id) {
            self.current = Some(WindowRef {
                generation: catalog.generation(),
                id: current.id,
            });
            false
        } else {
            self.current = None;
            true
        }
    }
}
