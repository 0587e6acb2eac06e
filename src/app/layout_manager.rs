use tracing::trace;

use crate::error::ViewError;
use crate::types::Rect;
use crate::view::{LayoutHandler, ViewId, ViewTree};

/// Runs layout when the tree or the viewport changed, then reports moved
/// boxes to `on_layout` listeners.
#[derive(Debug, Default)]
pub struct LayoutManager {
    size: Option<(f32, f32)>,
}

impl LayoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether layout ran.
    pub fn run(&mut self, tree: &mut ViewTree, width: f32, height: f32) -> Result<bool, ViewError> {
        if self.size == Some((width, height)) && !tree.needs_layout()? {
            return Ok(false);
        }

        let before: Vec<(ViewId, Rect)> = tree
            .layout_listeners()
            .map(|id| tree.geometry(id).map(|g| (id, g.border_box)))
            .collect::<Result<_, _>>()?;

        tree.compute_layout(width, height)?;
        self.size = Some((width, height));
        trace!(width, height, "layout computed");

        let mut changed: Vec<(ViewId, Rect, LayoutHandler)> = Vec::new();
        for (id, old) in before {
            let new = tree.geometry(id)?.border_box;
            if new == old {
                continue;
            }
            if let Some(handler) = tree.get(id).and_then(|v| v.on_layout().cloned()) {
                changed.push((id, new, handler));
            }
        }
        for (id, rect, handler) in changed {
            handler(id, rect);
        }
        Ok(true)
    }
}
