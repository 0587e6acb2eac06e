//! Layout Module
//!
//! Flexbox layout for the view tree using [Taffy](https://github.com/DioxusLabs/taffy).
//!
//! Each view owns exactly one node in a shared [`LayoutTree`]. Style
//! properties are pushed into node styles through [`crate::style::bindings`],
//! leaves with intrinsic size (text, image) carry a [`Measure`] context, and
//! computed boxes are read back as [`BoxGeometry`].

mod text_layout;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use taffy::{AvailableSpace, NodeId, Size, TaffyTree, TraversePartialTree};

use crate::error::LayoutError;
use crate::style::bindings::default_node_style;
use crate::types::{Edges, Rect};

pub use text_layout::{CodepointMetrics, FontSample, TextLayout};

/// Shared handle; views, the application and layout listeners all hold one.
pub type SharedLayout = Rc<RefCell<LayoutTree>>;

/// Intrinsic size of a leaf. `None` means the axis is unbounded.
pub trait Measure {
    fn measure(&self, width: Option<f32>, height: Option<f32>) -> (f32, f32);
}

#[derive(Clone)]
struct MeasureContext(Rc<dyn Measure>);

impl fmt::Debug for MeasureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MeasureContext")
    }
}

/// Computed box of a node. Positions are relative to the parent's border box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxGeometry {
    pub border_box: Rect,
    pub border: Edges,
    pub padding: Edges,
}

impl BoxGeometry {
    pub fn padding_box(&self) -> Rect {
        self.border_box.inset(self.border)
    }

    pub fn content_box(&self) -> Rect {
        self.padding_box().inset(self.padding)
    }
}

fn edges(rect: taffy::Rect<f32>) -> Edges {
    Edges {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    }
}

fn available(value: f32) -> AvailableSpace {
    if value.is_finite() && value > 0.0 {
        AvailableSpace::Definite(value)
    } else {
        AvailableSpace::MaxContent
    }
}

// =============================================================================
// LAYOUT TREE
// =============================================================================

/// Thin typed wrapper over a taffy tree.
#[derive(Debug)]
pub struct LayoutTree {
    taffy: TaffyTree<MeasureContext>,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    pub fn new() -> Self {
        Self {
            taffy: TaffyTree::new(),
        }
    }

    pub fn shared() -> SharedLayout {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn create_node(&mut self) -> Result<NodeId, LayoutError> {
        Ok(self.taffy.new_leaf(default_node_style())?)
    }

    /// Free a node. Its children are detached, not freed.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), LayoutError> {
        self.taffy.remove(node)?;
        Ok(())
    }

    pub fn set_measure(&mut self, node: NodeId, measure: Option<Rc<dyn Measure>>) -> Result<(), LayoutError> {
        self.taffy.set_node_context(node, measure.map(MeasureContext))?;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.taffy.add_child(parent, child)?;
        Ok(())
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), LayoutError> {
        self.taffy.insert_child_at_index(parent, index, child)?;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.taffy.remove_child(parent, child)?;
        Ok(())
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, LayoutError> {
        Ok(self.taffy.children(node)?)
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.taffy.child_count(node)
    }

    /// Edit a node style in place; taffy marks the node dirty.
    pub fn update_style<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut taffy::Style) -> R,
    ) -> Result<R, LayoutError> {
        let mut style = self.taffy.style(node)?.clone();
        let out = f(&mut style);
        self.taffy.set_style(node, style)?;
        Ok(out)
    }

    pub fn style(&self, node: NodeId) -> Result<&taffy::Style, LayoutError> {
        Ok(self.taffy.style(node)?)
    }

    pub fn mark_dirty(&mut self, node: NodeId) -> Result<(), LayoutError> {
        self.taffy.mark_dirty(node)?;
        Ok(())
    }

    pub fn is_dirty(&self, node: NodeId) -> Result<bool, LayoutError> {
        Ok(self.taffy.dirty(node)?)
    }

    /// Lay out the subtree at `root` inside a `width` x `height` viewport.
    /// Non-positive sizes leave that axis unbounded.
    pub fn compute(&mut self, root: NodeId, width: f32, height: f32) -> Result<(), LayoutError> {
        let space = Size {
            width: available(width),
            height: available(height),
        };

        let mut measure_fn = |known_dimensions: Size<Option<f32>>,
                              available_space: Size<AvailableSpace>,
                              _node_id: NodeId,
                              context: Option<&mut MeasureContext>,
                              _style: &taffy::Style| {
            let Some(MeasureContext(measure)) = context else {
                return Size::ZERO;
            };
            let bound = |known: Option<f32>, avail: AvailableSpace| {
                known.or(match avail {
                    AvailableSpace::Definite(v) => Some(v),
                    _ => None,
                })
            };
            let (w, h) = measure.measure(
                bound(known_dimensions.width, available_space.width),
                bound(known_dimensions.height, available_space.height),
            );
            Size {
                width: known_dimensions.width.unwrap_or(w),
                height: known_dimensions.height.unwrap_or(h),
            }
        };

        self.taffy.compute_layout_with_measure(root, space, &mut measure_fn)?;
        Ok(())
    }

    pub fn geometry(&self, node: NodeId) -> Result<BoxGeometry, LayoutError> {
        let layout = self.taffy.layout(node)?;
        Ok(BoxGeometry {
            border_box: Rect::new(
                layout.location.x,
                layout.location.y,
                layout.size.width,
                layout.size.height,
            ),
            border: edges(layout.border),
            padding: edges(layout.padding),
        })
    }
}
