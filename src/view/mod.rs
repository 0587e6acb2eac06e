//! View Module - the retained scene graph
//!
//! Views live in an arena owned by [`ViewTree`] and are addressed by
//! generational [`ViewId`]s. Parents own their children list; a child only
//! stores its parent's id, and any append or insert that would create a cycle
//! is rejected.
//!
//! Every view owns exactly one node in the shared [`LayoutTree`], and the
//! node's children always mirror the view's children in the same order.
//!
//! # Kinds
//!
//! - box: background, border and background image, may have children
//! - text: laid out glyph runs from a font resource
//! - image: an image resource fitted into the content box

mod box_view;
mod image_view;
mod text_view;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use taffy::NodeId;
use tracing::warn;

use crate::error::ViewError;
use crate::event::ListenerId;
use crate::focus::FocusDelegate;
use crate::input::{Direction, KeyEvent};
use crate::layout::{BoxGeometry, LayoutTree, SharedLayout};
use crate::platform::RenderingContext;
use crate::resource::{ResourceEvent, ResourceManager, ResourceRef, SourceSpec};
use crate::style::bindings::{bind_style, bind_style_property, overflow_of};
use crate::style::{AnimatedValue, ObserverId, Style};
use crate::types::{Overflow, Rect};

use box_view::BoxView;
use image_view::ImageView;
use text_view::TextView;

pub use image_view::fit_image;

pub type SharedResources = Rc<RefCell<ResourceManager>>;
pub type SharedDelegate = Rc<RefCell<dyn FocusDelegate>>;
/// Called with the view and the navigation direction (`None` when programmatic).
pub type FocusHandler = Rc<dyn Fn(ViewId, Direction)>;
/// Return true to stop the key from bubbling further.
pub type KeyHandler = Rc<dyn Fn(ViewId, &KeyEvent) -> bool>;
/// Called with the new border box, relative to the parent.
pub type LayoutHandler = Rc<dyn Fn(ViewId, Rect)>;

// =============================================================================
// IDS AND PROPS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Box,
    Text,
    Image,
}

impl ViewType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "box" | "div" => Some(Self::Box),
            "text" => Some(Self::Text),
            "img" | "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Everything a view is configured with. Styles are shared by reference: an
/// update carrying the same `Rc<Style>` keeps the existing bindings.
#[derive(Clone, Default)]
pub struct Props {
    pub id: Option<String>,
    pub style: Option<Rc<Style>>,
    pub visible: Option<bool>,
    pub focusable: bool,
    pub focus_delegate: Option<SharedDelegate>,
    pub on_focus: Option<FocusHandler>,
    pub on_blur: Option<FocusHandler>,
    pub on_key_down: Option<KeyHandler>,
    pub on_layout: Option<LayoutHandler>,
    /// Image source for image views.
    pub src: Option<SourceSpec>,
    /// Content of text views.
    pub text: Option<String>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn style(mut self, style: Rc<Style>) -> Self {
        self.style = Some(style);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn focus_delegate(mut self, delegate: impl FocusDelegate + 'static) -> Self {
        self.focus_delegate = Some(Rc::new(RefCell::new(delegate)));
        self
    }

    pub fn on_focus(mut self, f: impl Fn(ViewId, Direction) + 'static) -> Self {
        self.on_focus = Some(Rc::new(f));
        self
    }

    pub fn on_blur(mut self, f: impl Fn(ViewId, Direction) + 'static) -> Self {
        self.on_blur = Some(Rc::new(f));
        self
    }

    pub fn on_key_down(mut self, f: impl Fn(ViewId, &KeyEvent) -> bool + 'static) -> Self {
        self.on_key_down = Some(Rc::new(f));
        self
    }

    pub fn on_layout(mut self, f: impl Fn(ViewId, Rect) + 'static) -> Self {
        self.on_layout = Some(Rc::new(f));
        self
    }

    pub fn src(mut self, src: impl Into<SourceSpec>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("id", &self.id)
            .field("visible", &self.visible)
            .field("focusable", &self.focusable)
            .field("focus_delegate", &self.focus_delegate.is_some())
            .field("src", &self.src)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// VIEW
// =============================================================================

enum ViewKind {
    Root,
    Box(BoxView),
    Text(TextView),
    Image(ImageView),
}

pub struct View {
    id: Option<String>,
    style: Rc<Style>,
    visible: bool,
    dirty: bool,
    focusable: bool,
    focus_delegate: Option<SharedDelegate>,
    on_focus: Option<FocusHandler>,
    on_blur: Option<FocusHandler>,
    on_key_down: Option<KeyHandler>,
    on_layout: Option<LayoutHandler>,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
    node: NodeId,
    bindings: Vec<(AnimatedValue, ObserverId)>,
    kind: ViewKind,
}

impl View {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn view_type(&self) -> Option<ViewType> {
        match self.kind {
            ViewKind::Root => None,
            ViewKind::Box(_) => Some(ViewType::Box),
            ViewKind::Text(_) => Some(ViewType::Text),
            ViewKind::Image(_) => Some(ViewType::Image),
        }
    }

    pub fn style(&self) -> &Rc<Style> {
        &self.style
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn focus_delegate(&self) -> Option<&SharedDelegate> {
        self.focus_delegate.as_ref()
    }

    /// Focusable itself, or able to resolve focus to a descendant.
    pub fn takes_focus(&self) -> bool {
        self.focusable || self.focus_delegate.is_some()
    }

    pub fn on_focus(&self) -> Option<&FocusHandler> {
        self.on_focus.as_ref()
    }

    pub fn on_blur(&self) -> Option<&FocusHandler> {
        self.on_blur.as_ref()
    }

    pub fn on_key_down(&self) -> Option<&KeyHandler> {
        self.on_key_down.as_ref()
    }

    pub fn on_layout(&self) -> Option<&LayoutHandler> {
        self.on_layout.as_ref()
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Text content after `textTransform`, for text views.
    pub fn text(&self) -> Option<String> {
        match &self.kind {
            ViewKind::Text(text) => Some(text.text()),
            _ => None,
        }
    }

    fn apply_props(&mut self, props: &Props) {
        self.id = props.id.clone();
        self.visible = props.visible.unwrap_or(true);
        self.focusable = props.focusable;
        self.focus_delegate = props.focus_delegate.clone();
        self.on_focus = props.on_focus.clone();
        self.on_blur = props.on_blur.clone();
        self.on_key_down = props.on_key_down.clone();
        self.on_layout = props.on_layout.clone();
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("type", &self.view_type())
            .field("visible", &self.visible)
            .field("dirty", &self.dirty)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// STYLE BINDING
// =============================================================================

/// Reset the node style, apply `style`, and observe its animated layout
/// values so each change re-pushes just that property.
fn bind(layout: &SharedLayout, node: NodeId, style: &Style) -> Result<Vec<(AnimatedValue, ObserverId)>, ViewError> {
    let animated = layout.borrow_mut().update_style(node, |s| {
        *s = crate::style::bindings::default_node_style();
        bind_style(s, style)
    })??;

    let weak: Weak<RefCell<LayoutTree>> = Rc::downgrade(layout);
    Ok(animated
        .into_iter()
        .map(|(key, value)| {
            let weak = weak.clone();
            let observer = value.add_observer(&key, move |key, v| {
                let Some(layout) = weak.upgrade() else {
                    return;
                };
                let Ok(mut layout) = layout.try_borrow_mut() else {
                    warn!(property = %key, "layout busy, animated value dropped");
                    return;
                };
                match layout.update_style(node, |s| bind_style_property(s, key, v)) {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => warn!(property = %key, error = %err, "invalid animated value"),
                    Err(err) => warn!(property = %key, error = %err, "failed to update layout node"),
                }
            });
            (value, observer)
        })
        .collect())
}

fn unbind(bindings: &mut Vec<(AnimatedValue, ObserverId)>) {
    for (value, observer) in bindings.drain(..) {
        value.remove_observer(observer);
    }
}

/// Mark `node` dirty when `resource` finishes decoding, as long as
/// `still_current` says the view still shows it. The listener stays until
/// [`stop_watching`] removes it.
fn mark_dirty_on_load(
    layout: &SharedLayout,
    node: NodeId,
    resource: &ResourceRef,
    still_current: impl Fn(&ResourceRef) -> bool + 'static,
) -> ListenerId {
    let layout: Weak<RefCell<LayoutTree>> = Rc::downgrade(layout);
    let watched = Rc::downgrade(resource);
    resource.borrow().events().on(move |event| {
        if *event != ResourceEvent::Loaded {
            return;
        }
        let (Some(layout), Some(watched)) = (layout.upgrade(), watched.upgrade()) else {
            return;
        };
        if !still_current(&watched) {
            return;
        }
        match layout.try_borrow_mut() {
            Ok(mut layout) => {
                if let Err(err) = layout.mark_dirty(node) {
                    warn!(error = %err, "failed to mark node dirty");
                }
            }
            Err(_) => warn!("layout busy, load notification dropped"),
        }
    })
}

fn stop_watching(resource: &ResourceRef, listener: Option<ListenerId>) {
    if let Some(listener) = listener {
        resource.borrow().events().off(listener);
    }
}

// =============================================================================
// TREE
// =============================================================================

struct Slot {
    generation: u32,
    view: Option<View>,
}

/// Arena of views plus the layout tree and resources they share.
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ViewId,
    layout: SharedLayout,
    resources: SharedResources,
    empty_style: Rc<Style>,
    layout_listeners: IndexSet<ViewId>,
}

impl ViewTree {
    /// Create a tree holding just the root view.
    pub fn new(layout: SharedLayout, resources: SharedResources) -> Result<Self, ViewError> {
        let node = layout.borrow_mut().create_node()?;
        let empty_style = Rc::new(Style::empty());
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: ViewId { index: 0, generation: 0 },
            layout,
            resources,
            empty_style: empty_style.clone(),
            layout_listeners: IndexSet::new(),
        };
        tree.root = tree.insert(View {
            id: None,
            style: empty_style,
            visible: true,
            dirty: true,
            focusable: false,
            focus_delegate: None,
            on_focus: None,
            on_blur: None,
            on_key_down: None,
            on_layout: None,
            parent: None,
            children: Vec::new(),
            node,
            bindings: Vec::new(),
            kind: ViewKind::Root,
        });
        Ok(tree)
    }

    pub fn root(&self) -> ViewId {
        self.root
    }

    pub fn layout(&self) -> &SharedLayout {
        &self.layout
    }

    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    /// Number of live views, not counting the root.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.view.is_some()).count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.view.as_ref())
    }

    fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.view.as_mut())
    }

    pub fn view(&self, id: ViewId) -> Result<&View, ViewError> {
        self.get(id).ok_or(ViewError::UnknownView)
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut View, ViewError> {
        self.get_mut(id).ok_or(ViewError::UnknownView)
    }

    fn insert(&mut self, view: View) -> ViewId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.view = Some(view);
                ViewId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    view: Some(view),
                });
                ViewId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn take(&mut self, id: ViewId) -> Option<View> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let view = slot.view.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(view)
    }

    // -------------------------------------------------------------------------
    // Creation and props
    // -------------------------------------------------------------------------

    /// Create a detached view. Styles are bound and the view starts dirty.
    pub fn create(&mut self, view_type: ViewType, props: Props) -> Result<ViewId, ViewError> {
        let node = self.layout.borrow_mut().create_node()?;
        match self.build(view_type, &props, node) {
            Ok(view) => {
                let id = self.insert(view);
                if props.on_layout.is_some() {
                    self.layout_listeners.insert(id);
                }
                Ok(id)
            }
            Err(err) => {
                if let Err(cleanup) = self.layout.borrow_mut().remove_node(node) {
                    warn!(error = %cleanup, "failed to free layout node");
                }
                Err(err)
            }
        }
    }

    fn build(&self, view_type: ViewType, props: &Props, node: NodeId) -> Result<View, ViewError> {
        let style = props.style.clone().unwrap_or_else(|| self.empty_style.clone());
        let mut bindings = bind(&self.layout, node, &style)?;

        let kind = match view_type {
            ViewType::Box => Ok(ViewKind::Box(BoxView::new(&self.resources, &style))),
            ViewType::Text => TextView::new(&self.layout, node, &self.resources, props, &style).map(ViewKind::Text),
            ViewType::Image => ImageView::new(&self.layout, node, &self.resources, props).map(ViewKind::Image),
        };
        let kind = match kind {
            Ok(kind) => kind,
            Err(err) => {
                unbind(&mut bindings);
                return Err(err);
            }
        };

        let mut view = View {
            id: None,
            style,
            visible: true,
            dirty: true,
            focusable: false,
            focus_delegate: None,
            on_focus: None,
            on_blur: None,
            on_key_down: None,
            on_layout: None,
            parent: None,
            children: Vec::new(),
            node,
            bindings,
            kind,
        };
        view.apply_props(props);
        Ok(view)
    }

    /// Apply new props. A style that is not the same `Rc` as the current one
    /// is rebound from scratch; the same `Rc` leaves bindings untouched.
    pub fn update_props(&mut self, id: ViewId, props: Props) -> Result<(), ViewError> {
        let layout = self.layout.clone();
        let resources = self.resources.clone();
        let new_style = props.style.clone().unwrap_or_else(|| self.empty_style.clone());

        let view = self.view_mut(id)?;
        let old_style = view.style.clone();
        if !Rc::ptr_eq(&old_style, &new_style) {
            unbind(&mut view.bindings);
            view.bindings = bind(&layout, view.node, &new_style)?;
            view.style = new_style.clone();
        }
        view.apply_props(&props);

        let node = view.node;
        match &mut view.kind {
            ViewKind::Root => {}
            ViewKind::Box(b) => b.update(&resources, &new_style),
            ViewKind::Image(image) => image.update(&layout, node, &resources, props.src.as_ref())?,
            ViewKind::Text(text) => text.update(&layout, node, &resources, props.text.as_deref(), &old_style, &new_style)?,
        }

        if props.on_layout.is_some() {
            self.layout_listeners.insert(id);
        } else {
            self.layout_listeners.shift_remove(&id);
        }
        self.mark_dirty(id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    fn check_parenting(&self, parent: ViewId, child: ViewId) -> Result<(), ViewError> {
        let parent_view = self.view(parent)?;
        self.view(child)?;
        if matches!(parent_view.kind, ViewKind::Image(_)) {
            return Err(ViewError::ImageChildren);
        }
        if parent == child || child == self.root || self.is_descendant(parent, child) {
            return Err(ViewError::Cycle);
        }
        Ok(())
    }

    fn ignores_children(&self, parent: ViewId) -> bool {
        self.get(parent)
            .is_some_and(|v| matches!(v.kind, ViewKind::Text(_)))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// Re-appending a current child moves it to the end without marking
    /// anything dirty. Text views ignore children.
    pub fn append_child(&mut self, parent: ViewId, child: ViewId) -> Result<(), ViewError> {
        self.check_parenting(parent, child)?;
        if self.ignores_children(parent) {
            return Ok(());
        }

        let parent_node = self.view(parent)?.node;
        let child_view = self.view(child)?;
        let child_node = child_view.node;

        match child_view.parent {
            Some(p) if p == parent => {
                {
                    let mut layout = self.layout.borrow_mut();
                    layout.remove_child(parent_node, child_node)?;
                    layout.append_child(parent_node, child_node)?;
                }
                let children = &mut self.view_mut(parent)?.children;
                children.retain(|c| *c != child);
                children.push(child);
                return Ok(());
            }
            Some(_) => return Err(ViewError::AlreadyParented),
            None => {}
        }

        self.layout.borrow_mut().append_child(parent_node, child_node)?;
        self.view_mut(parent)?.children.push(child);
        self.view_mut(child)?.parent = Some(parent);
        self.mark_dirty(parent);
        Ok(())
    }

    /// Insert `child` before `before`, which must be a current child.
    /// A child of the same parent is moved.
    pub fn insert_child(&mut self, parent: ViewId, child: ViewId, before: ViewId) -> Result<(), ViewError> {
        self.check_parenting(parent, child)?;
        if self.ignores_children(parent) {
            return Ok(());
        }
        if !self.view(parent)?.children.contains(&before) {
            return Err(ViewError::NotAChild);
        }
        if child == before {
            return Ok(());
        }

        match self.view(child)?.parent {
            Some(p) if p == parent => self.detach_child(parent, child)?,
            Some(_) => return Err(ViewError::AlreadyParented),
            None => {}
        }

        let parent_node = self.view(parent)?.node;
        let child_node = self.view(child)?.node;
        let index = self
            .view(parent)?
            .children
            .iter()
            .position(|c| *c == before)
            .ok_or(ViewError::NotAChild)?;

        self.layout.borrow_mut().insert_child(parent_node, index, child_node)?;
        self.view_mut(parent)?.children.insert(index, child);
        self.view_mut(child)?.parent = Some(parent);
        self.mark_dirty(parent);
        Ok(())
    }

    /// Unparent `child`. Its layout node survives so the view can be
    /// reattached; [`destroy`](Self::destroy) frees it.
    pub fn remove_child(&mut self, parent: ViewId, child: ViewId) -> Result<(), ViewError> {
        self.view(child)?;
        if self.ignores_children(parent) {
            return Ok(());
        }
        if matches!(self.view(parent)?.kind, ViewKind::Image(_)) {
            return Err(ViewError::ImageChildren);
        }
        self.detach_child(parent, child)?;
        self.mark_dirty(parent);
        Ok(())
    }

    fn detach_child(&mut self, parent: ViewId, child: ViewId) -> Result<(), ViewError> {
        let parent_view = self.view(parent)?;
        let index = parent_view
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(ViewError::NotAChild)?;
        let parent_node = parent_view.node;
        let child_node = self.view(child)?.node;

        self.layout.borrow_mut().remove_child(parent_node, child_node)?;
        self.view_mut(parent)?.children.remove(index);
        self.view_mut(child)?.parent = None;
        Ok(())
    }

    /// Unparent (if needed) and free `id` and its whole subtree: bindings,
    /// resource references and layout nodes.
    pub fn destroy(&mut self, id: ViewId) -> Result<(), ViewError> {
        if id == self.root {
            return self.clear();
        }
        if let Some(parent) = self.view(id)?.parent {
            self.detach_child(parent, id)?;
            self.mark_dirty(parent);
        }
        self.destroy_subtree(id);
        Ok(())
    }

    /// Destroy every child of the root.
    pub fn clear(&mut self) -> Result<(), ViewError> {
        let children = self.view(self.root)?.children.clone();
        for child in children {
            self.destroy(child)?;
        }
        Ok(())
    }

    fn destroy_subtree(&mut self, id: ViewId) {
        let Some(mut view) = self.take(id) else {
            return;
        };
        for child in std::mem::take(&mut view.children) {
            self.destroy_subtree(child);
        }

        unbind(&mut view.bindings);
        match &mut view.kind {
            ViewKind::Root => {}
            ViewKind::Box(b) => b.release(&self.resources),
            ViewKind::Image(image) => image.release(&self.resources),
            ViewKind::Text(text) => text.release(&self.resources),
        }
        self.layout_listeners.shift_remove(&id);

        if let Err(err) = self.layout.borrow_mut().remove_node(view.node) {
            warn!(error = %err, "failed to free layout node");
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.get(id).and_then(|v| v.parent)
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.get(id).map_or(&[], |v| v.children.as_slice())
    }

    /// True if `ancestor` is a proper ancestor of `view`.
    pub fn is_descendant(&self, view: ViewId, ancestor: ViewId) -> bool {
        let mut walker = self.parent(view);
        while let Some(current) = walker {
            if current == ancestor {
                return true;
            }
            walker = self.parent(current);
        }
        false
    }

    /// Depth-first search for a view with the given `id` prop.
    pub fn get_view_by_id(&self, id: &str) -> Option<ViewId> {
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let view = self.get(current)?;
            if view.id.as_deref() == Some(id) {
                return Some(current);
            }
            stack.extend(view.children.iter().rev());
        }
        None
    }

    pub fn geometry(&self, id: ViewId) -> Result<BoxGeometry, ViewError> {
        let node = self.view(id)?.node;
        Ok(self.layout.borrow().geometry(node)?)
    }

    pub fn layout_listeners(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.layout_listeners.iter().copied()
    }

    // -------------------------------------------------------------------------
    // Dirty state and layout
    // -------------------------------------------------------------------------

    /// Mark `id` and every ancestor dirty.
    pub fn mark_dirty(&mut self, id: ViewId) {
        let mut walker = Some(id);
        while let Some(current) = walker {
            match self.get_mut(current) {
                Some(view) => {
                    view.dirty = true;
                    walker = view.parent;
                }
                None => break,
            }
        }
    }

    pub fn is_dirty(&self, id: ViewId) -> bool {
        self.get(id).is_some_and(|v| v.dirty)
    }

    /// Whether the layout tree has pending changes under the root.
    pub fn needs_layout(&self) -> Result<bool, ViewError> {
        let node = self.view(self.root)?.node;
        Ok(self.layout.borrow().is_dirty(node)?)
    }

    /// Size the root to the viewport and lay out the tree.
    pub fn compute_layout(&mut self, width: f32, height: f32) -> Result<(), ViewError> {
        let node = self.view(self.root)?.node;
        let mut layout = self.layout.borrow_mut();
        let current = layout.style(node)?;
        let size = taffy::Size {
            width: taffy::Dimension::Length(width),
            height: taffy::Dimension::Length(height),
        };
        if current.size != size {
            layout.update_style(node, |s| s.size = size)?;
        }
        layout.compute(node, width, height)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Draw
    // -------------------------------------------------------------------------

    /// Paint the tree and clear every dirty flag.
    pub fn draw(&mut self, ctx: &mut dyn RenderingContext) -> Result<(), ViewError> {
        {
            let layout = self.layout.borrow();
            self.draw_view(self.root, ctx, &layout, 0.0, 0.0)?;
        }
        for view in self.slots.iter_mut().filter_map(|s| s.view.as_mut()) {
            view.dirty = false;
        }
        Ok(())
    }

    fn draw_view(
        &self,
        id: ViewId,
        ctx: &mut dyn RenderingContext,
        layout: &LayoutTree,
        x: f32,
        y: f32,
    ) -> Result<(), ViewError> {
        let view = self.view(id)?;
        let geometry = layout.geometry(view.node)?;
        let rect = geometry.border_box.translate(x, y);
        let clip = overflow_of(layout.style(view.node)?) != Overflow::Visible;

        match &view.kind {
            ViewKind::Root => self.draw_children(view, ctx, layout, rect)?,
            ViewKind::Box(b) => {
                ctx.push_style(&view.style);
                if clip {
                    ctx.push_clip_rect(rect);
                }
                b.paint(&view.style, &geometry, rect, ctx);
                self.draw_children(view, ctx, layout, rect)?;
                if clip {
                    ctx.pop_clip_rect();
                }
                ctx.pop_style();
            }
            ViewKind::Text(text) => text.draw(&view.style, &geometry, rect, ctx),
            ViewKind::Image(image) => image.draw(&view.style, &geometry, rect, clip, ctx),
        }
        Ok(())
    }

    fn draw_children(
        &self,
        view: &View,
        ctx: &mut dyn RenderingContext,
        layout: &LayoutTree,
        rect: Rect,
    ) -> Result<(), ViewError> {
        for &child in &view.children {
            if self.view(child)?.visible {
                self.draw_view(child, ctx, layout, rect.x, rect.y)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTree")
            .field("root", &self.root)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleFragment;
    use crate::testing::{DrawOp, RecordingContext, test_tree};

    fn styled(fragment: StyleFragment) -> Rc<Style> {
        Rc::new(Style::new(fragment).unwrap())
    }

    fn boxed(tree: &mut ViewTree) -> ViewId {
        tree.create(ViewType::Box, Props::new()).unwrap()
    }

    /// Children list and layout node children agree, in order.
    fn assert_mirrored(tree: &ViewTree, id: ViewId) {
        let view = tree.view(id).unwrap();
        let nodes: Vec<NodeId> = view
            .children()
            .iter()
            .map(|c| tree.view(*c).unwrap().node())
            .collect();
        assert_eq!(tree.layout().borrow().children(view.node()).unwrap(), nodes);
    }

    #[test]
    fn test_append_insert_remove_mirror_layout() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        let c = boxed(&mut tree);

        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.insert_child(root, c, a).unwrap();
        assert_eq!(tree.children(root), &[c, a, b]);
        assert_mirrored(&tree, root);

        tree.remove_child(root, a).unwrap();
        assert_eq!(tree.children(root), &[c, b]);
        assert_eq!(tree.parent(a), None);
        assert_mirrored(&tree, root);

        // move within the same parent
        tree.insert_child(root, b, c).unwrap();
        assert_eq!(tree.children(root), &[b, c]);
        assert_mirrored(&tree, root);
    }

    #[test]
    fn test_reappend_moves_to_end_without_dirtying() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.draw(&mut RecordingContext::default()).unwrap();
        assert!(!tree.is_dirty(root));

        tree.append_child(root, a).unwrap();
        assert_eq!(tree.children(root), &[b, a]);
        assert_mirrored(&tree, root);
        assert!(!tree.is_dirty(root));
    }

    #[test]
    fn test_parenting_errors() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        let c = boxed(&mut tree);
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();

        assert!(matches!(tree.append_child(root, b), Err(ViewError::AlreadyParented)));
        assert!(matches!(tree.append_child(b, a), Err(ViewError::Cycle)));
        assert!(matches!(tree.append_child(a, a), Err(ViewError::Cycle)));
        assert!(matches!(tree.insert_child(root, c, b), Err(ViewError::NotAChild)));
        assert!(matches!(tree.remove_child(root, c), Err(ViewError::NotAChild)));

        let image = tree.create(ViewType::Image, Props::new()).unwrap();
        assert!(matches!(tree.append_child(image, c), Err(ViewError::ImageChildren)));
    }

    #[test]
    fn test_mark_dirty_propagates_to_root() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.draw(&mut RecordingContext::default()).unwrap();
        assert!(!tree.is_dirty(root));

        tree.mark_dirty(b);
        assert!(tree.is_dirty(a));
        assert!(tree.is_dirty(root));
    }

    #[test]
    fn test_destroy_frees_subtree() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = boxed(&mut tree);
        let b = boxed(&mut tree);
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();

        assert_eq!(tree.len(), 2);
        tree.destroy(a).unwrap();
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.children(root).is_empty());
        assert_mirrored(&tree, root);

        // slot reuse does not revive stale ids
        let c = boxed(&mut tree);
        assert!(tree.contains(c));
        assert!(!tree.contains(a));
    }

    #[test]
    fn test_lookup_and_descendants() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let a = tree.create(ViewType::Box, Props::new().id("menu")).unwrap();
        let b = tree.create(ViewType::Box, Props::new().id("item")).unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();

        assert_eq!(tree.get_view_by_id("item"), Some(b));
        assert_eq!(tree.get_view_by_id("missing"), None);
        assert!(tree.is_descendant(b, root));
        assert!(tree.is_descendant(b, a));
        assert!(!tree.is_descendant(a, b));
    }

    #[test]
    fn test_style_binding_and_rebinding() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let width = AnimatedValue::new(10.0);
        let style = styled(StyleFragment::new().set("width", width.clone()).set("height", 5.0));
        let a = tree.create(ViewType::Box, Props::new().style(style.clone())).unwrap();
        tree.append_child(root, a).unwrap();
        assert_eq!(width.observer_count(), 1);

        width.set(40.0);
        tree.compute_layout(200.0, 100.0).unwrap();
        assert_eq!(tree.geometry(a).unwrap().border_box.width, 40.0);

        // same Rc keeps the binding
        tree.update_props(a, Props::new().style(style.clone())).unwrap();
        assert_eq!(width.observer_count(), 1);

        // a new style drops it and resets stale properties
        tree.update_props(a, Props::new().style(styled(StyleFragment::new().set("height", 5.0)))).unwrap();
        assert_eq!(width.observer_count(), 0);
        tree.compute_layout(200.0, 100.0).unwrap();
        assert_eq!(tree.geometry(a).unwrap().border_box.width, 200.0);

        tree.destroy(a).unwrap();
        width.set(1.0);
    }

    #[test]
    fn test_compute_layout_sizes_root() {
        let (mut tree, _devices) = test_tree();
        tree.compute_layout(320.0, 240.0).unwrap();
        let g = tree.geometry(tree.root()).unwrap();
        assert_eq!(g.border_box, Rect::new(0.0, 0.0, 320.0, 240.0));
        assert!(!tree.needs_layout().unwrap());
    }

    #[test]
    fn test_draw_box_background_border_and_children() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let style = styled(
            StyleFragment::new()
                .set("width", 100.0)
                .set("height", 50.0)
                .set("backgroundColor", "red")
                .set("borderColor", "blue")
                .set("border", 2.0)
                .set("overflow", "hidden"),
        );
        let a = tree.create(ViewType::Box, Props::new().style(style)).unwrap();
        let hidden = tree.create(ViewType::Box, Props::new().visible(false).style(styled(
            StyleFragment::new().set("backgroundColor", "red"),
        ))).unwrap();
        tree.append_child(root, a).unwrap();
        tree.append_child(a, hidden).unwrap();
        tree.compute_layout(800.0, 600.0).unwrap();

        let mut ctx = RecordingContext::default();
        tree.draw(&mut ctx).unwrap();
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(
            ctx.ops,
            vec![
                DrawOp::PushStyle,
                DrawOp::PushClip(rect),
                DrawOp::FillRect(rect),
                DrawOp::Border(rect, crate::types::Edges::all(2.0)),
                DrawOp::PopClip,
                DrawOp::PopStyle,
            ]
        );
        assert!(!tree.is_dirty(root));
    }
}
