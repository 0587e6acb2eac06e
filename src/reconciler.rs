//! Reconciler - host config for tree-diffing drivers
//!
//! A diffing library drives the view tree through [`HostConfig`]: it
//! creates instances by tag, wires them together and pushes prop updates.
//! [`Element`] is a plain description that [`mount`] builds in one pass,
//! for callers without a diffing library.
//!
//! Tags: `box` / `div` (box view), `text`, `img` / `image`.

use tracing::debug;

use crate::error::ReconcileError;
use crate::view::{Props, ViewId, ViewTree, ViewType};

/// Mutation callbacks a tree-diffing driver needs from its host.
pub trait HostConfig {
    type Instance: Copy;

    fn create_instance(&mut self, tag: &str, props: Props) -> Result<Self::Instance, ReconcileError>;

    /// Child wiring while the parent is still detached.
    fn append_initial_child(&mut self, parent: Self::Instance, child: Self::Instance) -> Result<(), ReconcileError>;

    fn append_child(&mut self, parent: Self::Instance, child: Self::Instance) -> Result<(), ReconcileError>;

    fn append_child_to_container(&mut self, child: Self::Instance) -> Result<(), ReconcileError>;

    fn insert_before(
        &mut self,
        parent: Self::Instance,
        child: Self::Instance,
        before: Self::Instance,
    ) -> Result<(), ReconcileError>;

    fn insert_in_container_before(&mut self, child: Self::Instance, before: Self::Instance) -> Result<(), ReconcileError>;

    /// Removal destroys the child and its subtree.
    fn remove_child(&mut self, parent: Self::Instance, child: Self::Instance) -> Result<(), ReconcileError>;

    fn remove_child_from_container(&mut self, child: Self::Instance) -> Result<(), ReconcileError>;

    /// Apply `new_props` unless it is the very same props object.
    fn commit_update(&mut self, instance: Self::Instance, old_props: &Props, new_props: &Props) -> Result<(), ReconcileError>;

    /// Whether the instance takes its children as text content.
    fn should_set_text_content(&self, tag: &str) -> bool {
        tag == "text"
    }
}

impl HostConfig for ViewTree {
    type Instance = ViewId;

    fn create_instance(&mut self, tag: &str, props: Props) -> Result<ViewId, ReconcileError> {
        let view_type = ViewType::from_tag(tag).ok_or_else(|| ReconcileError::UnknownTag(tag.to_string()))?;
        Ok(self.create(view_type, props)?)
    }

    fn append_initial_child(&mut self, parent: ViewId, child: ViewId) -> Result<(), ReconcileError> {
        HostConfig::append_child(self, parent, child)
    }

    fn append_child(&mut self, parent: ViewId, child: ViewId) -> Result<(), ReconcileError> {
        if self.get(parent).is_some_and(|v| v.view_type() == Some(ViewType::Image)) {
            return Err(ReconcileError::UnsupportedParent);
        }
        Ok(ViewTree::append_child(self, parent, child)?)
    }

    fn append_child_to_container(&mut self, child: ViewId) -> Result<(), ReconcileError> {
        let root = self.root();
        Ok(ViewTree::append_child(self, root, child)?)
    }

    fn insert_before(&mut self, parent: ViewId, child: ViewId, before: ViewId) -> Result<(), ReconcileError> {
        Ok(self.insert_child(parent, child, before)?)
    }

    fn insert_in_container_before(&mut self, child: ViewId, before: ViewId) -> Result<(), ReconcileError> {
        let root = self.root();
        Ok(self.insert_child(root, child, before)?)
    }

    fn remove_child(&mut self, _parent: ViewId, child: ViewId) -> Result<(), ReconcileError> {
        Ok(self.destroy(child)?)
    }

    fn remove_child_from_container(&mut self, child: ViewId) -> Result<(), ReconcileError> {
        Ok(self.destroy(child)?)
    }

    fn commit_update(&mut self, instance: ViewId, old_props: &Props, new_props: &Props) -> Result<(), ReconcileError> {
        if std::ptr::eq(old_props, new_props) {
            return Ok(());
        }
        Ok(self.update_props(instance, new_props.clone())?)
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

/// Declarative description of a subtree.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub props: Props,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::default(),
            children: Vec::new(),
        }
    }

    pub fn boxed() -> Self {
        Self::new("box")
    }

    pub fn text(content: impl Into<String>) -> Self {
        let mut element = Self::new("text");
        element.props.text = Some(content.into());
        element
    }

    pub fn image(src: impl Into<crate::resource::SourceSpec>) -> Self {
        let mut element = Self::new("img");
        element.props.src = Some(src.into());
        element
    }

    pub fn props(mut self, props: Props) -> Self {
        let text = self.props.text.take();
        let src = self.props.src.take();
        self.props = props;
        self.props.text = self.props.text.take().or(text);
        self.props.src = self.props.src.take().or(src);
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Build `element` and append it under `parent`. On failure the partly
/// built subtree is destroyed.
pub fn mount(tree: &mut ViewTree, parent: ViewId, element: &Element) -> Result<ViewId, ReconcileError> {
    let id = build(tree, element)?;
    let attached = if parent == tree.root() {
        tree.append_child_to_container(id)
    } else {
        HostConfig::append_child(tree, parent, id)
    };
    if let Err(err) = attached {
        tree.destroy(id)?;
        return Err(err);
    }
    debug!(tag = %element.tag, "mounted element");
    Ok(id)
}

fn build(tree: &mut ViewTree, element: &Element) -> Result<ViewId, ReconcileError> {
    let id = tree.create_instance(&element.tag, element.props.clone())?;
    if tree.should_set_text_content(&element.tag) {
        return Ok(id);
    }
    for child in &element.children {
        let child = match build(tree, child) {
            Ok(child) => child,
            Err(err) => {
                tree.destroy(id)?;
                return Err(err);
            }
        };
        if let Err(err) = tree.append_initial_child(id, child) {
            tree.destroy(child)?;
            tree.destroy(id)?;
            return Err(err);
        }
    }
    Ok(id)
}
