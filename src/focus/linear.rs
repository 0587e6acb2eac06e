use crate::error::FocusError;
use crate::input::Direction;
use crate::view::{ViewId, ViewTree};

use super::{FocusDelegate, Navigate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

/// Focus group moving through its children in a row or column.
///
/// The focal path holds, per child, the child itself if it takes focus or
/// else its first descendant that does. Arrows along the axis step through
/// the path; at either end the current item is offered as a fallback and the
/// request continues to outer delegates.
#[derive(Debug, Clone, Default)]
pub struct LinearFocusDelegate {
    orientation: Orientation,
    focal_path_index: usize,
    focal_path: Vec<ViewId>,
    /// Build the focal path once instead of on every request.
    is_static: bool,
}

impl LinearFocusDelegate {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            ..Default::default()
        }
    }

    pub fn horizontal() -> Self {
        Self::new(Orientation::Horizontal)
    }

    pub fn vertical() -> Self {
        Self::new(Orientation::Vertical)
    }

    pub fn with_static_path(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn focal_path_index(&self) -> usize {
        self.focal_path_index
    }

    pub fn focal_path(&self) -> &[ViewId] {
        &self.focal_path
    }

    fn offset(&self, direction: Direction) -> isize {
        let on_axis = match self.orientation {
            Orientation::Horizontal => direction.is_horizontal(),
            Orientation::Vertical => direction.is_vertical(),
        };
        if on_axis { direction.step() } else { 0 }
    }

    fn build_focal_path(&mut self, tree: &ViewTree, owner: ViewId) -> Result<(), FocusError> {
        if self.is_static && !self.focal_path.is_empty() {
            return Ok(());
        }
        if !tree.contains(owner) {
            return Err(FocusError::UnknownView);
        }

        self.focal_path = tree
            .children(owner)
            .iter()
            .filter_map(|&child| find_focusable(tree, child))
            .collect();
        if self.focal_path.is_empty() {
            return Err(FocusError::EmptyGroup);
        }
        self.focal_path_index = self.focal_path_index.min(self.focal_path.len() - 1);
        Ok(())
    }

    fn current(&self) -> ViewId {
        self.focal_path[self.focal_path_index]
    }

    /// Point the index at the item holding `focused`, if it is not already.
    fn sync(&mut self, tree: &ViewTree, focused: Option<ViewId>, navigate: &mut Navigate) {
        let Some(focused) = focused else {
            navigate.pass();
            return;
        };
        let holds = |item: ViewId| item == focused || tree.is_descendant(focused, item);

        if holds(self.current()) {
            navigate.pass();
            return;
        }
        match self.focal_path.iter().position(|&item| holds(item)) {
            Some(index) => {
                self.focal_path_index = index;
                navigate.done(self.focal_path[index]);
            }
            None => navigate.pass(),
        }
    }
}

impl FocusDelegate for LinearFocusDelegate {
    fn navigate(&mut self, tree: &ViewTree, owner: ViewId, navigate: &mut Navigate) -> Result<(), FocusError> {
        self.build_focal_path(tree, owner)?;

        let offset = self.offset(navigate.direction());
        if offset == 0 {
            navigate.pass();
            return Ok(());
        }

        let next = self.focal_path_index as isize + offset;
        if next >= 0 && (next as usize) < self.focal_path.len() {
            self.focal_path_index = next as usize;
            navigate.done(self.current());
        } else {
            navigate.continue_with(self.current());
        }
        Ok(())
    }

    fn resolve(&mut self, tree: &ViewTree, owner: ViewId, navigate: &mut Navigate) -> Result<(), FocusError> {
        self.build_focal_path(tree, owner)?;

        let direction = navigate.direction();
        if direction == Direction::None {
            self.sync(tree, navigate.pending(), navigate);
            return Ok(());
        }

        // Entering from outside along the axis starts at the near end.
        let entering = navigate
            .pending()
            .is_some_and(|pending| !tree.is_descendant(pending, owner));
        if entering {
            match self.offset(direction) {
                1 => self.focal_path_index = 0,
                -1 => self.focal_path_index = self.focal_path.len() - 1,
                _ => {}
            }
        }
        navigate.done(self.current());
        Ok(())
    }
}

fn find_focusable(tree: &ViewTree, view: ViewId) -> Option<ViewId> {
    let v = tree.get(view)?;
    if v.takes_focus() {
        return Some(view);
    }
    v.children().iter().find_map(|&child| find_focusable(tree, child))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::focus::FocusManager;
    use crate::input::KeyEvent;
    use crate::testing::test_tree;
    use crate::view::{Props, ViewType};

    fn group(tree: &mut ViewTree, parent: ViewId, delegate: LinearFocusDelegate, items: usize) -> (ViewId, Vec<ViewId>) {
        let g = tree.create(ViewType::Box, Props::new().focus_delegate(delegate)).unwrap();
        tree.append_child(parent, g).unwrap();
        let leaves = (0..items)
            .map(|_| {
                let leaf = tree.create(ViewType::Box, Props::new().focusable(true)).unwrap();
                tree.append_child(g, leaf).unwrap();
                leaf
            })
            .collect();
        (g, leaves)
    }

    fn press(focus: &mut FocusManager, tree: &ViewTree, key: &str) -> bool {
        focus.on_key_down(tree, &KeyEvent::new(key)).unwrap()
    }

    #[test]
    fn test_horizontal_steps_and_stops_at_boundary() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let (_, leaves) = group(&mut tree, root, LinearFocusDelegate::horizontal(), 3);
        let mut focus = FocusManager::new();
        focus.set_focus(&tree, leaves[0]).unwrap();

        assert!(press(&mut focus, &tree, "ArrowRight"));
        assert_eq!(focus.focused(), Some(leaves[1]));
        assert!(press(&mut focus, &tree, "ArrowLeft"));
        assert_eq!(focus.focused(), Some(leaves[0]));
        assert!(!press(&mut focus, &tree, "ArrowLeft"));
        assert_eq!(focus.focused(), Some(leaves[0]));
        // off-axis keys pass through
        assert!(!press(&mut focus, &tree, "ArrowDown"));
        assert_eq!(focus.focused(), Some(leaves[0]));
    }

    #[test]
    fn test_focusing_group_resolves_to_current_item() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let (g, leaves) = group(&mut tree, root, LinearFocusDelegate::vertical(), 2);
        let mut focus = FocusManager::new();

        focus.set_focus(&tree, g).unwrap();
        assert_eq!(focus.focused(), Some(leaves[0]));
        assert!(press(&mut focus, &tree, "ArrowDown"));
        assert_eq!(focus.focused(), Some(leaves[1]));
    }

    #[test]
    fn test_nested_groups_hand_off_at_boundary() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let row = tree
            .create(ViewType::Box, Props::new().focus_delegate(LinearFocusDelegate::horizontal()))
            .unwrap();
        tree.append_child(root, row).unwrap();
        let (_, left) = group(&mut tree, row, LinearFocusDelegate::vertical(), 2);
        let (_, right) = group(&mut tree, row, LinearFocusDelegate::vertical(), 2);

        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        let mut focus = FocusManager::new();
        focus.set_key_finisher(move |key, changed| c.borrow_mut().push((key.to_string(), changed)));

        focus.set_focus(&tree, left[1]).unwrap();
        assert!(press(&mut focus, &tree, "ArrowRight"));
        assert_eq!(focus.focused(), Some(right[0]));

        // coming back lands on the item the left column remembered
        assert!(press(&mut focus, &tree, "ArrowLeft"));
        assert_eq!(focus.focused(), Some(left[1]));
        assert_eq!(
            *changes.borrow(),
            vec![("ArrowRight".to_string(), true), ("ArrowLeft".to_string(), true)]
        );
    }

    #[test]
    fn test_programmatic_focus_syncs_index() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let (_, leaves) = group(&mut tree, root, LinearFocusDelegate::horizontal(), 3);
        let mut focus = FocusManager::new();

        focus.set_focus(&tree, leaves[2]).unwrap();
        assert!(press(&mut focus, &tree, "ArrowLeft"));
        assert_eq!(focus.focused(), Some(leaves[1]));
    }

    #[test]
    fn test_empty_group_is_an_error() {
        let (mut tree, _devices) = test_tree();
        let root = tree.root();
        let (g, _) = group(&mut tree, root, LinearFocusDelegate::vertical(), 0);
        let mut focus = FocusManager::new();
        assert_eq!(focus.set_focus(&tree, g), Err(FocusError::EmptyGroup));
    }
}
