//! Focus Module - directional focus navigation
//!
//! One view holds focus at a time. Directional keys walk from the focused
//! view up through every ancestor carrying a [`FocusDelegate`]; each delegate
//! answers through the shared [`Navigate`] context:
//!
//! - `done(view)`: authoritative next focus, stop walking
//! - `continue_with(view)`: fallback candidate, keep walking
//! - `pass()`: not handled here, keep walking
//! - `abort()`: stop, no focus change
//!
//! When the walk runs out of ancestors the first fallback candidate wins.
//! Non-directional keys bubble through `on_key_down` handlers instead.
//!
//! # Example
//!
//! ```ignore
//! let row = tree.create(ViewType::Box, Props::new().focus_delegate(LinearFocusDelegate::horizontal()))?;
//! // ... append focusable children ...
//! focus.set_focus(&tree, row)?; // resolves to the group's current item
//! focus.on_key_down(&tree, &KeyEvent::new("ArrowRight"))?;
//! ```

mod linear;

use std::rc::Rc;

use tracing::trace;

use crate::error::FocusError;
use crate::input::{Direction, KeyEvent};
use crate::view::{ViewId, ViewTree};

pub use linear::{LinearFocusDelegate, Orientation};

/// Called after each directional key with the key and whether focus moved.
pub type KeyFinisher = Rc<dyn Fn(&str, bool)>;

// =============================================================================
// NAVIGATE
// =============================================================================

/// Delegate answer to a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Done,
    Continue,
    Abort,
}

/// Per-request context shared between the manager and the delegates it asks.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigate {
    direction: Direction,
    pending: Option<ViewId>,
    command: Option<Command>,
    next: Option<ViewId>,
}

impl Navigate {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            pending: None,
            command: None,
            next: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// First fallback candidate offered by a delegate below the current one.
    pub fn pending(&self) -> Option<ViewId> {
        self.pending
    }

    pub fn command(&self) -> Option<Command> {
        self.command
    }

    pub fn next(&self) -> Option<ViewId> {
        self.next
    }

    /// Keep walking, remembering `view` if no earlier candidate was offered.
    pub fn continue_with(&mut self, view: ViewId) {
        self.command = Some(Command::Continue);
        self.pending = self.pending.or(Some(view));
    }

    /// Ignore the request and keep walking.
    pub fn pass(&mut self) {
        self.command = Some(Command::Continue);
    }

    pub fn done(&mut self, view: ViewId) {
        self.command = Some(Command::Done);
        self.next = Some(view);
    }

    pub fn abort(&mut self) {
        self.command = Some(Command::Abort);
    }

    fn reset_answer(&mut self) {
        self.command = None;
        self.next = None;
    }
}

/// Moves focus among the descendants of the view that owns it.
pub trait FocusDelegate {
    /// Answer a directional request while focus is inside `owner`.
    fn navigate(&mut self, tree: &ViewTree, owner: ViewId, navigate: &mut Navigate) -> Result<(), FocusError>;

    /// Pick the descendant that takes focus when `owner` is focused. Must
    /// answer `done`. A `Direction::None` request reports an out-of-band
    /// focus change; answering `pass` is fine there.
    fn resolve(&mut self, tree: &ViewTree, owner: ViewId, navigate: &mut Navigate) -> Result<(), FocusError>;
}

// =============================================================================
// FOCUS MANAGER
// =============================================================================

#[derive(Default)]
pub struct FocusManager {
    focused: Option<ViewId>,
    key_finisher: Option<KeyFinisher>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }

    pub fn set_key_finisher(&mut self, finisher: impl Fn(&str, bool) + 'static) {
        self.key_finisher = Some(Rc::new(finisher));
    }

    /// Focus `view`, resolving through delegates, then bring every delegate
    /// ancestor in line with the new focus. Returns whether focus moved.
    pub fn set_focus(&mut self, tree: &ViewTree, view: ViewId) -> Result<bool, FocusError> {
        let changed = self.commit(tree, view, &mut Navigate::new(Direction::Right))?;
        if changed {
            self.sync_children(tree)?;
        }
        Ok(changed)
    }

    /// Blur the focused view, if any.
    pub fn clear_focus(&mut self, tree: &ViewTree) {
        if let Some(focused) = self.focused.take() {
            if let Some(on_blur) = tree.get(focused).and_then(|v| v.on_blur().cloned()) {
                on_blur(focused, Direction::None);
            }
        }
    }

    /// Drop focus without callbacks when the focused view no longer exists.
    pub fn forget_destroyed(&mut self, tree: &ViewTree) {
        if self.focused.is_some_and(|f| !tree.contains(f)) {
            self.focused = None;
        }
    }

    /// Route a key press. Returns true if focus moved or a handler consumed
    /// the key.
    pub fn on_key_down(&mut self, tree: &ViewTree, event: &KeyEvent) -> Result<bool, FocusError> {
        let Some(focused) = self.focused else {
            return Ok(false);
        };

        match event.direction() {
            Some(direction) => {
                let changed = self.navigate(tree, focused, direction)?;
                if let Some(finisher) = &self.key_finisher {
                    finisher(&event.key, changed);
                }
                Ok(changed)
            }
            None => Ok(bubble_key(tree, focused, event)),
        }
    }

    fn navigate(&mut self, tree: &ViewTree, focused: ViewId, direction: Direction) -> Result<bool, FocusError> {
        let mut navigate = Navigate::new(direction);
        let mut walker = Some(focused);

        while let Some(current) = walker {
            let view = tree.get(current).ok_or(FocusError::UnknownView)?;
            if let Some(delegate) = view.focus_delegate().cloned() {
                delegate.borrow_mut().navigate(tree, current, &mut navigate)?;
                match navigate.command {
                    Some(Command::Abort) => {
                        trace!(?direction, "navigation aborted");
                        return Ok(false);
                    }
                    Some(Command::Done) => {
                        let next = navigate.next.ok_or(FocusError::NoAnswer("navigate"))?;
                        return self.commit(tree, next, &mut navigate);
                    }
                    Some(Command::Continue) => navigate.command = None,
                    None => return Err(FocusError::NoAnswer("navigate")),
                }
            }
            walker = view.parent();
        }

        match navigate.pending {
            Some(pending) => self.commit(tree, pending, &mut navigate),
            None => Ok(false),
        }
    }

    fn commit(&mut self, tree: &ViewTree, view: ViewId, navigate: &mut Navigate) -> Result<bool, FocusError> {
        if self.focused == Some(view) {
            return Ok(false);
        }
        let target = tree.get(view).ok_or(FocusError::UnknownView)?;
        if !target.takes_focus() {
            return Err(FocusError::NotFocusable);
        }

        let view = if target.focus_delegate().is_some() {
            let resolved = resolve_delegate(tree, view, navigate)?;
            if self.focused == Some(resolved) {
                return Ok(false);
            }
            resolved
        } else {
            view
        };

        let direction = navigate.direction;
        if let Some(old) = self.focused.take() {
            if let Some(on_blur) = tree.get(old).and_then(|v| v.on_blur().cloned()) {
                on_blur(old, direction);
            }
        }
        self.focused = Some(view);
        if let Some(on_focus) = tree.get(view).and_then(|v| v.on_focus().cloned()) {
            on_focus(view, direction);
        }
        Ok(true)
    }

    /// Tell each delegate above the focused view which descendant now holds
    /// focus, so delegate-local positions follow out-of-band focus changes.
    pub fn sync_children(&self, tree: &ViewTree) -> Result<(), FocusError> {
        let Some(focused) = self.focused else {
            return Ok(());
        };
        let mut navigate = Navigate::new(Direction::None);
        navigate.pending = Some(focused);

        let mut walker = tree.parent(focused);
        while let Some(current) = walker {
            let view = tree.get(current).ok_or(FocusError::UnknownView)?;
            if let Some(delegate) = view.focus_delegate().cloned() {
                delegate.borrow_mut().resolve(tree, current, &mut navigate)?;
                navigate.reset_answer();
            }
            walker = view.parent();
        }
        Ok(())
    }
}

/// Follow delegates down from `view` until one resolves to a focusable view.
fn resolve_delegate(tree: &ViewTree, view: ViewId, navigate: &mut Navigate) -> Result<ViewId, FocusError> {
    let mut chain = view;
    loop {
        let delegate = tree
            .get(chain)
            .ok_or(FocusError::UnknownView)?
            .focus_delegate()
            .cloned()
            .ok_or(FocusError::NotFocusable)?;
        delegate.borrow_mut().resolve(tree, chain, navigate)?;

        if navigate.command != Some(Command::Done) {
            return Err(FocusError::NoAnswer("resolve"));
        }
        let next = navigate.next.ok_or(FocusError::NoAnswer("resolve"))?;
        if next == chain {
            return Err(FocusError::ResolvedToSelf);
        }
        navigate.reset_answer();

        if tree.get(next).ok_or(FocusError::UnknownView)?.is_focusable() {
            return Ok(next);
        }
        chain = next;
    }
}

fn bubble_key(tree: &ViewTree, focused: ViewId, event: &KeyEvent) -> bool {
    let mut walker = Some(focused);
    while let Some(current) = walker {
        let Some(view) = tree.get(current) else {
            return false;
        };
        if let Some(handler) = view.on_key_down() {
            if handler(current, event) {
                return true;
            }
        }
        walker = view.parent();
    }
    false
}
