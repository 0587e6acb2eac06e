//! Listener registry with deferred registration.
//!
//! Listeners registered while an emit is running are staged and only become
//! active after the outermost emit returns, so a callback that subscribes
//! something new never sees that subscriber fire for the same event.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E> {
    id: ListenerId,
    once: bool,
    alive: Cell<bool>,
    callback: Box<dyn Fn(&E)>,
}

pub struct EventEmitter<E> {
    active: RefCell<Vec<Rc<Listener<E>>>>,
    staged: RefCell<Vec<Rc<Listener<E>>>>,
    depth: Cell<u32>,
    next_id: Cell<u64>,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            active: RefCell::new(Vec::new()),
            staged: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            next_id: Cell::new(1),
        }
    }

    /// Subscribe a listener.
    pub fn on(&self, callback: impl Fn(&E) + 'static) -> ListenerId {
        self.register(Box::new(callback), false)
    }

    /// Subscribe a listener that is removed after its first call.
    pub fn once(&self, callback: impl Fn(&E) + 'static) -> ListenerId {
        self.register(Box::new(callback), true)
    }

    /// Unsubscribe. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        for list in [&self.active, &self.staged] {
            let mut list = list.borrow_mut();
            if let Some(pos) = list.iter().position(|l| l.id == id) {
                list[pos].alive.set(false);
                if self.depth.get() == 0 {
                    list.remove(pos);
                }
            }
        }
    }

    /// Remove every listener.
    pub fn clear(&self) {
        for list in [&self.active, &self.staged] {
            for l in list.borrow_mut().drain(..) {
                l.alive.set(false);
            }
        }
    }

    /// Invoke every active listener with `event`.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Rc<Listener<E>>> = self.active.borrow().clone();
        if snapshot.is_empty() {
            return;
        }

        self.depth.set(self.depth.get() + 1);
        for listener in &snapshot {
            if !listener.alive.get() {
                continue;
            }
            if listener.once {
                listener.alive.set(false);
            }
            (listener.callback)(event);
        }
        self.depth.set(self.depth.get() - 1);

        if self.depth.get() == 0 {
            self.merge();
        }
    }

    /// Number of live listeners, staged ones included.
    pub fn listener_count(&self) -> usize {
        let live = |list: &RefCell<Vec<Rc<Listener<E>>>>| {
            list.borrow().iter().filter(|l| l.alive.get()).count()
        };
        live(&self.active) + live(&self.staged)
    }

    fn register(&self, callback: Box<dyn Fn(&E)>, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let listener = Rc::new(Listener {
            id,
            once,
            alive: Cell::new(true),
            callback,
        });

        if self.depth.get() > 0 {
            self.staged.borrow_mut().push(listener);
        } else {
            self.active.borrow_mut().push(listener);
        }
        id
    }

    fn merge(&self) {
        let mut active = self.active.borrow_mut();
        active.retain(|l| l.alive.get());
        active.extend(self.staged.borrow_mut().drain(..).filter(|l| l.alive.get()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_and_emit() {
        let emitter = EventEmitter::<i32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        emitter.on(move |v| s.borrow_mut().push(*v));

        emitter.emit(&1);
        emitter.emit(&2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_once_fires_once() {
        let emitter = EventEmitter::<()>::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        emitter.once(move |_| c.set(c.get() + 1));

        emitter.emit(&());
        emitter.emit(&());
        assert_eq!(count.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_off() {
        let emitter = EventEmitter::<()>::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = emitter.on(move |_| c.set(c.get() + 1));
        emitter.off(id);
        emitter.off(id);

        emitter.emit(&());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_listener_added_during_emit_is_deferred() {
        let emitter = Rc::new(EventEmitter::<()>::new());
        let count = Rc::new(Cell::new(0));

        let e = emitter.clone();
        let c = count.clone();
        emitter.once(move |_| {
            let c = c.clone();
            e.on(move |_| c.set(c.get() + 1));
        });

        emitter.emit(&());
        assert_eq!(count.get(), 0);
        assert_eq!(emitter.listener_count(), 1);

        emitter.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_off_during_emit_skips_pending_listener() {
        let emitter = Rc::new(EventEmitter::<()>::new());
        let count = Rc::new(Cell::new(0));
        let second: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let e = emitter.clone();
        let s = second.clone();
        emitter.on(move |_| {
            if let Some(id) = s.get() {
                e.off(id);
            }
        });
        let c = count.clone();
        second.set(Some(emitter.on(move |_| c.set(c.get() + 1))));

        emitter.emit(&());
        assert_eq!(count.get(), 0);
        assert_eq!(emitter.listener_count(), 1);
    }
}
