//! Observable numeric value used to animate style properties.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Observer handle returned by [`AnimatedValue::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Rc<dyn Fn(&str, f32)>;

struct Inner {
    value: Cell<f32>,
    observers: RefCell<Vec<(ObserverId, String, Observer)>>,
    next_id: Cell<u64>,
}

/// Shared numeric cell. Cloning yields another handle to the same value.
///
/// `set` notifies observers synchronously, so a bound layout property is
/// updated in the same tick the animation writes it.
#[derive(Clone)]
pub struct AnimatedValue(Rc<Inner>);

impl AnimatedValue {
    pub fn new(initial: f32) -> Self {
        Self(Rc::new(Inner {
            value: Cell::new(initial),
            observers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }))
    }

    pub fn get(&self) -> f32 {
        self.0.value.get()
    }

    /// Store a new value and notify every observer with `(key, value)`.
    pub fn set(&self, value: f32) {
        self.0.value.set(value);

        // Observers may unbind themselves while being notified.
        let observers: Vec<(String, Observer)> = self
            .0
            .observers
            .borrow()
            .iter()
            .map(|(_, key, f)| (key.clone(), f.clone()))
            .collect();

        for (key, observer) in observers {
            observer(&key, value);
        }
    }

    /// Register an observer that receives the property key it was bound under.
    pub fn add_observer(&self, key: &str, observer: impl Fn(&str, f32) + 'static) -> ObserverId {
        let id = ObserverId(self.0.next_id.get());
        self.0.next_id.set(id.0 + 1);
        self.0
            .observers
            .borrow_mut()
            .push((id, key.to_string(), Rc::new(observer)));
        id
    }

    /// Remove an observer. Removing twice is a no-op.
    pub fn remove_observer(&self, id: ObserverId) {
        self.0.observers.borrow_mut().retain(|(oid, _, _)| *oid != id);
    }

    pub fn observer_count(&self) -> usize {
        self.0.observers.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for AnimatedValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Identity comparison: two handles are equal only if they share a cell.
impl PartialEq for AnimatedValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for AnimatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedValue")
            .field("value", &self.get())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_notifies_observers() {
        let value = AnimatedValue::new(1.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        value.add_observer("width", move |key, v| s.borrow_mut().push((key.to_string(), v)));

        value.set(5.0);
        assert_eq!(value.get(), 5.0);
        assert_eq!(*seen.borrow(), vec![("width".to_string(), 5.0)]);
    }

    #[test]
    fn test_remove_observer_is_idempotent() {
        let value = AnimatedValue::default();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = value.add_observer("x", move |_, _| h.set(h.get() + 1));

        value.remove_observer(id);
        value.remove_observer(id);
        value.set(2.0);
        assert_eq!(hits.get(), 0);
        assert_eq!(value.observer_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let a = AnimatedValue::new(3.0);
        let b = a.clone();
        b.set(7.0);
        assert_eq!(a.get(), 7.0);
        assert_eq!(a, b);
        assert_ne!(a, AnimatedValue::new(7.0));
    }
}
