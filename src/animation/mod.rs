//! Animation Module - frame-stepped animations over animated values
//!
//! Animations advance once per frame by the elapsed milliseconds and retire
//! themselves when done.
//!
//! # Pattern
//!
//! - [`Timing`] eases one [`AnimatedValue`](crate::style::AnimatedValue) from `from` to `to`
//! - [`Sequence`] runs children one after another
//! - [`Parallel`] runs children together and finishes when all have
//! - [`AnimationScheduler`] starts animations; the [`AnimationManager`] picks
//!   them up on its next [`run`](AnimationManager::run)
//!
//! # Example
//!
//! ```ignore
//! use small_screen::animation::{easing, Timing, TimingConfig};
//!
//! let handle = app.animations().start(
//!     Timing::new(value.clone(), TimingConfig::to(100.0, 300.0).easing(easing::quad())),
//!     Some(Box::new(|| println!("done"))),
//! );
//! handle.stop();
//! ```

mod composite;
pub mod easing;
mod timing;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use composite::{Parallel, Sequence};
pub use timing::{Timing, TimingConfig};

/// Completion callback, fired at most once.
pub type Callback = Box<dyn FnOnce()>;

/// A time-stepped animation.
pub trait Animation {
    /// Advance by `delta` milliseconds. Returns true while the animation
    /// should stay registered; the tick that finishes it still returns true.
    fn update(&mut self, delta: f32) -> bool;

    fn is_finished(&self) -> bool;

    /// Mark finished. Pending work is dropped.
    fn finish(&mut self);

    fn boxed(self) -> Box<dyn Animation>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

// =============================================================================
// HANDLE
// =============================================================================

struct Started {
    animation: RefCell<Box<dyn Animation>>,
    callback: RefCell<Option<Callback>>,
}

/// A started animation.
#[derive(Clone)]
pub struct AnimationHandle(Rc<Started>);

impl AnimationHandle {
    fn new(animation: Box<dyn Animation>, callback: Option<Callback>) -> Self {
        Self(Rc::new(Started {
            animation: RefCell::new(animation),
            callback: RefCell::new(callback),
        }))
    }

    pub fn is_finished(&self) -> bool {
        self.0.animation.borrow().is_finished()
    }

    /// Stop the animation. Only the first call runs the callback.
    pub fn stop(&self) {
        {
            let mut animation = self.0.animation.borrow_mut();
            if !animation.is_finished() {
                animation.finish();
            }
        }
        self.fire();
    }

    fn update(&self, delta: f32) -> bool {
        let running = self.0.animation.borrow_mut().update(delta);
        if self.is_finished() {
            self.fire();
        }
        running
    }

    fn fire(&self) {
        let callback = self.0.callback.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

// =============================================================================
// SCHEDULER / MANAGER
// =============================================================================

/// Cloneable entry point for starting animations, usable from callbacks
/// while the manager is running.
#[derive(Clone, Default)]
pub struct AnimationScheduler {
    pending: Rc<RefCell<Vec<AnimationHandle>>>,
}

impl AnimationScheduler {
    pub fn start(&self, animation: impl Animation + 'static, callback: Option<Callback>) -> AnimationHandle {
        self.start_boxed(Box::new(animation), callback)
    }

    pub fn start_boxed(&self, animation: Box<dyn Animation>, callback: Option<Callback>) -> AnimationHandle {
        let handle = AnimationHandle::new(animation, callback);
        self.pending.borrow_mut().push(handle.clone());
        handle
    }

    fn drain(&self) -> Vec<AnimationHandle> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Registry of running animations.
#[derive(Debug, Default)]
pub struct AnimationManager {
    animations: Vec<AnimationHandle>,
    scheduler: AnimationScheduler,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduler(&self) -> AnimationScheduler {
        self.scheduler.clone()
    }

    pub fn start(&self, animation: impl Animation + 'static, callback: Option<Callback>) -> AnimationHandle {
        self.scheduler.start(animation, callback)
    }

    /// Registered plus pending animations.
    pub fn len(&self) -> usize {
        self.animations.len() + self.scheduler.pending_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Step every animation, newest first. Returns true if any is still
    /// running, meaning the scene needs a redraw.
    pub fn run(&mut self, delta: f32) -> bool {
        self.animations.extend(self.scheduler.drain());

        let mut dirty = false;
        let mut i = self.animations.len();
        while i > 0 {
            i -= 1;
            if self.animations[i].update(delta) {
                dirty = true;
            } else {
                self.animations.swap_remove(i);
            }
        }
        dirty
    }

    /// Drop everything without running callbacks.
    pub fn clear(&mut self) {
        self.animations.clear();
        self.scheduler.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::AnimatedValue;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Callback) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, Box::new(move || c.set(c.get() + 1)))
    }

    fn timing(value: &AnimatedValue) -> Timing {
        Timing::new(value.clone(), TimingConfig::to(3.0, 3.0).from(0.0))
    }

    #[test]
    fn test_timing_steps_and_callback_once() {
        let mut manager = AnimationManager::new();
        let value = AnimatedValue::new(0.0);
        let (count, callback) = counter();
        let handle = manager.start(timing(&value), Some(callback));

        let mut seen = Vec::new();
        for _ in 0..3 {
            assert!(!handle.is_finished());
            assert!(manager.run(1.0));
            seen.push(value.get());
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);
        assert!(handle.is_finished());
        assert_eq!(count.get(), 1);

        // retired on the next tick
        assert!(!manager.run(1.0));
        assert!(manager.is_empty());
        handle.stop();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_sequence() {
        let mut manager = AnimationManager::new();
        let a = AnimatedValue::new(0.0);
        let b = AnimatedValue::new(0.0);
        let (count, callback) = counter();
        manager.start(
            Sequence::new(vec![timing(&a).boxed(), timing(&b).boxed()]),
            Some(callback),
        );

        for _ in 0..3 {
            manager.run(1.0);
        }
        assert_eq!(a.get(), 3.0);
        assert_eq!(b.get(), 0.0);
        assert_eq!(count.get(), 0);

        for _ in 0..3 {
            manager.run(1.0);
        }
        assert_eq!(b.get(), 3.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_parallel() {
        let mut manager = AnimationManager::new();
        let a = AnimatedValue::new(0.0);
        let b = AnimatedValue::new(0.0);
        let (count, callback) = counter();
        manager.start(
            Parallel::new(vec![timing(&a).boxed(), timing(&b).boxed()]),
            Some(callback),
        );

        for _ in 0..3 {
            manager.run(1.0);
        }
        assert_eq!((a.get(), b.get()), (3.0, 3.0));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let manager = AnimationManager::new();
        let value = AnimatedValue::new(0.0);
        let (count, callback) = counter();
        let handle = manager.start(timing(&value), Some(callback));
        handle.stop();
        handle.stop();
        assert_eq!(count.get(), 1);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_stopped_sequence_never_starts_rest() {
        let mut manager = AnimationManager::new();
        let a = AnimatedValue::new(0.0);
        let b = AnimatedValue::new(0.0);
        let handle = manager.start(Sequence::new(vec![timing(&a).boxed(), timing(&b).boxed()]), None);
        manager.run(1.0);
        handle.stop();
        for _ in 0..6 {
            manager.run(1.0);
        }
        assert_eq!(a.get(), 1.0);
        assert_eq!(b.get(), 0.0);
    }

    #[test]
    fn test_callback_can_schedule_followup() {
        let mut manager = AnimationManager::new();
        let value = AnimatedValue::new(0.0);
        let scheduler = manager.scheduler();
        let next = value.clone();
        manager.start(
            timing(&value),
            Some(Box::new(move || {
                scheduler.start(Timing::new(next, TimingConfig::to(0.0, 2.0)), None);
            })),
        );

        for _ in 0..3 {
            manager.run(1.0);
        }
        assert_eq!(value.get(), 3.0);
        assert_eq!(manager.len(), 2);

        manager.run(1.0);
        manager.run(1.0);
        assert_eq!(value.get(), 0.0);
    }
}
