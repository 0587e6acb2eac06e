use std::fmt;

use super::Animation;
use super::easing::{self, Easing};
use crate::style::AnimatedValue;

/// Parameters for a [`Timing`] animation.
#[derive(Clone)]
pub struct TimingConfig {
    pub from: Option<f32>,
    pub to: f32,
    /// Milliseconds.
    pub duration: f32,
    pub easing: Easing,
}

impl TimingConfig {
    pub fn to(to: f32, duration: f32) -> Self {
        Self {
            from: None,
            to,
            duration,
            easing: easing::linear(),
        }
    }

    pub fn from(mut self, from: f32) -> Self {
        self.from = Some(from);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Eases a value from `from` to `to` over `duration` ms.
///
/// Intermediate values are truncated to whole units; the final tick lands
/// exactly on `easing(1)` of the range.
pub struct Timing {
    value: AnimatedValue,
    from: f32,
    to: f32,
    duration: f32,
    easing: Easing,
    elapsed: f32,
    finished: bool,
}

impl Timing {
    /// An explicit `from` is written to the value immediately, otherwise the
    /// current value is the start.
    pub fn new(value: AnimatedValue, config: TimingConfig) -> Self {
        let from = match config.from {
            Some(from) => {
                value.set(from);
                from
            }
            None => value.get(),
        };
        Self {
            value,
            from,
            to: config.to,
            duration: config.duration,
            easing: config.easing,
            elapsed: 0.0,
            finished: false,
        }
    }
}

impl Animation for Timing {
    fn update(&mut self, delta: f32) -> bool {
        if self.finished {
            return false;
        }

        self.elapsed += delta;
        let diff = self.to - self.from;

        if self.elapsed >= self.duration {
            self.value.set((self.from + (self.easing)(1.0) * diff).trunc());
            self.finished = true;
        } else {
            let progress = (self.elapsed / self.duration).clamp(0.0, 1.0);
            self.value.set((self.from + (self.easing)(progress) * diff).trunc());
        }
        true
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl fmt::Debug for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timing")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("finished", &self.finished)
            .finish()
    }
}
