use std::fmt;

use super::Animation;

/// Runs children strictly in order. Stopping it early means the remaining
/// children never start.
pub struct Sequence {
    animations: Vec<Box<dyn Animation>>,
    index: usize,
    finished: bool,
}

impl Sequence {
    pub fn new(animations: impl IntoIterator<Item = Box<dyn Animation>>) -> Self {
        Self {
            animations: animations.into_iter().collect(),
            index: 0,
            finished: false,
        }
    }
}

impl Animation for Sequence {
    fn update(&mut self, delta: f32) -> bool {
        if self.finished {
            return false;
        }

        let Some(current) = self.animations.get_mut(self.index) else {
            self.finished = true;
            return true;
        };
        current.update(delta);
        if current.is_finished() {
            self.index += 1;
            if self.index == self.animations.len() {
                self.finished = true;
            }
        }
        true
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.animations.clear();
        self.finished = true;
    }
}

/// Runs children together; finished once every child has finished.
/// Children are never stopped early.
pub struct Parallel {
    animations: Vec<Box<dyn Animation>>,
    finished: bool,
}

impl Parallel {
    pub fn new(animations: impl IntoIterator<Item = Box<dyn Animation>>) -> Self {
        Self {
            animations: animations.into_iter().collect(),
            finished: false,
        }
    }
}

impl Animation for Parallel {
    fn update(&mut self, delta: f32) -> bool {
        if self.finished {
            return false;
        }

        let mut running = false;
        for animation in self.animations.iter_mut().filter(|a| !a.is_finished()) {
            animation.update(delta);
            running |= !animation.is_finished();
        }
        if !running {
            self.finished = true;
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

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("len", &self.animations.len())
            .field("index", &self.index)
            .field("finished", &self.finished)
            .finish()
    }
}

impl fmt::Debug for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parallel")
            .field("len", &self.animations.len())
            .field("finished", &self.finished)
            .finish()
    }
}
