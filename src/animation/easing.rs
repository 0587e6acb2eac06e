//! Easing curves: progress in [0, 1] to eased progress.

use std::f32::consts::PI;
use std::rc::Rc;

pub type Easing = Rc<dyn Fn(f32) -> f32>;

pub fn linear() -> Easing {
    Rc::new(|t| t)
}

/// Ease in, like CSS `ease-in`.
pub fn ease() -> Easing {
    bezier(0.42, 0.0, 1.0, 1.0)
}

pub fn quad() -> Easing {
    Rc::new(|t| t * t)
}

pub fn cubic() -> Easing {
    Rc::new(|t| t * t * t)
}

pub fn poly(n: f32) -> Easing {
    Rc::new(move |t| t.powf(n))
}

pub fn sin() -> Easing {
    Rc::new(|t| 1.0 - (t * PI / 2.0).cos())
}

pub fn circle() -> Easing {
    Rc::new(|t| 1.0 - (1.0 - t * t).max(0.0).sqrt())
}

pub fn exp() -> Easing {
    Rc::new(|t| 2f32.powf(10.0 * (t - 1.0)))
}

/// Spring-like overshoot; `bounciness` 1 oscillates once.
pub fn elastic(bounciness: f32) -> Easing {
    let p = bounciness * PI;
    Rc::new(move |t| 1.0 - (t * PI / 2.0).cos().powi(3) * (t * p).cos())
}

/// Pulls back before moving forward. 1.70158 gives a 10% overshoot.
pub fn back(s: f32) -> Easing {
    Rc::new(move |t| t * t * ((s + 1.0) * t - s))
}

pub fn bounce() -> Easing {
    Rc::new(|t| {
        if t < 1.0 / 2.75 {
            7.5625 * t * t
        } else if t < 2.0 / 2.75 {
            let t = t - 1.5 / 2.75;
            7.5625 * t * t + 0.75
        } else if t < 2.5 / 2.75 {
            let t = t - 2.25 / 2.75;
            7.5625 * t * t + 0.9375
        } else {
            let t = t - 2.625 / 2.75;
            7.5625 * t * t + 0.984375
        }
    })
}

pub fn in_(easing: Easing) -> Easing {
    easing
}

pub fn out(easing: Easing) -> Easing {
    Rc::new(move |t| 1.0 - easing(1.0 - t))
}

/// Runs `easing` forwards for the first half and backwards for the second.
pub fn in_out(easing: Easing) -> Easing {
    Rc::new(move |t| {
        if t < 0.5 {
            easing(t * 2.0) / 2.0
        } else {
            1.0 - easing((1.0 - t) * 2.0) / 2.0
        }
    })
}

/// Cubic bezier through (0,0), (x1,y1), (x2,y2), (1,1).
pub fn bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Easing {
    let curve = Bezier::new(x1, y1, x2, y2);
    Rc::new(move |t| curve.solve(t))
}

// =============================================================================
// BEZIER SOLVER
// =============================================================================

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f32 = 0.001;
const SUBDIVISION_PRECISION: f32 = 0.000_000_1;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

struct Bezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Bezier {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    fn at(t: f32, a1: f32, a2: f32) -> f32 {
        let a = 1.0 - 3.0 * a2 + 3.0 * a1;
        let b = 3.0 * a2 - 6.0 * a1;
        let c = 3.0 * a1;
        ((a * t + b) * t + c) * t
    }

    fn slope(t: f32, a1: f32, a2: f32) -> f32 {
        let a = 1.0 - 3.0 * a2 + 3.0 * a1;
        let b = 3.0 * a2 - 6.0 * a1;
        let c = 3.0 * a1;
        3.0 * a * t * t + 2.0 * b * t + c
    }

    fn t_for_x(&self, x: f32) -> f32 {
        let mut guess = x;
        for _ in 0..NEWTON_ITERATIONS {
            let slope = Self::slope(guess, self.x1, self.x2);
            if slope.abs() < NEWTON_MIN_SLOPE {
                break;
            }
            guess -= (Self::at(guess, self.x1, self.x2) - x) / slope;
        }
        if (Self::at(guess, self.x1, self.x2) - x).abs() <= SUBDIVISION_PRECISION * 100.0 {
            return guess;
        }

        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        let mut t = x;
        for _ in 0..SUBDIVISION_MAX_ITERATIONS * 2 {
            let current = Self::at(t, self.x1, self.x2) - x;
            if current.abs() <= SUBDIVISION_PRECISION {
                break;
            }
            if current > 0.0 {
                hi = t;
            } else {
                lo = t;
            }
            t = (lo + hi) / 2.0;
        }
        t
    }

    fn solve(&self, x: f32) -> f32 {
        if self.x1 == self.y1 && self.x2 == self.y2 {
            return x;
        }
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        Self::at(self.t_for_x(x), self.y1, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_endpoints() {
        for easing in [linear(), ease(), quad(), cubic(), sin(), circle(), bounce(), back(1.70158)] {
            assert!(close(easing(0.0), 0.0));
            assert!(close(easing(1.0), 1.0));
        }
        assert!(close(exp()(1.0), 1.0));
        assert!(close(elastic(1.0)(1.0), 1.0));
    }

    #[test]
    fn test_out_and_in_out() {
        let out_quad = out(quad());
        assert!(close(out_quad(0.5), 0.75));

        let in_out_quad = in_out(quad());
        assert!(close(in_out_quad(0.25), 0.125));
        assert!(close(in_out_quad(0.5), 0.5));
        assert!(close(in_out_quad(0.75), 0.875));
    }

    #[test]
    fn test_linear_bezier_is_identity() {
        let b = bezier(0.25, 0.25, 0.75, 0.75);
        assert!(close(b(0.3), 0.3));
    }

    #[test]
    fn test_bezier_is_monotonic() {
        let b = ease();
        let mut last = 0.0;
        for i in 1..=20 {
            let v = b(i as f32 / 20.0);
            assert!(v >= last);
            last = v;
        }
        assert!(b(0.5) < 0.5);
    }
}
