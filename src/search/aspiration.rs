//! Aspiration windows for iterative deepening.

use crate::search::INF;

/// Initial half-width in centipawns.
pub const INITIAL_DELTA: i32 = 16;
/// Linear growth divisor (delta += delta / 3, about 1.33x).
pub const GROWTH_DIVISOR: i32 = 3;
/// Re-search attempts before falling back to an infinite window.
pub const MAX_ATTEMPTS: u32 = 5;
/// Below this depth the window is always infinite.
pub const MIN_DEPTH: i32 = 4;
/// Deeper iterations get slightly wider windows (delta += depth / 2).
pub const DEPTH_ADJUSTMENT_FACTOR: i32 = 2;

/// How delta grows on repeated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowGrowth {
    /// delta += delta / 3
    Linear,
    /// delta *= 3/2
    Moderate,
    /// delta *= 2^attempts, capped at three doublings
    Exponential,
    /// Exponential for the first two failures, then moderate.
    #[default]
    Adaptive,
}

#[derive(Debug, Clone, Copy)]
pub struct AspirationWindow {
    pub alpha: i32,
    pub beta: i32,
    pub delta: i32,
    pub attempts: u32,
    pub failed_low: bool,
    pub failed_high: bool,
}

impl Default for AspirationWindow {
    fn default() -> Self {
        AspirationWindow {
            alpha: -INF,
            beta: INF,
            delta: INITIAL_DELTA,
            attempts: 0,
            failed_low: false,
            failed_high: false,
        }
    }
}

impl AspirationWindow {
    pub fn is_infinite(&self) -> bool {
        self.alpha == -INF && self.beta == INF
    }

    pub fn make_infinite(&mut self) {
        self.alpha = -INF;
        self.beta = INF;
    }
}

/// Window for a new iteration, centered on the previous score.
pub fn initial_window(previous_score: i32, depth: i32) -> AspirationWindow {
    let mut window = AspirationWindow::default();
    if depth < MIN_DEPTH {
        return window;
    }

    let delta = INITIAL_DELTA + depth / DEPTH_ADJUSTMENT_FACTOR;
    window.alpha = (previous_score - delta).max(-INF);
    window.beta = (previous_score + delta).min(INF);
    window.delta = delta;
    window
}

/// Widen after a failure. Asymmetric: the failing bound moves a full delta
/// away from the score, the other bound stays within half a delta so a
/// re-search keeps cutting.
pub fn widen_window(
    window: &AspirationWindow,
    score: i32,
    failed_high: bool,
    growth: WindowGrowth,
) -> AspirationWindow {
    let mut next = *window;
    next.attempts += 1;

    if next.attempts >= MAX_ATTEMPTS {
        next.make_infinite();
        return next;
    }

    next.delta = match growth {
        WindowGrowth::Linear => next.delta + next.delta / GROWTH_DIVISOR,
        WindowGrowth::Moderate => next.delta * 3 / 2,
        WindowGrowth::Exponential => {
            let doublings = next.attempts.min(3);
            next.delta << doublings
        }
        WindowGrowth::Adaptive => {
            if next.attempts <= 2 {
                next.delta << next.attempts
            } else {
                next.delta * 3 / 2
            }
        }
    };

    if failed_high {
        next.failed_high = true;
        next.beta = (score + next.delta).min(INF);
        next.alpha = (score - next.delta / 2).max(-INF);
    } else {
        next.failed_low = true;
        next.alpha = (score - next.delta).max(-INF);
        next.beta = (score + next.delta / 2).min(INF);
    }

    next
}
