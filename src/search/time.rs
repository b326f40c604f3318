//! Search limits and time management.
//!
//! Allocation produces an (optimum, maximum) pair: the optimum steers
//! whether another iteration is worth starting, the maximum is a hard
//! in-search abort checked every `TIME_CHECK_MASK + 1` nodes together with
//! the external stop flag.

use crate::board::Color;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Poll cadence: time and stop flag are checked every 2048 nodes.
pub const TIME_CHECK_MASK: u64 = 2047;

const SAFETY_MARGIN_PERCENT: u32 = 15;
const SAFETY_MARGIN_CAP: Duration = Duration::from_millis(500);
const EXPECTED_MOVES_REMAINING: u32 = 40;
const MAXIMUM_FACTOR: u32 = 3;
const PRESSURE_THRESHOLD: Duration = Duration::from_millis(120);
const PRESSURE_OPTIMUM: Duration = Duration::from_millis(8);

/// Everything a `go` command can constrain.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    pub depth: Option<i32>,
    pub movetime: Option<Duration>,
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Duration,
    pub binc: Duration,
    pub movestogo: Option<u32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

impl SearchLimits {
    pub fn depth(depth: i32) -> Self {
        SearchLimits {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        SearchLimits {
            movetime: Some(Duration::from_millis(ms)),
            ..Default::default()
        }
    }

    pub fn infinite() -> Self {
        SearchLimits {
            infinite: true,
            ..Default::default()
        }
    }

    /// Unsatisfiable limits are clamped to the nearest valid value rather
    /// than rejected.
    pub fn clamped(&self) -> Self {
        let mut limits = self.clone();
        if let Some(d) = limits.depth {
            limits.depth = Some(d.max(1));
        }
        if let Some(t) = limits.movetime {
            limits.movetime = Some(t.max(Duration::from_millis(1)));
        }
        if let Some(n) = limits.nodes {
            limits.nodes = Some(n.max(1));
        }
        limits
    }
}

/// Soft and hard budgets; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeAllocation {
    pub optimum: Option<Duration>,
    pub maximum: Option<Duration>,
}

/// Turn the limits into a time budget for the side to move.
pub fn allocate(limits: &SearchLimits, side: Color) -> TimeAllocation {
    if limits.infinite {
        return TimeAllocation::default();
    }

    if let Some(movetime) = limits.movetime {
        return TimeAllocation {
            optimum: Some(movetime),
            maximum: Some(movetime),
        };
    }

    let (time_left, increment) = match side {
        Color::White => (limits.wtime, limits.winc),
        Color::Black => (limits.btime, limits.binc),
    };
    let Some(time_left) = time_left else {
        // depth- or node-limited search
        return TimeAllocation::default();
    };

    let safety = (time_left * SAFETY_MARGIN_PERCENT / 100).min(SAFETY_MARGIN_CAP);
    let usable = time_left.saturating_sub(safety);

    if usable < PRESSURE_THRESHOLD {
        let optimum = PRESSURE_OPTIMUM.min(usable);
        return TimeAllocation {
            optimum: Some(optimum),
            maximum: Some((usable / 2).max(optimum)),
        };
    }

    let optimum = match limits.movestogo {
        Some(mtg) => usable / mtg.max(2) + increment,
        None => usable / EXPECTED_MOVES_REMAINING + increment * 3 / 4,
    };

    let maximum = (optimum * MAXIMUM_FACTOR).min(usable);
    TimeAllocation {
        optimum: Some(optimum.min(maximum)),
        maximum: Some(maximum),
    }
}

/// Per-search clock: polls the hard budget, the node budget and the
/// cooperative stop flag.
pub struct TimeManager {
    start: Instant,
    allocation: TimeAllocation,
    node_limit: Option<u64>,
    stop_flag: Arc<AtomicBool>,
    stopped: bool,
}

impl TimeManager {
    pub fn new(
        allocation: TimeAllocation,
        node_limit: Option<u64>,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        TimeManager {
            start: Instant::now(),
            allocation,
            node_limit,
            stop_flag,
            stopped: false,
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Hard checks; called at node-count poll points.
    pub fn check(&mut self, nodes: u64) {
        if self.stopped {
            return;
        }
        if self.stop_flag.load(Ordering::Relaxed) {
            self.stopped = true;
            return;
        }
        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stopped = true;
            return;
        }
        if let Some(maximum) = self.allocation.maximum
            && self.elapsed() >= maximum
        {
            self.stopped = true;
        }
    }

    #[inline(always)]
    pub fn should_stop(&self) -> bool {
        self.stopped
    }

    /// Between iterations: is the next iteration predicted to fit into the
    /// soft budget? The prediction scales the last iteration's cost by the
    /// branching-factor estimate.
    pub fn should_start_next_iteration(&self, last_iteration: Duration, ebf: f64) -> bool {
        if self.stopped {
            return false;
        }
        let Some(optimum) = self.allocation.optimum else {
            return true;
        };
        let factor = ebf.clamp(1.0, 10.0);
        let predicted = last_iteration.mul_f64(factor);
        self.elapsed() + predicted <= optimum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_movetime_is_both_budgets() {
        let alloc = allocate(&SearchLimits::movetime(250), Color::White);
        assert_eq!(alloc.optimum, Some(Duration::from_millis(250)));
        assert_eq!(alloc.maximum, Some(Duration::from_millis(250)));
    }

    #[test]
    fn infinite_and_depth_only_are_unbounded() {
        assert!(allocate(&SearchLimits::infinite(), Color::White).maximum.is_none());
        assert!(allocate(&SearchLimits::depth(7), Color::Black).optimum.is_none());
    }

    #[test]
    fn sudden_death_keeps_a_reserve() {
        let limits = SearchLimits {
            wtime: Some(Duration::from_secs(60)),
            winc: Duration::from_millis(1000),
            ..Default::default()
        };
        let alloc = allocate(&limits, Color::White);
        let maximum = alloc.maximum.unwrap();
        assert!(maximum < Duration::from_secs(60));
        let optimum = alloc.optimum.unwrap();
        assert!(optimum >= Duration::from_millis(60_000 / 40 as u64 / 2));
        assert!(maximum <= Duration::from_millis(59_500));
    }

    #[test]
    fn movestogo_divides_the_clock() {
        let limits = SearchLimits {
            btime: Some(Duration::from_secs(30)),
            movestogo: Some(10),
            ..Default::default()
        };
        let alloc = allocate(&limits, Color::Black);
        let optimum = alloc.optimum.unwrap();
        assert!(optimum >= Duration::from_millis(2000));
        assert!(optimum <= Duration::from_millis(3500));
    }

    #[test]
    fn time_pressure_collapses_the_budget() {
        let limits = SearchLimits {
            wtime: Some(Duration::from_millis(90)),
            ..Default::default()
        };
        let alloc = allocate(&limits, Color::White);
        assert!(alloc.optimum.unwrap() <= Duration::from_millis(10));
        assert!(alloc.maximum.unwrap() <= Duration::from_millis(90));
    }

    #[test]
    fn external_stop_latches() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut tm = TimeManager::new(TimeAllocation::default(), None, flag.clone());
        tm.check(4096);
        assert!(!tm.should_stop());
        flag.store(true, Ordering::Relaxed);
        tm.check(8192);
        assert!(tm.should_stop());
    }

    #[test]
    fn node_limit_stops_the_search() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut tm = TimeManager::new(TimeAllocation::default(), Some(1000), flag);
        tm.check(999);
        assert!(!tm.should_stop());
        tm.check(1000);
        assert!(tm.should_stop());
    }

    #[test]
    fn clamping_repairs_degenerate_limits() {
        let limits = SearchLimits {
            depth: Some(0),
            nodes: Some(0),
            ..Default::default()
        }
        .clamped();
        assert_eq!(limits.depth, Some(1));
        assert_eq!(limits.nodes, Some(1));
    }
}
