pub mod aspiration;
pub mod context;
pub mod info;
pub mod ordering;
pub mod picker;
pub mod search;
pub mod see;
pub mod time;
pub mod tt;

use crate::board::Board;
use crate::eval::pawns::PawnHashTable;
use crate::moves::execute::{generate_legal, make_move, unmake_move};
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use aspiration::WindowGrowth;
use context::SearchContext;
use info::{IterationInfo, ProgressSink};
use search::SearchWorker;
use see::SeeCalculator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use time::{SearchLimits, TimeManager};
use tracing::debug;
use tt::TranspositionTable;

/// Score bounds. Scores `s` with `|s| > MATE_THRESHOLD` encode mate in
/// `MATE_SCORE - |s|` plies.
pub const INF: i32 = 32001;
pub const MATE_SCORE: i32 = 32000;
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 100;
pub const DRAW_SCORE: i32 = 0;

pub const MAX_PLY: usize = 128;
const MAX_DEPTH: i32 = 64;

/// Window of past iterations feeding the weighted branching factor.
const EBF_WINDOW: usize = 4;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Move,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
    pub elapsed: Duration,
}

struct IterationRecord {
    depth: i32,
    nodes: u64,
}

/// The search engine: owns the transposition table, the SEE and pawn
/// caches and the heuristic state, all persistent across searches until
/// `new_game`.
pub struct Searcher {
    tt: TranspositionTable,
    see: SeeCalculator,
    pawns: PawnHashTable,
    ctx: SearchContext,
    stop: Arc<AtomicBool>,
    growth: WindowGrowth,
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(TranspositionTable::DEFAULT_SIZE_MB)
    }
}

impl Searcher {
    pub fn new(hash_mb: usize) -> Self {
        Searcher {
            tt: TranspositionTable::new(hash_mb),
            see: SeeCalculator::new(),
            pawns: PawnHashTable::new(),
            ctx: SearchContext::new(),
            stop: Arc::new(AtomicBool::new(false)),
            growth: WindowGrowth::default(),
        }
    }

    /// Cooperative stop flag; setting it aborts the running search at the
    /// next poll point.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Forget everything learned: TT, SEE cache, pawn cache, killers and
    /// history.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.see.clear_cache();
        self.pawns.clear();
        self.ctx.clear();
    }

    pub fn resize_tt(&mut self, size_mb: usize) {
        self.tt.resize(size_mb);
    }

    pub fn clear_tt(&mut self) {
        self.tt.clear();
    }

    pub fn set_tt_enabled(&mut self, enabled: bool) {
        self.tt.set_enabled(enabled);
    }

    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Iterative deepening under the given limits. Always returns a move
    /// for a position with at least one legal move.
    pub fn search(
        &mut self,
        board: &mut Board,
        tables: &MagicTables,
        limits: &SearchLimits,
        sink: &mut dyn ProgressSink,
    ) -> SearchResult {
        let limits = limits.clamped();
        self.stop.store(false, Ordering::Relaxed);
        self.tt.new_search();
        self.see.age_cache();

        let allocation = time::allocate(&limits, board.side_to_move());
        let mut timer = TimeManager::new(allocation, limits.nodes, self.stop.clone());
        let max_depth = limits.depth.unwrap_or(MAX_DEPTH).min(MAX_PLY as i32 - 1);

        // The fallback: never a null best move for a legal position.
        let mut legal = Vec::with_capacity(64);
        let mut scratch = Vec::with_capacity(256);
        generate_legal(board, tables, &mut legal, &mut scratch);
        let mut best_move = legal.first().copied().unwrap_or(Move::NULL);
        let mut best_score = 0;
        let mut completed_depth = 0;

        let mut total_nodes: u64 = 0;
        let mut prev_score = 0;
        let mut stability: u32 = 0;
        let mut records: Vec<IterationRecord> = Vec::new();
        let mut last_iteration_time = Duration::ZERO;

        for depth in 1..=max_depth {
            if depth > 1 {
                let ebf = weighted_ebf(&records).unwrap_or(2.5);
                if !timer.should_start_next_iteration(last_iteration_time, ebf) {
                    break;
                }
            }

            self.ctx.decay_history();
            let iteration_start = Instant::now();
            let nodes_before = total_nodes;

            let mut window = aspiration::initial_window(prev_score, depth);
            let mut iteration: Option<(i32, Move)> = None;

            loop {
                // the node counter carries across iterations so the node
                // budget and the poll cadence see the whole search
                let mut worker = SearchWorker {
                    tables,
                    tt: &mut self.tt,
                    see: &self.see,
                    pawns: &self.pawns,
                    ctx: &mut self.ctx,
                    time: &mut timer,
                    nodes: total_nodes,
                    seldepth: 0,
                };
                let (score, mv) = worker.negamax(board, depth, 0, window.alpha, window.beta);
                total_nodes = worker.nodes;
                let seldepth = worker.seldepth;

                if timer.should_stop() {
                    break;
                }
                if score <= window.alpha {
                    window = aspiration::widen_window(&window, score, false, self.growth);
                    continue;
                }
                if score >= window.beta {
                    window = aspiration::widen_window(&window, score, true, self.growth);
                    continue;
                }

                iteration = Some((score, mv));

                let elapsed = timer.elapsed();
                let iteration_nodes = total_nodes - nodes_before;
                let branching_factor = records
                    .last()
                    .filter(|r| r.nodes > 0)
                    .map(|r| iteration_nodes as f64 / r.nodes as f64)
                    .unwrap_or(0.0);

                let changed = mv != best_move && !mv.is_null();
                stability = if changed { 0 } else { stability + 1 };

                records.push(IterationRecord {
                    depth,
                    nodes: iteration_nodes,
                });

                let info = IterationInfo {
                    depth,
                    seldepth,
                    score,
                    best_move: mv,
                    iteration_nodes,
                    total_nodes,
                    elapsed,
                    nps: nodes_per_second(total_nodes, elapsed),
                    hashfull: self.tt.hashfull(),
                    best_move_changed: changed,
                    stability,
                    branching_factor,
                    weighted_ebf: weighted_ebf(&records).unwrap_or(0.0),
                    pv: self.extract_pv(board, tables, depth),
                };
                debug!(
                    depth,
                    score,
                    nodes = total_nodes,
                    best = %mv,
                    "iteration complete"
                );
                sink.on_iteration(&info);
                break;
            }

            let Some((score, mv)) = iteration else {
                // ran out of time mid-iteration; the previous depth stands
                break;
            };

            if !mv.is_null() {
                best_move = mv;
            }
            best_score = score;
            prev_score = score;
            completed_depth = depth;
            last_iteration_time = iteration_start.elapsed();

            if score.abs() >= MATE_THRESHOLD {
                break;
            }
        }

        SearchResult {
            best_move,
            score: best_score,
            depth: completed_depth,
            nodes: total_nodes,
            elapsed: timer.elapsed(),
        }
    }

    /// Principal variation: follow TT best moves as long as they are legal
    /// and the line stays acyclic.
    fn extract_pv(&self, board: &mut Board, tables: &MagicTables, max_len: i32) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut undos = Vec::new();

        for _ in 0..max_len.max(1) {
            let Some(hit) = self.tt.probe(board.zobrist(), 0) else {
                break;
            };
            if hit.mv.is_null() {
                break;
            }

            let mut legal = Vec::with_capacity(64);
            let mut scratch = Vec::with_capacity(256);
            generate_legal(board, tables, &mut legal, &mut scratch);
            if !legal.contains(&hit.mv) {
                break;
            }

            let undo = make_move(board, hit.mv);
            pv.push(hit.mv);
            undos.push(undo);

            if board.is_threefold() {
                break;
            }
        }

        for (mv, undo) in pv.iter().rev().zip(undos.into_iter().rev()) {
            unmake_move(board, *mv, undo);
        }
        pv
    }
}

fn nodes_per_second(nodes: u64, elapsed: Duration) -> u64 {
    let micros = elapsed.as_micros().max(1);
    ((nodes as u128) * 1_000_000 / micros) as u64
}

/// Branching factor averaged over the last few iterations, weighted by
/// depth so deeper (more representative) iterations dominate.
fn weighted_ebf(records: &[IterationRecord]) -> Option<f64> {
    if records.len() < 2 {
        return None;
    }
    let start = records.len().saturating_sub(EBF_WINDOW + 1);
    let window = &records[start..];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for pair in window.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if prev.nodes == 0 {
            continue;
        }
        let bf = cur.nodes as f64 / prev.nodes as f64;
        let weight = cur.depth as f64;
        weighted_sum += bf * weight;
        weight_total += weight;
    }
    (weight_total > 0.0).then(|| weighted_sum / weight_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_ebf_needs_two_iterations() {
        let records = vec![IterationRecord { depth: 1, nodes: 20 }];
        assert!(weighted_ebf(&records).is_none());
    }

    #[test]
    fn weighted_ebf_prefers_recent_depths() {
        let records: Vec<IterationRecord> = (1..=6)
            .map(|d| IterationRecord {
                depth: d,
                nodes: 10u64.pow(d as u32),
            })
            .collect();
        // every step multiplies nodes by 10
        let ebf = weighted_ebf(&records).unwrap();
        assert!((ebf - 10.0).abs() < 1e-9);
    }
}
