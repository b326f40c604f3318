//! Negamax with alpha-beta, and the quiescence search.

use crate::board::Board;
use crate::eval::pawns::PawnHashTable;
use crate::eval::static_eval;
use crate::moves::execute::{
    generate_legal, make_move, make_null_move, unmake_move, unmake_null_move,
};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::in_check;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::picker::MovePicker;
use crate::search::see::SeeCalculator;
use crate::search::time::{TIME_CHECK_MASK, TimeManager};
use crate::search::tt::{Bound, TranspositionTable};
use crate::search::{DRAW_SCORE, INF, MATE_SCORE, MATE_THRESHOLD, MAX_PLY};
use crate::status::is_search_draw;
use arrayvec::ArrayVec;

// Reverse futility pruning
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Null move pruning
const NMP_MIN_DEPTH: i32 = 4;
const NMP_DEEP_THRESHOLD: i32 = 6;

// Late move reduction
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: usize = 4;
const HISTORY_TRUST: i32 = 512;

// Quiescence
const DELTA_MARGIN: i32 = 200;
const MAX_CHECK_PLY: i32 = 6;

/// Mutable state of one search run: borrowed long-lived tables plus the
/// node counters.
pub(crate) struct SearchWorker<'a> {
    pub tables: &'a MagicTables,
    pub tt: &'a mut TranspositionTable,
    pub see: &'a SeeCalculator,
    pub pawns: &'a PawnHashTable,
    pub ctx: &'a mut SearchContext,
    pub time: &'a mut TimeManager,
    pub nodes: u64,
    pub seldepth: i32,
}

impl SearchWorker<'_> {
    #[inline(always)]
    fn poll(&mut self) {
        if self.nodes & TIME_CHECK_MASK == 0 {
            self.time.check(self.nodes);
        }
    }

    /// Alpha-beta negamax. Returns the side-to-move score and the best
    /// move found (null when none was established).
    pub fn negamax(
        &mut self,
        board: &mut Board,
        depth: i32,
        ply: i32,
        mut alpha: i32,
        beta: i32,
    ) -> (i32, Move) {
        self.nodes += 1;
        self.poll();
        if self.time.should_stop() {
            return (0, Move::NULL);
        }
        self.seldepth = self.seldepth.max(ply);

        // Draw rules come before everything, the transposition table
        // included: a cached mate score must not override a repetition.
        if ply > 0 && is_search_draw(board) {
            return (DRAW_SCORE, Move::NULL);
        }

        if ply as usize >= MAX_PLY - 1 {
            return (static_eval(board, self.pawns), Move::NULL);
        }

        let in_check_now = in_check(board, board.side_to_move(), self.tables);

        if depth <= 0 {
            let score = self.quiescence(board, ply, alpha, beta, 0);
            return (score, Move::NULL);
        }

        // Transposition table
        let hash = board.zobrist();
        let mut tt_move = Move::NULL;
        let mut tt_eval = None;
        if let Some(hit) = self.tt.probe(hash, ply) {
            tt_move = hit.mv;
            tt_eval = hit.eval;
            if ply > 0 && hit.depth as i32 >= depth {
                match hit.bound {
                    Bound::Exact => return (hit.score, hit.mv),
                    Bound::Lower if hit.score >= beta => return (hit.score, hit.mv),
                    Bound::Upper if hit.score <= alpha => return (hit.score, hit.mv),
                    _ => {}
                }
            }
        }

        let static_eval_val = if in_check_now {
            -INF
        } else {
            tt_eval.unwrap_or_else(|| static_eval(board, self.pawns))
        };
        self.ctx.eval_stack[ply as usize] = static_eval_val;

        // Is the eval trending up against two plies ago on this path?
        let improving = !in_check_now
            && ply >= 2
            && self.ctx.eval_stack[ply as usize - 2] != -INF
            && static_eval_val > self.ctx.eval_stack[ply as usize - 2];

        let extension = if in_check_now { 1 } else { 0 };

        // Reverse futility: a static eval still over beta after a
        // depth-scaled margin will not come back down in so few plies.
        if depth < RFP_DEPTH_LIMIT
            && ply > 0
            && !in_check_now
            && beta.abs() < MATE_THRESHOLD
            && static_eval_val - (RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth) >= beta
        {
            return (beta, Move::NULL);
        }

        // Null move pruning: hand the opponent a free move; if the scout
        // still fails high we are safe to cut. Needs non-pawn material
        // (zugzwang) and a static eval already at beta.
        if depth >= NMP_MIN_DEPTH
            && ply > 0
            && !in_check_now
            && beta.abs() < MATE_THRESHOLD
            && board.has_major_pieces(board.side_to_move())
            && static_eval_val >= beta
        {
            let r = if depth > NMP_DEEP_THRESHOLD { 3 } else { 2 };
            let undo = make_null_move(board);
            let (val, _) = self.negamax(board, depth - r - 1, ply + 1, -beta, -beta + 1);
            let score = -val;
            unmake_null_move(board, undo);

            if score >= beta && !self.time.should_stop() && score < MATE_THRESHOLD {
                return (score, Move::NULL);
            }
        }

        let mut picker = MovePicker::new(tt_move, self.ctx.killers(ply as usize), false);

        let mut best_score = -INF;
        let mut best_move = Move::NULL;
        let original_alpha = alpha;
        let mut move_count: usize = 0;

        while let Some(mv) = picker.next(board, self.tables, self.see, &self.ctx.history) {
            let undo = make_move(board, mv);
            let mut score;

            if move_count == 0 {
                let (val, _) =
                    self.negamax(board, depth - 1 + extension, ply + 1, -beta, -alpha);
                score = -val;
            } else {
                // Late move reduction for quiet moves ordered far down the
                // list; a surprising fail-high triggers a re-search.
                let mut r = 0;
                if depth > LMR_MIN_DEPTH
                    && move_count > LMR_MIN_MOVES
                    && !mv.is_capture()
                    && !mv.is_promotion()
                    && !in_check_now
                {
                    r = 1 + depth / 8 + (move_count as i32) / 20;
                    if !improving {
                        r += 1;
                    }
                    if self.ctx.history_score(mv) > HISTORY_TRUST {
                        r -= 1;
                    }
                    if beta - alpha > 1 {
                        r -= 1;
                    }
                    r = r.clamp(0, (depth - 2).max(0));
                }

                let (val, _) = self.negamax(board, depth - 1 - r, ply + 1, -alpha - 1, -alpha);
                score = -val;

                if score > alpha && r > 0 {
                    let (val, _) = self.negamax(board, depth - 1, ply + 1, -alpha - 1, -alpha);
                    score = -val;
                }
                if score > alpha && score < beta {
                    let (val, _) =
                        self.negamax(board, depth - 1 + extension, ply + 1, -beta, -alpha);
                    score = -val;
                }
            }

            unmake_move(board, mv, undo);
            move_count += 1;

            if self.time.should_stop() {
                return (0, Move::NULL);
            }

            // Strictly greater: equal scores keep the earlier move, so the
            // visit order stays deterministic.
            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        self.tt.store(
                            hash,
                            mv,
                            best_score,
                            eval_for_tt(in_check_now, static_eval_val),
                            depth as u8,
                            Bound::Lower,
                            ply,
                        );
                        if !mv.is_capture() && !mv.is_promotion() {
                            self.ctx.update_killer(ply as usize, mv);
                            self.ctx.update_history(mv, depth);
                        }
                        return (best_score, mv);
                    }
                }
            }
        }

        if move_count == 0 {
            return if in_check_now {
                (-MATE_SCORE + ply, Move::NULL)
            } else {
                (DRAW_SCORE, Move::NULL)
            };
        }

        let (bound, stored_move) = if alpha > original_alpha {
            (Bound::Exact, best_move)
        } else {
            (Bound::Upper, Move::NULL)
        };
        self.tt.store(
            hash,
            stored_move,
            best_score,
            eval_for_tt(in_check_now, static_eval_val),
            depth as u8,
            bound,
            ply,
        );

        (best_score, best_move)
    }

    /// Resolve captures (and checks) past the horizon.
    pub fn quiescence(
        &mut self,
        board: &mut Board,
        ply: i32,
        mut alpha: i32,
        beta: i32,
        check_ply: i32,
    ) -> i32 {
        self.nodes += 1;
        self.poll();
        if self.time.should_stop() {
            return 0;
        }
        self.seldepth = self.seldepth.max(ply);

        if is_search_draw(board) {
            return DRAW_SCORE;
        }
        if ply as usize >= MAX_PLY - 1 {
            return static_eval(board, self.pawns);
        }

        let hash = board.zobrist();
        let mut tt_move = Move::NULL;
        let mut tt_eval = None;
        if let Some(hit) = self.tt.probe(hash, ply) {
            tt_move = hit.mv;
            tt_eval = hit.eval;
            match hit.bound {
                Bound::Exact => return hit.score,
                Bound::Lower if hit.score >= beta => return hit.score,
                Bound::Upper if hit.score <= alpha => return hit.score,
                _ => {}
            }
        }

        let in_check_now = in_check(board, board.side_to_move(), self.tables);

        if in_check_now {
            // An uncapped check sequence would explode; beyond the cap the
            // static eval stands in.
            if check_ply >= MAX_CHECK_PLY {
                return static_eval(board, self.pawns);
            }
            return self.quiescence_evasions(board, ply, alpha, beta, check_ply);
        }

        // Stand pat
        let stand_pat = tt_eval.unwrap_or_else(|| static_eval(board, self.pawns));
        if stand_pat >= beta {
            self.tt.store(
                hash,
                Move::NULL,
                stand_pat,
                Some(stand_pat),
                0,
                Bound::Lower,
                ply,
            );
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        let original_alpha = alpha;
        let mut best_move = Move::NULL;

        // captures-only mode never reaches the quiet stage, so the history
        // table is only along for the signature
        let mut picker = MovePicker::new(tt_move, [Move::NULL; 2], true);

        while let Some(mv) = picker.next(board, self.tables, self.see, &self.ctx.history) {
            // Only queen promotions among the quiet promotions
            if mv.is_promotion()
                && !mv.is_capture()
                && mv.promotion_piece() != Some(crate::board::Piece::Queen)
            {
                continue;
            }

            let is_promo = mv.is_promotion();
            let is_ep = mv.is_en_passant();

            // Losing captures are skipped outright
            if !is_promo && !is_ep && !self.see.see_ge(board, mv, 0, self.tables) {
                continue;
            }

            // Delta pruning: even winning the victim cannot lift a
            // hopeless stand pat (promotions and ep are exempt)
            if !is_promo && !is_ep {
                let captured_value = board
                    .piece_type_at(mv.to())
                    .map_or(0, |p| p.value());
                if stand_pat + captured_value + DELTA_MARGIN < alpha {
                    continue;
                }
            }

            let undo = make_move(board, mv);
            let score = -self.quiescence(board, ply + 1, -beta, -alpha, check_ply);
            unmake_move(board, mv, undo);

            if self.time.should_stop() {
                return 0;
            }

            if score >= beta {
                self.tt
                    .store(hash, mv, score, Some(stand_pat), 0, Bound::Lower, ply);
                return score;
            }
            if score > alpha {
                alpha = score;
                best_move = mv;
            }
        }

        let bound = if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt
            .store(hash, best_move, alpha, Some(stand_pat), 0, bound, ply);
        alpha
    }

    /// In-check quiescence: every legal evasion, king moves first. There
    /// is no standing pat while in check.
    fn quiescence_evasions(
        &mut self,
        board: &mut Board,
        ply: i32,
        mut alpha: i32,
        beta: i32,
        check_ply: i32,
    ) -> i32 {
        use crate::search::ordering::mvv_lva_score;

        let hash = board.zobrist();
        let king_from = board.king_square(board.side_to_move());

        let mut evasions: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(board, self.tables, &mut evasions, &mut scratch);

        if evasions.is_empty() {
            return -MATE_SCORE + ply;
        }

        // Escape routes first, then the most forcing recaptures.
        evasions.sort_by_key(|mv| {
            let king_move = if mv.from() == king_from { 0 } else { 1 };
            (king_move, -mvv_lva_score(*mv, board))
        });

        let original_alpha = alpha;
        let mut best_score = -INF;
        let mut best_move = Move::NULL;

        for &mv in evasions.iter() {
            let undo = make_move(board, mv);
            let score = -self.quiescence(board, ply + 1, -beta, -alpha, check_ply + 1);
            unmake_move(board, mv, undo);

            if self.time.should_stop() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        self.tt
                            .store(hash, mv, score, None, 0, Bound::Lower, ply);
                        return score;
                    }
                }
            }
        }

        let bound = if alpha > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        let stored_move = if bound == Bound::Exact {
            best_move
        } else {
            Move::NULL
        };
        self.tt.store(hash, stored_move, best_score, None, 0, bound, ply);
        best_score
    }
}

#[inline(always)]
fn eval_for_tt(in_check_now: bool, static_eval_val: i32) -> Option<i32> {
    if in_check_now {
        None
    } else {
        Some(static_eval_val)
    }
}
