//! Static evaluation: tapered material + piece-square scores maintained
//! incrementally by the board, a cached pawn-structure term, and tempo.

pub mod pawns;
pub mod psqt;

use crate::board::{Board, Color};
use pawns::PawnHashTable;

const TEMPO_BONUS: i32 = 10;

/// Evaluation from White's point of view.
///
/// Color-flip antisymmetric: mirroring the board vertically and swapping
/// the colors negates the result exactly.
pub fn evaluate_absolute(board: &Board, pawn_cache: &PawnHashTable) -> i32 {
    let (pst_mg, pst_eg) = board.pst();
    let (pawn_mg, pawn_eg) = pawn_cache.probe_or_compute(board);

    let mg = pst_mg + pawn_mg;
    let eg = pst_eg + pawn_eg;

    let phase = board.phase();
    let mut score = (mg * phase + eg * (psqt::TOTAL_PHASE - phase)) / psqt::TOTAL_PHASE;

    score += match board.side_to_move() {
        Color::White => TEMPO_BONUS,
        Color::Black => -TEMPO_BONUS,
    };

    score
}

/// Evaluation from the side to move's point of view (the search contract).
#[inline]
pub fn static_eval(board: &Board, pawn_cache: &PawnHashTable) -> i32 {
    let absolute = evaluate_absolute(board, pawn_cache);
    match board.side_to_move() {
        Color::White => absolute,
        Color::Black => -absolute,
    }
}
