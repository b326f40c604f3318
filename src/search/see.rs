//! Static exchange evaluation.
//!
//! Swap-list algorithm over a simulated occupancy: both sides keep
//! capturing on the target square with their least valuable attacker,
//! sliding attackers revealed by a departing piece are re-scanned, and the
//! gains array is collapsed from the tail with each side free to stand
//! down. Results are cached in a small direct-mapped table keyed by
//! position-hash ^ mixed move bits; the cache is purely advisory.

use crate::board::{Board, Color, Piece};
use crate::bitboard::BitboardExt;
use crate::moves::king::KING_ATTACKS;
use crate::moves::knight::KNIGHT_ATTACKS;
use crate::moves::magic::MagicTables;
use crate::moves::pawn::pawn_attacks;
use crate::moves::types::Move;
use std::cell::Cell;

/// Exchange values. Deliberately not the evaluator's material values: the
/// ordering-oriented scale (Q=950, K huge) is a separate tuning target.
const SEE_VALUES: [i32; 6] = [100, 320, 330, 500, 950, 10000];

#[inline(always)]
fn piece_value(piece: Piece) -> i32 {
    SEE_VALUES[piece as usize]
}

const MAX_SEE_DEPTH: usize = 32;

const SEE_CACHE_SIZE: usize = 16384; // power of two
const SEE_CACHE_MASK: usize = SEE_CACHE_SIZE - 1;

struct SeeCacheEntry {
    key: Cell<u64>,
    value: Cell<i32>,
    age: Cell<u8>,
}

/// The SEE calculator: a pure function plus its advisory cache.
pub struct SeeCalculator {
    cache: Vec<SeeCacheEntry>,
    current_age: Cell<u8>,
}

impl Default for SeeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeeCalculator {
    pub fn new() -> Self {
        let mut cache = Vec::with_capacity(SEE_CACHE_SIZE);
        for _ in 0..SEE_CACHE_SIZE {
            cache.push(SeeCacheEntry {
                key: Cell::new(u64::MAX),
                value: Cell::new(0),
                age: Cell::new(0),
            });
        }
        SeeCalculator {
            cache,
            current_age: Cell::new(0),
        }
    }

    pub fn clear_cache(&self) {
        for entry in &self.cache {
            entry.key.set(u64::MAX);
            entry.age.set(0);
        }
        self.current_age.set(0);
    }

    /// Advance the cache age; stale entries become preferred victims.
    pub fn age_cache(&self) {
        self.current_age
            .set(self.current_age.get().wrapping_add(1));
    }

    #[inline(always)]
    fn cache_key(board: &Board, mv: Move) -> u64 {
        board.zobrist() ^ (mv.bits() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Net material outcome of the exchange started by `mv`, in exchange
    /// values, from the mover's point of view. Non-captures (that are not
    /// promotions) return 0.
    pub fn see(&self, board: &Board, mv: Move, tables: &MagicTables) -> i32 {
        if !mv.is_capture() && !mv.is_promotion() {
            return 0;
        }

        let key = Self::cache_key(board, mv);
        let entry = &self.cache[(key as usize) & SEE_CACHE_MASK];
        if entry.key.get() == key {
            entry.age.set(self.current_age.get());
            return entry.value.get();
        }

        let value = self.compute(board, mv, tables);

        entry.key.set(key);
        entry.value.set(value);
        entry.age.set(self.current_age.get());
        value
    }

    /// Pruning interface: `see(move) >= threshold`.
    #[inline]
    pub fn see_ge(&self, board: &Board, mv: Move, threshold: i32, tables: &MagicTables) -> bool {
        self.see(board, mv, tables) >= threshold
    }

    fn compute(&self, board: &Board, mv: Move, tables: &MagicTables) -> i32 {
        let from = mv.from().index();
        let to = mv.to().index();
        let mover = board.side_to_move();

        let moving_piece = match board.piece_type_at(mv.from()) {
            Some(p) => p,
            None => return 0,
        };

        // First victim: the piece on the target square (the pawn behind it
        // for en passant, nothing for a quiet promotion).
        let mut gains = [0i32; MAX_SEE_DEPTH];
        let mut first_gain = if mv.is_en_passant() {
            piece_value(Piece::Pawn)
        } else {
            board.piece_type_at(mv.to()).map_or(0, piece_value)
        };

        // Promotion: the mover turns into the promoted piece, and the
        // promotion gain joins the first exchange step.
        let mut next_victim = moving_piece;
        if let Some(promo) = mv.promotion_piece() {
            first_gain += piece_value(promo) - piece_value(Piece::Pawn);
            next_victim = promo;
        }
        gains[0] = first_gain;

        // Simulated occupancy: the mover has left its square, and the en
        // passant victim its own.
        let mut occ = board.occupied() & !(1u64 << from);
        if mv.is_en_passant() {
            let cap_sq = match mover {
                Color::White => to - 8,
                Color::Black => to + 8,
            };
            occ &= !(1u64 << cap_sq);
        }

        let mut attackers = attackers_to(board, to, occ, tables) & occ;
        let mut stm = mover.opposite();
        let mut depth = 0usize;

        loop {
            let side_attackers = attackers & board.occupancy(stm) & occ;
            if side_attackers == 0 {
                break;
            }

            let (att_piece, att_sq) = least_valuable_attacker(board, side_attackers, stm);

            // A king may only recapture when nothing can take it back.
            if att_piece == Piece::King
                && attackers & board.occupancy(stm.opposite()) & occ != 0
            {
                break;
            }

            depth += 1;
            if depth >= MAX_SEE_DEPTH {
                break;
            }
            gains[depth] = piece_value(next_victim) - gains[depth - 1];

            next_victim = att_piece;
            occ &= !(1u64 << att_sq);

            // Re-scan for x-ray attackers uncovered behind a departed
            // pawn or slider; knights and kings never stand on the ray
            // they attack along.
            if matches!(
                att_piece,
                Piece::Pawn | Piece::Bishop | Piece::Rook | Piece::Queen
            ) {
                attackers = attackers_to(board, to, occ, tables) & occ;
            } else {
                attackers &= occ;
            }

            stm = stm.opposite();
        }

        // Collapse from the tail: each side may decline to continue.
        while depth > 0 {
            gains[depth - 1] = -std::cmp::max(-gains[depth - 1], gains[depth]);
            depth -= 1;
        }
        gains[0]
    }
}

/// All pieces of both sides attacking `square` over the given occupancy.
fn attackers_to(board: &Board, square: u8, occ: u64, tables: &MagicTables) -> u64 {
    let sq = square as usize;

    // a white pawn attacks this square iff a black pawn on it would attack
    // the white pawn's square
    let white_pawns =
        pawn_attacks(square, Color::Black) & board.pieces(Piece::Pawn, Color::White);
    let black_pawns =
        pawn_attacks(square, Color::White) & board.pieces(Piece::Pawn, Color::Black);

    let knights = KNIGHT_ATTACKS[sq] & board.pieces_of_type(Piece::Knight);
    let kings = KING_ATTACKS[sq] & board.pieces_of_type(Piece::King);

    let bishops_queens = board.pieces_of_type(Piece::Bishop) | board.pieces_of_type(Piece::Queen);
    let rooks_queens = board.pieces_of_type(Piece::Rook) | board.pieces_of_type(Piece::Queen);
    let diag = tables.bishop.get_attacks(sq, occ) & bishops_queens;
    let orth = tables.rook.get_attacks(sq, occ) & rooks_queens;

    white_pawns | black_pawns | knights | kings | diag | orth
}

/// Least valuable piece of `side` among `attackers`.
fn least_valuable_attacker(board: &Board, attackers: u64, side: Color) -> (Piece, u8) {
    for piece in [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ] {
        let subset = attackers & board.pieces(piece, side);
        if subset != 0 {
            return (piece, subset.lsb());
        }
    }
    unreachable!("least_valuable_attacker called with no attackers")
}
