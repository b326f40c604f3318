use crate::board::castle_bits::*;
use crate::board::{Board, Color, EMPTY_SQ, Material, Piece};
use crate::hash::zobrist::{ep_square_is_capturable, xor_castling_rights_delta, zobrist_keys};
use crate::moves::magic::MagicTables;
use crate::moves::movegen::generate_pseudo_legal;
use crate::moves::square_control::{in_check, is_legal_castling};
use crate::moves::types::{Move, MoveBuffer};
use crate::square::Square;

/// Castling rook from/to squares by king destination index.
#[inline(always)]
fn rook_castle_squares(king_to_idx: u8) -> Option<(u8, u8)> {
    match king_to_idx {
        6 => Some((7, 5)),    // White O-O
        2 => Some((0, 3)),    // White O-O-O
        62 => Some((63, 61)), // Black O-O
        58 => Some((56, 59)), // Black O-O-O
        _ => None,
    }
}

#[inline(always)]
fn rights_mask_to_clear_for_rook(color: Color, rook_sq: u8) -> u8 {
    match (color, rook_sq) {
        (Color::White, 0) => CASTLE_WQ,  // a1
        (Color::White, 7) => CASTLE_WK,  // h1
        (Color::Black, 56) => CASTLE_BQ, // a8
        (Color::Black, 63) => CASTLE_BK, // h8
        _ => 0,
    }
}

/// Everything needed to restore the position exactly. The hashes, material
/// and piece-square scores are snapshots, so unmaking restores them
/// verbatim instead of replaying the incremental updates in reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undo {
    pub captured: Option<(Color, Piece, Square)>,
    pub prev_castling_rights: u8,
    pub prev_en_passant: Option<Square>,
    pub prev_halfmove_clock: u32,
    pub prev_fullmove_number: u32,
    pub prev_zobrist: u64,
    pub prev_pawn_zobrist: u64,
    pub prev_material: Material,
    pub prev_pst: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullUndo {
    pub prev_en_passant: Option<Square>,
    pub prev_halfmove_clock: u32,
    pub prev_zobrist: u64,
}

/// Apply a legal move. Supplying an illegal move breaks the caller
/// contract; the move generator is responsible for filtering.
pub fn make_move(board: &mut Board, mv: Move) -> Undo {
    let keys = zobrist_keys();
    let color = board.side_to_move;
    let from = mv.from().index();
    let to = mv.to().index();

    let code = board.piece_on_sq[from as usize];
    debug_assert_ne!(code, EMPTY_SQ, "make_move from an empty square");
    let piece = Piece::from_u8(code & 0b111);
    debug_assert_eq!(Color::from_u8((code >> 3) & 1), color);

    let mut undo = Undo {
        captured: None,
        prev_castling_rights: board.castling_rights,
        prev_en_passant: board.en_passant,
        prev_halfmove_clock: board.halfmove_clock,
        prev_fullmove_number: board.fullmove_number,
        prev_zobrist: board.zobrist,
        prev_pawn_zobrist: board.pawn_zobrist,
        prev_material: board.material,
        prev_pst: (board.pst_mg, board.pst_eg),
    };

    // Clear the en-passant state; a recorded square always contributed to
    // the hash.
    if let Some(ep) = board.en_passant.take() {
        board.zobrist ^= keys.ep_file[ep.file() as usize];
    }

    // Capture (the en-passant victim sits behind the target square)
    if mv.is_en_passant() {
        let cap_sq = match color {
            Color::White => to - 8,
            Color::Black => to + 8,
        };
        board.remove_piece(color.opposite(), Piece::Pawn, cap_sq);
        undo.captured = Some((color.opposite(), Piece::Pawn, Square::from_index(cap_sq)));
    } else if mv.is_capture() {
        let occupant = board.piece_on_sq[to as usize];
        debug_assert_ne!(occupant, EMPTY_SQ, "capture of an empty square");
        let cap_color = Color::from_u8((occupant >> 3) & 1);
        let cap_piece = Piece::from_u8(occupant & 0b111);
        board.remove_piece(cap_color, cap_piece, to);
        undo.captured = Some((cap_color, cap_piece, Square::from_index(to)));
    }

    // Move the piece, promoting if requested
    board.remove_piece(color, piece, from);
    if let Some(promo) = mv.promotion_piece() {
        debug_assert_eq!(piece, Piece::Pawn, "only pawns promote");
        board.add_piece(color, promo, to);
    } else {
        board.add_piece(color, piece, to);
    }

    // Castling moves the rook as well
    if mv.is_castling() {
        let (rook_from, rook_to) =
            rook_castle_squares(to).expect("castling move with a bad destination");
        board.remove_piece(color, Piece::Rook, rook_from);
        board.add_piece(color, Piece::Rook, rook_to);
    }

    // Fifty-move clock
    if undo.captured.is_some() || piece == Piece::Pawn {
        board.halfmove_clock = 0;
    } else {
        board.halfmove_clock += 1;
    }

    // Castling rights: a one-way loss on king moves, rook moves from home,
    // and rook captures on home squares
    let old_rights = board.castling_rights;
    let mut mask_to_clear: u8 = 0;
    if piece == Piece::King {
        mask_to_clear |= match color {
            Color::White => CASTLE_WHITE,
            Color::Black => CASTLE_BLACK,
        };
    }
    if piece == Piece::Rook {
        mask_to_clear |= rights_mask_to_clear_for_rook(color, from);
    }
    if let Some((cap_color, cap_piece, cap_sq)) = undo.captured
        && cap_piece == Piece::Rook
    {
        mask_to_clear |= rights_mask_to_clear_for_rook(cap_color, cap_sq.index());
    }
    let new_rights = old_rights & !mask_to_clear;
    if new_rights != old_rights {
        board.castling_rights = new_rights;
        xor_castling_rights_delta(&mut board.zobrist, keys, old_rights, new_rights);
    }

    // Flip the side to move before deciding whether the crossed square is
    // capturable: the recording rule asks about the opponent of the pusher.
    board.side_to_move = color.opposite();
    board.zobrist ^= keys.side_to_move;

    if mv.is_double_pawn_push() {
        let crossed = match color {
            Color::White => from + 8,
            Color::Black => from - 8,
        };
        if ep_square_is_capturable(board, crossed) {
            board.en_passant = Some(Square::from_index(crossed));
            board.zobrist ^= keys.ep_file[(crossed & 7) as usize];
        }
    }

    if color == Color::Black {
        board.fullmove_number += 1;
    }

    // Repetition history: the pre-move position becomes an ancestor
    board.history.push(undo.prev_zobrist);

    #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
    {
        let diff = board.zobrist ^ board.compute_zobrist_full();
        if diff != 0 {
            for f in 0..8 {
                if diff == keys.ep_file[f] {
                    eprintln!("hash diff matches ep file {}", f);
                }
            }
            if diff == keys.side_to_move {
                eprintln!("hash diff matches side-to-move key");
            }
        }
    }

    #[cfg(debug_assertions)]
    board.assert_hash();
    #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
    board.assert_views();

    undo
}

/// Reverse `make_move`. The snapshot fields are restored verbatim.
pub fn unmake_move(board: &mut Board, mv: Move, undo: Undo) {
    let color = board.side_to_move.opposite(); // the side that moved
    let from = mv.from().index();
    let to = mv.to().index();

    board.history.pop();

    // Put the moved piece back
    if let Some(promo) = mv.promotion_piece() {
        board.remove_piece(color, promo, to);
        board.add_piece(color, Piece::Pawn, from);
    } else {
        let code = board.piece_on_sq[to as usize];
        debug_assert_ne!(code, EMPTY_SQ);
        let piece = Piece::from_u8(code & 0b111);
        board.remove_piece(color, piece, to);
        board.add_piece(color, piece, from);
    }

    // Restore the captured piece (on its own square for en passant)
    if let Some((cap_color, cap_piece, cap_sq)) = undo.captured {
        board.add_piece(cap_color, cap_piece, cap_sq.index());
    }

    // Move the castling rook back
    if mv.is_castling() {
        let (rook_from, rook_to) =
            rook_castle_squares(to).expect("castling move with a bad destination");
        board.remove_piece(color, Piece::Rook, rook_to);
        board.add_piece(color, Piece::Rook, rook_from);
    }

    board.side_to_move = color;
    board.castling_rights = undo.prev_castling_rights;
    board.en_passant = undo.prev_en_passant;
    board.halfmove_clock = undo.prev_halfmove_clock;
    board.fullmove_number = undo.prev_fullmove_number;
    board.zobrist = undo.prev_zobrist;
    board.pawn_zobrist = undo.prev_pawn_zobrist;
    board.material = undo.prev_material;
    (board.pst_mg, board.pst_eg) = undo.prev_pst;

    #[cfg(debug_assertions)]
    board.assert_hash();
    #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
    board.assert_views();
}

/// Pass the move. The halfmove clock is zeroed so the repetition window
/// never crosses a null-move boundary.
pub fn make_null_move(board: &mut Board) -> NullUndo {
    let keys = zobrist_keys();
    let undo = NullUndo {
        prev_en_passant: board.en_passant,
        prev_halfmove_clock: board.halfmove_clock,
        prev_zobrist: board.zobrist,
    };

    board.history.push(board.zobrist);

    if let Some(ep) = board.en_passant.take() {
        board.zobrist ^= keys.ep_file[ep.file() as usize];
    }
    board.side_to_move = board.side_to_move.opposite();
    board.zobrist ^= keys.side_to_move;
    board.halfmove_clock = 0;

    undo
}

pub fn unmake_null_move(board: &mut Board, undo: NullUndo) {
    board.history.pop();
    board.side_to_move = board.side_to_move.opposite();
    board.en_passant = undo.prev_en_passant;
    board.halfmove_clock = undo.prev_halfmove_clock;
    board.zobrist = undo.prev_zobrist;

    #[cfg(debug_assertions)]
    board.assert_hash();
}

/// Pseudo-legal moves filtered down to legal ones by make/unmake.
pub fn generate_legal(
    board: &mut Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
    scratch: &mut impl MoveBuffer,
) {
    scratch.clear();
    generate_pseudo_legal(board, tables, scratch);
    moves.clear();

    for i in 0..scratch.len() {
        let mv = scratch[i];
        if mv.is_castling() && !is_legal_castling(board, mv, tables) {
            continue;
        }
        let mover = board.side_to_move();
        let undo = make_move(board, mv);
        let illegal = in_check(board, mover, tables);
        unmake_move(board, mv, undo);
        if !illegal {
            moves.push(mv);
        }
    }
}

/// Check that a pseudo-legal move does not leave its own king in check.
/// Castling is path-checked instead of played out.
#[inline]
pub fn is_legal_move(board: &mut Board, mv: Move, tables: &MagicTables) -> bool {
    if mv.is_castling() {
        return is_legal_castling(board, mv, tables);
    }
    let mover = board.side_to_move();
    let undo = make_move(board, mv);
    let illegal = in_check(board, mover, tables);
    unmake_move(board, mv, undo);
    !illegal
}

/// Legal captures and promotions (including en passant), for quiescence
/// and the public API.
pub fn generate_captures(
    board: &mut Board,
    tables: &MagicTables,
    moves: &mut impl MoveBuffer,
    scratch: &mut impl MoveBuffer,
) {
    scratch.clear();
    generate_pseudo_legal(board, tables, scratch);
    moves.clear();

    for i in 0..scratch.len() {
        let mv = scratch[i];
        if !mv.is_capture() && !mv.is_promotion() {
            continue;
        }
        let mover = board.side_to_move();
        let undo = make_move(board, mv);
        let legal = !in_check(board, mover, tables);
        unmake_move(board, mv, undo);
        if legal {
            moves.push(mv);
        }
    }
}
