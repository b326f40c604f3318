//! FEN parsing and printing with full semantic validation.
//!
//! Validation uses the slow ray-walk attack functions, so parsing needs no
//! magic tables. A rejected string leaves no state behind; `from_fen`
//! either returns a fully valid board or an error.

use super::{Board, Color, Piece};
use crate::hash::zobrist::ep_square_is_capturable;
use crate::moves::square_control::is_square_attacked_slow;
use crate::square::Square;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 6 whitespace-separated fields, found {found}")]
    FieldCount { found: usize },
    #[error("expected 8 ranks in the board field, found {found}")]
    RankCount { found: usize },
    #[error("rank {rank} describes {squares} squares")]
    RankWidth { rank: usize, squares: usize },
    #[error("unknown piece character {0:?}")]
    PieceChar(char),
    #[error("pawn on back rank at {0}")]
    PawnOnBackRank(Square),
    #[error("each side needs exactly one king")]
    KingCount,
    #[error("bad side-to-move field {0:?}")]
    SideToMove(String),
    #[error("bad castling field {0:?}")]
    Castling(String),
    #[error("castling right {0:?} without king and rook on their home squares")]
    CastlingRights(char),
    #[error("bad en-passant field {0:?}")]
    EnPassant(String),
    #[error("en-passant square {0} on the wrong rank for the side to move")]
    EnPassantRank(Square),
    #[error("en-passant square {0} without a double-pushed pawn in front of it")]
    EnPassantPawn(Square),
    #[error("bad halfmove clock {0:?} (must be 0..=100)")]
    Halfmove(String),
    #[error("bad fullmove number {0:?} (must be >= 1)")]
    Fullmove(String),
    #[error("the side not to move is in check")]
    OpponentInCheck,
}

fn piece_from_char(c: char) -> Option<(Color, Piece)> {
    let color = if c.is_ascii_uppercase() {
        Color::White
    } else {
        Color::Black
    };
    let piece = match c.to_ascii_lowercase() {
        'p' => Piece::Pawn,
        'n' => Piece::Knight,
        'b' => Piece::Bishop,
        'r' => Piece::Rook,
        'q' => Piece::Queen,
        'k' => Piece::King,
        _ => return None,
    };
    Some((color, piece))
}

fn piece_to_char(color: Color, piece: Piece) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

impl Board {
    /// Parse a FEN string, rejecting malformed or semantically impossible
    /// positions.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount {
                found: fields.len(),
            });
        }

        let mut board = Board::new_empty();

        // Field 1: piece placement, rank 8 down to rank 1
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount { found: ranks.len() });
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i; // first listed rank is rank 8
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(run) = c.to_digit(10) {
                    if run == 0 || run > 8 {
                        return Err(FenError::RankWidth {
                            rank: rank + 1,
                            squares: file + run as usize,
                        });
                    }
                    file += run as usize;
                } else {
                    let (color, piece) =
                        piece_from_char(c).ok_or(FenError::PieceChar(c))?;
                    if file >= 8 {
                        return Err(FenError::RankWidth {
                            rank: rank + 1,
                            squares: file + 1,
                        });
                    }
                    let sq = (rank * 8 + file) as u8;
                    if piece == Piece::Pawn && (rank == 0 || rank == 7) {
                        return Err(FenError::PawnOnBackRank(Square::from_index(sq)));
                    }
                    board.add_piece(color, piece, sq);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth {
                    rank: rank + 1,
                    squares: file,
                });
            }
        }

        if board.pieces(Piece::King, Color::White).count_ones() != 1
            || board.pieces(Piece::King, Color::Black).count_ones() != 1
        {
            return Err(FenError::KingCount);
        }

        // Field 2: side to move
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        // Field 3: castling rights, only for pieces still at home
        board.castling_rights = 0;
        if fields[2] != "-" {
            if fields[2].is_empty() || fields[2].len() > 4 {
                return Err(FenError::Castling(fields[2].to_string()));
            }
            for c in fields[2].chars() {
                let (flag, king_sq, rook_sq, color) = match c {
                    'K' => (super::CASTLE_WK, 4u8, 7u8, Color::White),
                    'Q' => (super::CASTLE_WQ, 4, 0, Color::White),
                    'k' => (super::CASTLE_BK, 60, 63, Color::Black),
                    'q' => (super::CASTLE_BQ, 60, 56, Color::Black),
                    _ => return Err(FenError::Castling(fields[2].to_string())),
                };
                if board.castling_rights & flag != 0 {
                    return Err(FenError::Castling(fields[2].to_string()));
                }
                let king_home = board.pieces(Piece::King, color) & (1u64 << king_sq) != 0;
                let rook_home = board.pieces(Piece::Rook, color) & (1u64 << rook_sq) != 0;
                if !king_home || !rook_home {
                    return Err(FenError::CastlingRights(c));
                }
                board.castling_rights |= flag;
            }
        }

        // Field 4: en-passant target
        board.en_passant = None;
        if fields[3] != "-" {
            let sq = Square::from_str(fields[3])
                .map_err(|_| FenError::EnPassant(fields[3].to_string()))?;
            let expected_rank = match board.side_to_move {
                Color::White => 5, // black just pushed
                Color::Black => 2, // white just pushed
            };
            if sq.rank() != expected_rank {
                return Err(FenError::EnPassantRank(sq));
            }
            // The double-pushed pawn must stand in front of the target
            let pusher = board.side_to_move.opposite();
            let pawn_sq = match board.side_to_move {
                Color::White => sq.index() - 8,
                Color::Black => sq.index() + 8,
            };
            if board.pieces(Piece::Pawn, pusher) & (1u64 << pawn_sq) == 0 {
                return Err(FenError::EnPassantPawn(sq));
            }
            // Record the square only when it is actually capturable, the
            // same rule make_move applies; otherwise it must not reach the
            // hash.
            if ep_square_is_capturable(&board, sq.index()) {
                board.en_passant = Some(sq);
            }
        }

        // Fields 5 and 6: clocks
        let halfmove: u32 = fields[4]
            .parse()
            .map_err(|_| FenError::Halfmove(fields[4].to_string()))?;
        if halfmove > 100 {
            return Err(FenError::Halfmove(fields[4].to_string()));
        }
        let fullmove: u32 = fields[5]
            .parse()
            .map_err(|_| FenError::Fullmove(fields[5].to_string()))?;
        if fullmove == 0 {
            return Err(FenError::Fullmove(fields[5].to_string()));
        }
        board.halfmove_clock = halfmove;
        board.fullmove_number = fullmove;

        // The side that is not on move may not be in check
        let opponent = board.side_to_move.opposite();
        let opp_king = board.king_square(opponent);
        if is_square_attacked_slow(&board, opp_king, board.side_to_move) {
            return Err(FenError::OpponentInCheck);
        }

        board.refresh_hashes();
        board.history.clear();

        #[cfg(debug_assertions)]
        board.assert_hash();
        #[cfg(all(debug_assertions, feature = "paranoid_hash"))]
        board.assert_views();

        Ok(board)
    }

    /// Print the position as FEN. Inverse of `from_fen` for every string
    /// the engine itself produces.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8usize).rev() {
            let mut empty_run = 0;
            for file in 0..8usize {
                let sq = Square::from_index((rank * 8 + file) as u8);
                match self.piece_at(sq) {
                    None => empty_run += 1,
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            fen.push(char::from_digit(empty_run, 10).unwrap());
                            empty_run = 0;
                        }
                        fen.push(piece_to_char(color, piece));
                    }
                }
            }
            if empty_run > 0 {
                fen.push(char::from_digit(empty_run, 10).unwrap());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            if self.castling_rights & super::CASTLE_WK != 0 {
                fen.push('K');
            }
            if self.castling_rights & super::CASTLE_WQ != 0 {
                fen.push('Q');
            }
            if self.castling_rights & super::CASTLE_BK != 0 {
                fen.push('k');
            }
            if self.castling_rights & super::CASTLE_BQ != 0 {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.en_passant {
            None => fen.push('-'),
            Some(sq) => fen.push_str(&sq.to_string()),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }
}
