pub mod execute;
pub mod king;
pub mod knight;
pub mod magic;
pub mod movegen;
pub mod pawn;
pub mod perft;
pub mod square_control;
pub mod types;

use crate::board::{Board, Piece};
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::square::Square;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("cannot parse move {0:?}")]
    Syntax(String),
    #[error("move {0:?} is not legal in this position")]
    Illegal(String),
}

/// Resolve a UCI long-algebraic move ("e2e4", "a7a8q") against the legal
/// moves of the position. Rejecting leaves the board untouched.
pub fn parse_uci_move(
    board: &Board,
    tables: &MagicTables,
    text: &str,
) -> Result<Move, MoveParseError> {
    if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
        return Err(MoveParseError::Syntax(text.to_string()));
    }

    let from = Square::from_str(&text[0..2]).map_err(|_| MoveParseError::Syntax(text.into()))?;
    let to = Square::from_str(&text[2..4]).map_err(|_| MoveParseError::Syntax(text.into()))?;
    let promo = match text.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return Err(MoveParseError::Syntax(text.to_string())),
    };

    let mut scratch = Vec::with_capacity(256);
    let mut legal = Vec::with_capacity(64);
    let mut probe = board.clone();
    execute::generate_legal(&mut probe, tables, &mut legal, &mut scratch);

    legal
        .into_iter()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_piece() == promo)
        .ok_or_else(|| MoveParseError::Illegal(text.to_string()))
}
