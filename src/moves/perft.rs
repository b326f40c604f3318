use crate::board::Board;
use crate::moves::{
    execute::{generate_legal, make_move, unmake_move},
    magic::MagicTables,
    square_control::in_check,
    types::Move,
};
use tracing::{debug, instrument};

const MAX_PERFT_DEPTH: usize = 20;

#[derive(Debug, Default, Clone, Copy)]
pub struct PerftCounters {
    pub nodes: u64,
    pub captures: u64,
    pub ep_captures: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounters {
    pub fn add(&mut self, o: &PerftCounters) {
        self.nodes += o.nodes;
        self.captures += o.captures;
        self.ep_captures += o.ep_captures;
        self.castles += o.castles;
        self.promotions += o.promotions;
        self.checks += o.checks;
        self.checkmates += o.checkmates;
    }
}

fn move_buffers() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(64))
}

fn pseudo_buffers() -> [Vec<Move>; MAX_PERFT_DEPTH] {
    std::array::from_fn(|_| Vec::with_capacity(256))
}

fn perft_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    moves: &mut [Vec<Move>],
    pseudo: &mut [Vec<Move>],
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut legal = std::mem::take(&mut moves[ply]);
    let mut scratch = std::mem::take(&mut pseudo[ply]);
    generate_legal(board, tables, &mut legal, &mut scratch);

    let mut nodes = 0;
    if depth == 1 {
        nodes = legal.len() as u64;
    } else {
        for &mv in legal.iter() {
            #[cfg(debug_assertions)]
            let z0 = board.zobrist();

            let undo = make_move(board, mv);
            nodes += perft_recursive(board, tables, depth - 1, ply + 1, moves, pseudo);
            unmake_move(board, mv, undo);

            #[cfg(debug_assertions)]
            {
                debug_assert_eq!(board.zobrist(), z0, "zobrist changed across make/unmake");
                debug_assert_eq!(
                    board.compute_zobrist_full(),
                    board.zobrist(),
                    "full recompute mismatch"
                );
            }
        }
    }

    moves[ply] = legal;
    pseudo[ply] = scratch;
    nodes
}

/// Count the leaves of the legal move tree.
#[instrument(skip(board, tables), fields(depth))]
pub fn perft(board: &mut Board, tables: &MagicTables, depth: u32) -> u64 {
    assert!(
        (depth as usize) <= MAX_PERFT_DEPTH,
        "depth {} exceeds MAX_PERFT_DEPTH {}",
        depth,
        MAX_PERFT_DEPTH
    );

    let mut moves = move_buffers();
    let mut pseudo = pseudo_buffers();
    perft_recursive(board, tables, depth, 0, &mut moves, &mut pseudo)
}

/// Per-root-move node counts, plus the total.
#[instrument(skip(board, tables), fields(depth))]
pub fn perft_divide(board: &mut Board, tables: &MagicTables, depth: u32) -> Vec<(Move, u64)> {
    assert!((depth as usize) <= MAX_PERFT_DEPTH);

    let mut moves = move_buffers();
    let mut pseudo = pseudo_buffers();

    let mut legal = Vec::with_capacity(64);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut legal, &mut scratch);

    let mut out = Vec::with_capacity(legal.len());
    for &mv in legal.iter() {
        let undo = make_move(board, mv);
        let count = if depth <= 1 {
            1
        } else {
            perft_recursive(board, tables, depth - 1, 1, &mut moves, &mut pseudo)
        };
        unmake_move(board, mv, undo);
        debug!(%mv, nodes = count, "divide: root child total");
        out.push((mv, count));
    }
    out
}

fn perft_count_recursive(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    ply: usize,
    out: &mut PerftCounters,
    moves: &mut [Vec<Move>],
    pseudo: &mut [Vec<Move>],
) {
    if depth == 0 {
        out.nodes += 1;

        let side_in_check = in_check(board, board.side_to_move(), tables);
        if side_in_check {
            out.checks += 1;

            let mut legal = std::mem::take(&mut moves[ply]);
            let mut scratch = std::mem::take(&mut pseudo[ply]);
            generate_legal(board, tables, &mut legal, &mut scratch);
            if legal.is_empty() {
                out.checkmates += 1;
            }
            moves[ply] = legal;
            pseudo[ply] = scratch;
        }
        return;
    }

    let mut legal = std::mem::take(&mut moves[ply]);
    let mut scratch = std::mem::take(&mut pseudo[ply]);
    generate_legal(board, tables, &mut legal, &mut scratch);

    for &mv in legal.iter() {
        if mv.is_capture() {
            out.captures += 1;
            if mv.is_en_passant() {
                out.ep_captures += 1;
            }
        }
        if mv.is_castling() {
            out.castles += 1;
        }
        if mv.is_promotion() {
            out.promotions += 1;
        }

        let undo = make_move(board, mv);
        perft_count_recursive(board, tables, depth - 1, ply + 1, out, moves, pseudo);
        unmake_move(board, mv, undo);
    }

    moves[ply] = legal;
    pseudo[ply] = scratch;
}

/// Perft with an edge-based breakdown of special move kinds.
pub fn perft_count_with_breakdown(
    board: &mut Board,
    tables: &MagicTables,
    depth: u32,
    out: &mut PerftCounters,
) {
    assert!((depth as usize) <= MAX_PERFT_DEPTH);

    let mut moves = move_buffers();
    let mut pseudo = pseudo_buffers();
    perft_count_recursive(board, tables, depth, 0, out, &mut moves, &mut pseudo);
}
