//! Move generator validation against the published perft reference counts.

use once_cell::sync::Lazy;
use seajay::board::Board;
use seajay::moves::magic::MagicTables;
use seajay::moves::magic::loader::load_magic_tables;
use seajay::moves::perft::{PerftCounters, perft, perft_count_with_breakdown, perft_divide};
use std::str::FromStr;

static TABLES: Lazy<MagicTables> = Lazy::new(load_magic_tables);

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const POSITION_4: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
const POSITION_5: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
const POSITION_6: &str = "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10";

fn assert_perft(fen: &str, expected: &[u64]) {
    let mut board = Board::from_str(fen).expect("test FEN parses");
    for (i, &nodes) in expected.iter().enumerate() {
        let depth = (i + 1) as u32;
        assert_eq!(
            perft(&mut board, &TABLES, depth),
            nodes,
            "perft({}) of {}",
            depth,
            fen
        );
    }
}

#[test]
fn startpos_shallow() {
    let mut board = Board::new();
    assert_eq!(perft(&mut board, &TABLES, 1), 20);
    assert_eq!(perft(&mut board, &TABLES, 2), 400);
    assert_eq!(perft(&mut board, &TABLES, 3), 8_902);
    assert_eq!(perft(&mut board, &TABLES, 4), 197_281);
}

#[test]
#[ignore = "deep perft; run with --release -- --ignored"]
fn startpos_depth_five() {
    let mut board = Board::new();
    assert_eq!(perft(&mut board, &TABLES, 5), 4_865_609);
}

#[test]
fn kiwipete_shallow() {
    assert_perft(KIWIPETE, &[48, 2_039, 97_862]);
}

#[test]
#[ignore = "deep perft; run with --release -- --ignored"]
fn kiwipete_depth_four() {
    let mut board = Board::from_str(KIWIPETE).unwrap();
    assert_eq!(perft(&mut board, &TABLES, 4), 4_085_603);
}

#[test]
fn position_three() {
    assert_perft(POSITION_3, &[14, 191, 2_812, 43_238]);
}

#[test]
#[ignore = "deep perft; run with --release -- --ignored"]
fn position_three_depth_five() {
    let mut board = Board::from_str(POSITION_3).unwrap();
    assert_eq!(perft(&mut board, &TABLES, 5), 674_624);
}

#[test]
fn position_four() {
    assert_perft(POSITION_4, &[6, 264, 9_467]);
}

#[test]
fn position_five() {
    assert_perft(POSITION_5, &[44, 1_486, 62_379]);
}

#[test]
fn position_six() {
    assert_perft(POSITION_6, &[46, 2_079, 89_890]);
}

#[test]
fn divide_sums_to_perft() {
    let mut board = Board::from_str(KIWIPETE).unwrap();
    let divided = perft_divide(&mut board, &TABLES, 3);
    assert_eq!(divided.len(), 48);
    let total: u64 = divided.iter().map(|(_, n)| n).sum();
    assert_eq!(total, 97_862);
}

#[test]
fn perft_leaves_board_untouched() {
    let mut board = Board::from_str(KIWIPETE).unwrap();
    let before = board.clone();
    perft(&mut board, &TABLES, 3);
    assert_eq!(board, before);
}

#[test]
fn kiwipete_breakdown_depth_two() {
    // reference: depth-2 edge counts for Kiwipete
    let mut board = Board::from_str(KIWIPETE).unwrap();
    let mut counters = PerftCounters::default();
    perft_count_with_breakdown(&mut board, &TABLES, 2, &mut counters);
    assert_eq!(counters.nodes, 2_039);
    assert_eq!(counters.captures, 8 + 351);
    assert_eq!(counters.ep_captures, 1);
    assert_eq!(counters.castles, 2 + 91);
}
