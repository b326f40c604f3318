//! Static exchange evaluation values (exchange scale: P=100 N=320 B=330
//! R=500 Q=950).

use once_cell::sync::Lazy;
use seajay::board::Board;
use seajay::moves::magic::MagicTables;
use seajay::moves::magic::loader::load_magic_tables;
use seajay::moves::parse_uci_move;
use seajay::moves::types::Move;
use seajay::search::see::SeeCalculator;
use std::str::FromStr;

static TABLES: Lazy<MagicTables> = Lazy::new(load_magic_tables);

fn see_of(fen: &str, text: &str) -> i32 {
    let board = Board::from_str(fen).expect("test FEN parses");
    let mv = parse_uci_move(&board, &TABLES, text).expect("move is legal");
    let see = SeeCalculator::new();
    see.see(&board, mv, &TABLES)
}

fn move_in(board: &Board, text: &str) -> Move {
    parse_uci_move(board, &TABLES, text).expect("move is legal")
}

#[test]
fn undefended_pawn_wins_a_pawn() {
    // PxP with no recapture
    assert_eq!(see_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 100);
}

#[test]
fn defended_pawn_trades_evenly() {
    // PxP, pawn recaptures: 100 - 100 = 0
    assert_eq!(
        see_of("4k3/8/4p3/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"),
        0
    );
}

#[test]
fn knight_takes_defended_pawn_loses_material() {
    // NxP, minor recaptures: 100 - 320 = -220
    assert_eq!(
        see_of("4k3/8/4b3/3p4/8/4N3/8/4K3 w - - 0 1", "e3d5"),
        -220
    );
}

#[test]
fn knight_takes_undefended_pawn_wins_it() {
    assert_eq!(see_of("4k3/8/8/3p4/8/4N3/8/4K3 w - - 0 1", "e3d5"), 100);
}

#[test]
fn rook_takes_undefended_pawn_scenario() {
    // The d8 rook does not reach e5: clean pawn grab.
    assert_eq!(
        see_of("1k1r4/1pp4p/p7/4p3/8/P5P1/1PP4P/2K1R3 w - - 0 1", "e1e5"),
        100
    );
}

#[test]
fn rook_takes_defended_pawn_loses_the_exchange() {
    // RxP with the d8 rook recapturing down the open file.
    assert_eq!(
        see_of("3r3k/8/8/8/3p4/8/8/3RK3 w - - 0 1", "d1d4"),
        100 - 500
    );
}

#[test]
fn battery_wins_through_the_exchange() {
    // QxR on a8; the h8 king never reaches the corner, so the rook is won
    // outright and the backing a1 rook never even fires.
    assert_eq!(see_of("r6k/8/8/8/8/8/Q7/R6K w - - 0 1", "a2a8"), 500);
}

#[test]
fn xray_defender_is_seen() {
    // Two rooks stacked on each side of the d-file; the pawn grab trades
    // rook for rook and leaves the attacker a rook down for a pawn.
    let value = see_of("3r3k/3r4/8/3p4/8/8/3R4/3RK3 w - - 0 1", "d2d5");
    assert_eq!(value, 100 - 500 + 500 - 500);
}

#[test]
fn en_passant_victim_is_a_pawn_on_its_own_square() {
    let fen = "rnbqkbnr/ppppp1pp/8/4Pp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
    assert!(see_of(fen, "e5f6") >= 0);
}

#[test]
fn promotion_capture_includes_the_promotion_gain() {
    // a7xb8=Q: rook victim plus queen-minus-pawn upgrade
    let value = see_of("1r5k/P7/8/8/8/8/8/K7 w - - 0 1", "a7b8q");
    assert!(value >= 500, "promotion capture should be huge, got {}", value);
}

#[test]
fn king_only_recaptures_when_nothing_takes_it_back() {
    // Queen backed by a rook grabs the pawn; the lone defending king may
    // not recapture into the battery, so the pawn is simply won.
    let backed = see_of("8/8/8/2k5/3p4/8/3Q4/3R3K w - - 0 1", "d2d4");
    assert_eq!(backed, 100);

    // Without the backup the king takes the queen and the grab loses.
    let unbacked = see_of("8/8/8/2k5/3p4/8/3Q4/7K w - - 0 1", "d2d4");
    assert_eq!(unbacked, 100 - 950);
}

#[test]
fn quiet_moves_score_zero() {
    let board = Board::new();
    let see = SeeCalculator::new();
    let mv = move_in(&board, "g1f3");
    assert_eq!(see.see(&board, mv, &TABLES), 0);
}

#[test]
fn threshold_interface_matches_values() {
    let board = Board::from_str("4k3/8/4b3/3p4/8/4N3/8/4K3 w - - 0 1").unwrap();
    let mv = move_in(&board, "e3d5");
    let see = SeeCalculator::new();
    // value is -220
    assert!(!see.see_ge(&board, mv, 0, &TABLES));
    assert!(see.see_ge(&board, mv, -300, &TABLES));
}

#[test]
fn cache_is_transparent() {
    let board = Board::from_str("3r3k/8/8/8/3p4/8/8/3RK3 w - - 0 1").unwrap();
    let mv = move_in(&board, "d1d4");
    let see = SeeCalculator::new();
    let first = see.see(&board, mv, &TABLES);
    let second = see.see(&board, mv, &TABLES);
    assert_eq!(first, second);
    see.clear_cache();
    assert_eq!(see.see(&board, mv, &TABLES), first);
}
