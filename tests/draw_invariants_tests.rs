//! Draw detection: repetition, fifty-move rule, dead material, and the
//! precedence of draw scores over anything the hash table may claim.

use once_cell::sync::Lazy;
use seajay::board::Board;
use seajay::moves::execute::make_move;
use seajay::moves::magic::MagicTables;
use seajay::moves::magic::loader::load_magic_tables;
use seajay::moves::parse_uci_move;
use seajay::search::info::NullSink;
use seajay::search::time::SearchLimits;
use seajay::search::{MATE_THRESHOLD, Searcher};
use seajay::status::{is_insufficient_material, is_search_draw};
use std::str::FromStr;

static TABLES: Lazy<MagicTables> = Lazy::new(load_magic_tables);

fn play(board: &mut Board, moves: &[&str]) {
    for text in moves {
        let mv = parse_uci_move(board, &TABLES, text).expect("legal move");
        make_move(board, mv);
    }
}

#[test]
fn knight_shuffle_reaches_threefold() {
    let mut board = Board::new();
    play(
        &mut board,
        &[
            "g1f3", "g8f6", "f3g1", "f6g8", // second occurrence of startpos
            "g1f3", "g8f6", "f3g1", "f6g8", // third occurrence
        ],
    );
    assert_eq!(board.repetition_count(), 2);
    assert!(board.is_threefold());
    assert!(is_search_draw(&board));
}

#[test]
fn two_occurrences_are_not_yet_a_draw() {
    let mut board = Board::new();
    play(&mut board, &["g1f3", "g8f6", "f3g1", "f6g8"]);
    assert_eq!(board.repetition_count(), 1);
    assert!(!board.is_threefold());
}

#[test]
fn pawn_move_cuts_the_repetition_window() {
    let mut board = Board::new();
    play(
        &mut board,
        &[
            "g1f3", "g8f6", "f3g1", "f6g8", // startpos seen twice
            "e2e4", "e7e5", // irreversible: window resets
            "g1f3", "g8f6", "f3g1", "f6g8",
        ],
    );
    // the pre-pawn-move occurrences of the knight dance no longer count
    assert_eq!(board.repetition_count(), 1);
    assert!(!board.is_threefold());
}

#[test]
fn fifty_move_rule_draws_at_one_hundred_plies() {
    let board = Board::from_str("8/8/8/8/8/5k2/8/R4K2 w - - 100 80").unwrap();
    assert!(is_search_draw(&board));

    let board = Board::from_str("8/8/8/8/8/5k2/8/R4K2 w - - 99 80").unwrap();
    assert!(!is_search_draw(&board));
}

#[test]
fn dead_material_positions() {
    // K vs K
    assert!(is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap()
    ));
    // K+B vs K and K+N vs K
    assert!(is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").unwrap()
    ));
    assert!(is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/8/1N2K3 w - - 0 1").unwrap()
    ));
    // same-colored bishops (c1 and f4 are both dark squares)
    assert!(is_insufficient_material(
        &Board::from_str("4k3/8/8/8/5b2/8/8/2B1K3 w - - 0 1").unwrap()
    ));
}

#[test]
fn live_material_positions() {
    // opposite-colored bishops can in principle mate
    assert!(!is_insufficient_material(
        &Board::from_str("4k3/8/8/8/4b3/8/8/2B1K3 w - - 0 1").unwrap()
    ));
    // a pawn is always enough to play on
    assert!(!is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap()
    ));
    // rooks and queens obviously too
    assert!(!is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap()
    ));
    // two knights are not scored as an automatic search draw
    assert!(!is_insufficient_material(
        &Board::from_str("4k3/8/8/8/8/8/8/NN2K3 w - - 0 1").unwrap()
    ));
}

#[test]
fn search_scores_dead_position_as_draw() {
    let mut board = Board::from_str("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").unwrap();
    let mut searcher = Searcher::new(4);
    let result = searcher.search(
        &mut board,
        &TABLES,
        &SearchLimits::depth(6),
        &mut NullSink,
    );
    assert_eq!(result.score, 0);
}

#[test]
fn perpetual_check_heads_to_a_draw() {
    // Both queens can check forever; neither side can make progress
    // without allowing mate. The score must stay near zero and no cached
    // mate line may override the repetition.
    let mut board = Board::from_str("3Q4/8/3K4/8/8/3k4/8/3q4 b - - 0 1").unwrap();
    let mut searcher = Searcher::new(8);
    let result = searcher.search(
        &mut board,
        &TABLES,
        &SearchLimits::depth(8),
        &mut NullSink,
    );
    assert!(
        result.score.abs() <= 50,
        "perpetual position should be near zero, got {}",
        result.score
    );
    assert!(result.score.abs() < MATE_THRESHOLD);
}

#[test]
fn repetition_draw_beats_tt_content() {
    // Drive the engine into a position it has searched before, with the
    // game history already containing two occurrences; the search must
    // report the draw even with a warm table.
    let mut board = Board::new();
    let mut searcher = Searcher::new(8);
    // warm the table on the start position
    searcher.search(&mut board, &TABLES, &SearchLimits::depth(4), &mut NullSink);

    play(
        &mut board,
        &[
            "g1f3", "g8f6", "f3g1", "f6g8",
            "g1f3", "g8f6", "f3g1", "f6g8",
        ],
    );
    assert!(is_search_draw(&board));
}
