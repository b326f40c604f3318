//! Transposition table behavior visible through the public interface:
//! mate distances across plies, replacement, aging, warm-table reuse.

use once_cell::sync::Lazy;
use seajay::board::Board;
use seajay::moves::magic::MagicTables;
use seajay::moves::magic::loader::load_magic_tables;
use seajay::moves::types::Move;
use seajay::search::info::NullSink;
use seajay::search::time::SearchLimits;
use seajay::search::tt::{Bound, TranspositionTable, score_from_tt, score_to_tt};
use seajay::search::{MATE_SCORE, Searcher};
use std::str::FromStr;

static TABLES: Lazy<MagicTables> = Lazy::new(load_magic_tables);

#[test]
fn mate_scores_survive_probing_from_another_ply() {
    // A mate-in-2-plies found at ply 6, consumed at ply 3.
    let found_at_ply = 6;
    let score = MATE_SCORE - (found_at_ply + 2);

    let mut tt = TranspositionTable::new(1);
    let hash = 0x1122_3344_5566_7788u64;
    tt.store(hash, Move::from_bits(77), score, None, 12, Bound::Exact, found_at_ply);

    let hit = tt.probe(hash, 3).unwrap();
    // still "mate in 2 plies below this node", seen from ply 3
    assert_eq!(hit.score, MATE_SCORE - (3 + 2));
}

#[test]
fn score_helpers_are_inverse() {
    for ply in [0, 1, 5, 42] {
        for score in [0, 250, MATE_SCORE - 4, -(MATE_SCORE - 9)] {
            assert_eq!(score_from_tt(score_to_tt(score, ply), ply), score);
        }
    }
}

/// Multiplicative inverse of an odd word mod 2^64 (Newton iteration).
fn mul_inverse(a: u64) -> u64 {
    let mut x = a;
    for _ in 0..6 {
        x = x.wrapping_mul(2u64.wrapping_sub(a.wrapping_mul(x)));
    }
    x
}

/// Hashes landing in one cluster of `tt` but carrying distinct key32s.
fn colliding_hashes(tt: &TranspositionTable, count: usize) -> Vec<u64> {
    const MIX: u64 = 0x9E37_79B9_7F4A_7C15;
    let inv = mul_inverse(MIX);
    let mask = tt.len() as u64 - 1;

    let hashes: Vec<u64> = (0..count as u64)
        .map(|j| {
            // pick a post-mix value with fixed index bits, invert the mix
            let product = 8 | (j << 40);
            product.wrapping_mul(inv)
        })
        .collect();
    for pair in hashes.windows(2) {
        assert_ne!(pair[0] >> 32, pair[1] >> 32, "key32s must differ");
        assert_eq!(
            pair[0].wrapping_mul(MIX) & mask & !3,
            pair[1].wrapping_mul(MIX) & mask & !3,
            "hashes must share a cluster"
        );
    }
    hashes
}

#[test]
fn cluster_keeps_deeper_entries_under_pressure() {
    let mut tt = TranspositionTable::new(1);
    let colliding = colliding_hashes(&tt, 5);

    // the first four fill the cluster; the deepest must survive the fifth
    for (i, &hash) in colliding.iter().take(4).enumerate() {
        let depth = if i == 0 { 30 } else { 2 + i as u8 };
        tt.store(hash, Move::from_bits(i as u16 + 1), 10, None, depth, Bound::Exact, 0);
    }
    tt.store(colliding[4], Move::from_bits(99), 10, None, 3, Bound::Exact, 0);

    assert!(
        tt.probe(colliding[0], 0).is_some(),
        "the depth-30 entry should not be the eviction victim"
    );
}

#[test]
fn old_generations_are_evicted_first() {
    let mut tt = TranspositionTable::new(1);
    let colliding = colliding_hashes(&tt, 5);

    // fill a cluster in generation 0
    for (i, &hash) in colliding.iter().take(3).enumerate() {
        tt.store(hash, Move::from_bits(i as u16 + 1), 10, None, 20, Bound::Exact, 0);
    }
    // two fresh entries after aging: each must displace a stale entry,
    // never the other current-generation one
    tt.new_search();
    tt.store(colliding[3], Move::from_bits(4), 10, None, 4, Bound::Exact, 0);
    tt.store(colliding[4], Move::from_bits(5), 10, None, 4, Bound::Exact, 0);

    assert!(tt.probe(colliding[3], 0).is_some());
    assert!(tt.probe(colliding[4], 0).is_some());
}

#[test]
fn clear_forgets_everything() {
    let mut tt = TranspositionTable::new(1);
    let hash = 42u64;
    tt.store(hash, Move::from_bits(3), 5, None, 3, Bound::Exact, 0);
    assert!(tt.probe(hash, 0).is_some());
    tt.clear();
    assert!(tt.probe(hash, 0).is_none());
    assert_eq!(tt.hashfull(), 0);
}

#[test]
fn hashfull_reports_permille_of_current_generation() {
    let mut tt = TranspositionTable::new(1);
    assert_eq!(tt.hashfull(), 0);

    for i in 0..tt.len() as u64 {
        tt.store(
            i.wrapping_mul(0x9E37_79B9_97F4_A7C5),
            Move::from_bits(1),
            0,
            None,
            1,
            Bound::Exact,
            0,
        );
    }
    assert!(tt.hashfull() > 500, "table should look mostly full");

    // stale generations stop counting
    for _ in 0..3 {
        tt.new_search();
    }
    assert_eq!(tt.hashfull(), 0);
}

#[test]
fn warm_table_repeats_the_result_with_fewer_nodes() {
    let mut board =
        Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3")
            .unwrap();
    let mut searcher = Searcher::new(8);
    let limits = SearchLimits::depth(5);

    let cold = searcher.search(&mut board, &TABLES, &limits, &mut NullSink);
    let warm = searcher.search(&mut board, &TABLES, &limits, &mut NullSink);

    assert_eq!(warm.score, cold.score);
    assert_eq!(warm.best_move, cold.best_move);
    assert!(
        warm.nodes <= cold.nodes,
        "warm TT should not cost extra nodes ({} vs {})",
        warm.nodes,
        cold.nodes
    );
}

#[test]
fn disabling_the_table_still_finds_the_same_best_move() {
    // A hanging queen: the best move is forced either way.
    let mut board = Board::from_str("4k3/8/8/3q4/8/2N5/8/4K3 w - - 0 1").unwrap();
    let limits = SearchLimits::depth(4);

    let mut with_tt = Searcher::new(8);
    let on = with_tt.search(&mut board, &TABLES, &limits, &mut NullSink);

    let mut without_tt = Searcher::new(8);
    without_tt.set_tt_enabled(false);
    let off = without_tt.search(&mut board, &TABLES, &limits, &mut NullSink);

    assert_eq!(on.best_move.to_uci(), "c3d5");
    assert_eq!(off.best_move.to_uci(), "c3d5");
}
