//! Mask computation, blocker enumeration and magic table construction.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MagicError {
    #[error("no magic multiplier found for {piece} on square {square}")]
    SearchExhausted { piece: &'static str, square: usize },
}

/// Seed selection for the candidate search.
#[derive(Debug, Clone, Copy)]
pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

/// Blocker mask for a rook: the rays without their edge squares (an edge
/// blocker cannot change the reachable set).
pub fn rook_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1 << (r * 8 + file);
    }
    for r in 1..rank {
        mask |= 1 << (r * 8 + file);
    }
    for f in (file + 1)..7 {
        mask |= 1 << (rank * 8 + f);
    }
    for f in 1..file {
        mask |= 1 << (rank * 8 + f);
    }
    mask
}

/// Blocker mask for a bishop: diagonal rays without the board rim.
pub fn bishop_mask(square: usize) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut mask = 0u64;

    for &(dr, df) in &[(1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let mut r = rank + dr;
        let mut f = file + df;
        while (1..7).contains(&r) && (1..7).contains(&f) {
            mask |= 1 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }
    mask
}

/// Every subset of `mask`, via the carry-rippler walk.
pub fn enumerate_blockers(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1 << mask.count_ones());
    let mut subset: u64 = 0;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn build_entry<F>(
    piece: &'static str,
    square: usize,
    mask: u64,
    slow_attacks: F,
    rng: &mut StdRng,
) -> Result<MagicEntry, MagicError>
where
    F: Fn(usize, u64) -> u64,
{
    let blockers = enumerate_blockers(mask);
    let attacks: Vec<u64> = blockers
        .iter()
        .map(|&b| slow_attacks(square, b))
        .collect();

    let bits = mask.count_ones();
    let shift = 64 - bits;
    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)
        .ok_or(MagicError::SearchExhausted { piece, square })?;

    let mut table = vec![0u64; 1usize << bits].into_boxed_slice();
    for (&blocker, &attack) in blockers.iter().zip(&attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        table[index] = attack;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table,
    })
}

/// Build both sliding-attack tables. Called once at startup; the result is
/// immutable afterwards.
pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, MagicError> {
    let mut rng = match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => StdRng::seed_from_u64(rand::rng().random()),
    };

    let mut rook_entries = Vec::with_capacity(64);
    let mut bishop_entries = Vec::with_capacity(64);

    for square in 0..64 {
        rook_entries.push(build_entry(
            "rook",
            square,
            rook_mask(square),
            rook_attacks_per_square,
            &mut rng,
        )?);
        bishop_entries.push(build_entry(
            "bishop",
            square,
            bishop_mask(square),
            bishop_attacks_per_square,
            &mut rng,
        )?);
    }

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
