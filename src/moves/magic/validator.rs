//! Validation harness for the magic tables.
//!
//! Compares magic lookups against the slow ray-walk reference over random
//! occupancies for every square, and checks the empty-board symmetry
//! property (a attacks b ⇔ b attacks a for the same piece type).

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::structs::MagicTables;
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Compare every square of both tables against the reference over
/// `samples` random occupancies per square (plus empty and full boards).
pub fn validate_tables(tables: &MagicTables, samples: usize, seed: u64) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);

    for square in 0..64 {
        let mut occupancies = vec![0u64, u64::MAX];
        occupancies.extend((0..samples).map(|_| rng.next_u64() & rng.next_u64()));

        for occ in occupancies {
            let magic_rook = tables.rook.get_attacks(square, occ);
            let slow_rook = rook_attacks_per_square(square, occ);
            if magic_rook != slow_rook {
                return Err(format!(
                    "rook mismatch on square {} occ {:#018x}: magic {:#018x} != slow {:#018x}",
                    square, occ, magic_rook, slow_rook
                ));
            }

            let magic_bishop = tables.bishop.get_attacks(square, occ);
            let slow_bishop = bishop_attacks_per_square(square, occ);
            if magic_bishop != slow_bishop {
                return Err(format!(
                    "bishop mismatch on square {} occ {:#018x}: magic {:#018x} != slow {:#018x}",
                    square, occ, magic_bishop, slow_bishop
                ));
            }
        }
    }

    validate_symmetry(tables)
}

/// On an empty board, sliding attacks are symmetric relations.
pub fn validate_symmetry(tables: &MagicTables) -> Result<(), String> {
    for a in 0..64usize {
        for b in 0..64usize {
            let rook_ab = tables.rook.get_attacks(a, 0) & (1u64 << b) != 0;
            let rook_ba = tables.rook.get_attacks(b, 0) & (1u64 << a) != 0;
            if rook_ab != rook_ba {
                return Err(format!("rook symmetry broken between {} and {}", a, b));
            }

            let bishop_ab = tables.bishop.get_attacks(a, 0) & (1u64 << b) != 0;
            let bishop_ba = tables.bishop.get_attacks(b, 0) & (1u64 << a) != 0;
            if bishop_ab != bishop_ba {
                return Err(format!("bishop symmetry broken between {} and {}", a, b));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::magic::precompute::{MagicTableSeed, generate_magic_tables};

    #[test]
    fn generated_tables_validate() {
        let tables = generate_magic_tables(MagicTableSeed::Fixed(0x45)).unwrap();
        validate_tables(&tables, 64, 0xC0FFEE).unwrap();
    }
}
