//! Random search for magic multipliers.

use rand::RngCore;

/// A sparse 64-bit candidate: AND of three random words keeps the popcount
/// low, which is what makes a multiplier likely to hash without collisions.
#[inline(always)]
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// Check a candidate against every blocker pattern. Two patterns may share
/// an index only if they produce the same attack set (a constructive
/// collision).
pub fn is_magic_candidate_valid(blockers: &[u64], attacks: &[u64], magic: u64, shift: u32) -> bool {
    debug_assert_eq!(blockers.len(), attacks.len());
    let size = 1usize << (64 - shift);
    let mut seen: Vec<u64> = vec![u64::MAX; size];

    for (&blocker, &attack) in blockers.iter().zip(attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        if seen[index] == u64::MAX {
            seen[index] = attack;
        } else if seen[index] != attack {
            return false;
        }
    }
    true
}

/// Search for a working magic for one square, bounded in attempts.
pub fn find_magic_number_for_square<R: RngCore>(
    blockers: &[u64],
    attacks: &[u64],
    shift: u32,
    rng: &mut R,
) -> Option<u64> {
    for _ in 0..1_000_000 {
        let magic = random_sparse_u64(rng);
        if is_magic_candidate_valid(blockers, attacks, magic, shift) {
            return Some(magic);
        }
    }
    None
}
