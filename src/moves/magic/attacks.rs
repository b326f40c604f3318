//! Slow ray-walk attack generation. The reference implementation for the
//! magic tables: table construction and the validator both compare against
//! these, and FEN validation uses them so that parsing needs no tables.

#[inline]
fn scan_rays(square: usize, blockers: u64, deltas: &[(i32, i32); 4]) -> u64 {
    let rank = (square / 8) as i32;
    let file = (square % 8) as i32;
    let mut attacks = 0u64;

    for &(dr, df) in deltas {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let sq = (r * 8 + f) as u64;
            attacks |= 1 << sq;
            if (blockers >> sq) & 1 != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

#[inline]
pub fn rook_attacks_per_square(square: usize, blockers: u64) -> u64 {
    scan_rays(square, blockers, &[(1, 0), (-1, 0), (0, 1), (0, -1)])
}

#[inline]
pub fn bishop_attacks_per_square(square: usize, blockers: u64) -> u64 {
    scan_rays(square, blockers, &[(1, 1), (1, -1), (-1, 1), (-1, -1)])
}
