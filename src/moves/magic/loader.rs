//! Table construction entry point, with optional on-disk persistence.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;
use once_cell::sync::OnceCell;

/// Seed used for the default deterministic build.
const DEFAULT_SEED: u64 = 0x5EA_1A7;

/// Process-wide tables, built on first use and immutable afterwards.
/// Call sites still pass `&MagicTables` explicitly; this is the one place
/// that owns the allocation.
pub fn magic_tables() -> &'static MagicTables {
    static TABLES: OnceCell<MagicTables> = OnceCell::new();
    TABLES.get_or_init(load_magic_tables)
}

#[cfg(feature = "load_magic")]
const MAGIC_TABLES_PATH: &str = "magic_tables.bin";

/// Build (or, with the `load_magic` feature, load) the sliding-attack
/// tables. Deterministic: the same binary always produces the same tables.
pub fn load_magic_tables() -> MagicTables {
    #[cfg(feature = "load_magic")]
    if let Some(tables) = load_from_disk(MAGIC_TABLES_PATH) {
        return tables;
    }

    generate_magic_tables(MagicTableSeed::Fixed(DEFAULT_SEED))
        .expect("magic table construction failed for the fixed seed")
}

#[cfg(feature = "load_magic")]
fn load_from_disk(path: &str) -> Option<MagicTables> {
    let bytes = std::fs::read(path).ok()?;
    bincode::deserialize(&bytes).ok()
}

/// Persist built tables so later runs can skip construction.
#[cfg(feature = "load_magic")]
pub fn save_magic_tables(tables: &MagicTables, path: &str) -> std::io::Result<()> {
    let bytes = bincode::serialize(tables)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, bytes)
}
