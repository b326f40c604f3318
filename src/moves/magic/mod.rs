pub mod attacks;
pub mod loader;
pub mod precompute;
pub mod search;
pub mod structs;
pub mod validator;

pub use structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
