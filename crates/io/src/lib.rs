// File I/O operations

pub mod csv;
pub mod loader;
pub mod xlsx;

pub use loader::{load_bytes, load_path, LoadStrategy};
