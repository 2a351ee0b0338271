//! Backend adapters.

pub mod memory_db;
#[cfg(feature = "rocks")]
pub mod rocks_db;

pub use memory_db::MemoryDb;
#[cfg(feature = "rocks")]
pub use rocks_db::RocksDb;
