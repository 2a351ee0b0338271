//! DEX domain: entities, parameters, keys, errors.

pub mod entities;
pub mod errors;
pub mod keys;
pub mod params;

pub use entities::*;
pub use errors::DexError;
pub use params::DexParams;
