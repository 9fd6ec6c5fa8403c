pub mod factories;
pub mod memstore;

pub use factory::Factory;
pub use memstore::{DefinitionEntry, MemStore};
