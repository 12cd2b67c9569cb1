//! Resumption store adapters

mod file_store;
mod memory;

pub use file_store::FileResumptionStore;
pub use memory::InMemoryResumptionStore;
