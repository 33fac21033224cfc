pub mod auth_state;
pub mod base;
pub mod memory_store;
pub mod no_store;

// Re-export the primary Store items so code outside can do
// "use crate::store::{Store, create_store};"
pub use auth_state::AuthStateStore;
pub use base::{create_store, Store};
pub use memory_store::MemoryStore;
pub use no_store::NoStore;
