pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use repository::{AttrRepository, HealthCheck, RecipeRepository, Store, UserRepository};
