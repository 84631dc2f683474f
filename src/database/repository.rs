use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{DatabaseConfig, StoreBackend};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryStore;
use crate::database::postgres::{PgAttrRepository, PgStore};
use crate::models::{
    AttrKind, Attribute, NewAttr, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, User,
};

/// Owner-scoped queries over tags or ingredients. Every method takes the
/// owning user id; rows owned by anyone else are invisible.
#[async_trait]
pub trait AttrRepository: Send + Sync {
    fn kind(&self) -> AttrKind;

    /// All rows owned by `owner`, ordered by name descending
    async fn list_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError>;

    /// Rows owned by `owner` referenced by at least one of the owner's recipes, each once
    async fn list_assigned_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError>;

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<Attribute>, DatabaseError>;

    async fn create(&self, owner: i64, attr: NewAttr) -> Result<Attribute, DatabaseError>;

    async fn update_name(&self, id: i64, owner: i64, name: &str) -> Result<Option<Attribute>, DatabaseError>;

    /// Returns false when no owned row matched
    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Recipes owned by `owner`, newest id first
    async fn list_by_owner(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError>;

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<RecipeDetail>, DatabaseError>;

    /// Inserts the recipe and attaches the named tags/ingredients, creating
    /// missing ones under the same owner
    async fn create(&self, owner: i64, recipe: NewRecipe) -> Result<RecipeDetail, DatabaseError>;

    async fn update(&self, id: i64, owner: i64, changes: RecipeChanges) -> Result<Option<RecipeDetail>, DatabaseError>;

    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_active(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// The full set of repositories one backend provides
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub tags: Arc<dyn AttrRepository>,
    pub ingredients: Arc<dyn AttrRepository>,
    pub recipes: Arc<dyn RecipeRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Store {
    /// Opens the backend selected in config, applying migrations when enabled
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.backend {
            StoreBackend::Memory => {
                if crate::is_production!() {
                    warn!("In-memory store selected in production; data will not survive a restart");
                } else {
                    info!("Using in-memory store");
                }
                Ok(Self::memory())
            }
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(config).await?;
                if config.run_migrations {
                    DatabaseManager::migrate(&pool).await?;
                }
                Ok(Self::postgres(pool))
            }
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self {
            users: store.clone(),
            tags: Arc::new(PgAttrRepository::new(AttrKind::Tag, pool.clone())),
            ingredients: Arc::new(PgAttrRepository::new(AttrKind::Ingredient, pool)),
            recipes: store.clone(),
            health: store,
        }
    }

    pub fn memory() -> Self {
        Self::from_memory(MemoryStore::new())
    }

    /// Builds a store over an existing in-memory state, so callers can keep a
    /// handle for seeding data
    pub fn from_memory(memory: MemoryStore) -> Self {
        let memory = Arc::new(memory);
        Self {
            users: memory.clone(),
            tags: Arc::new(memory.attr_repository(AttrKind::Tag)),
            ingredients: Arc::new(memory.attr_repository(AttrKind::Ingredient)),
            recipes: memory.clone(),
            health: memory,
        }
    }
}
