use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::database::RecipeRepository;
use crate::models::{NewRecipe, Principal, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, UpdateMode};
use crate::services::resource::{require_owned, CrudResource, ServiceError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeListParams {
    /// Comma-separated tag ids
    pub tags: Option<String>,
    /// Comma-separated ingredient ids
    pub ingredients: Option<String>,
}

pub struct RecipeResource {
    repo: Arc<dyn RecipeRepository>,
}

impl RecipeResource {
    pub fn new(repo: Arc<dyn RecipeRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CrudResource for RecipeResource {
    type Summary = Recipe;
    type Detail = RecipeDetail;
    type Filters = RecipeListParams;

    fn label(&self) -> &'static str {
        "Recipe"
    }

    async fn list(&self, principal: &Principal, params: RecipeListParams) -> Result<Vec<Recipe>, ServiceError> {
        let filter = RecipeFilter::parse(params.tags.as_deref(), params.ingredients.as_deref())?;
        Ok(self.repo.list_by_owner(principal.user_id, &filter).await?)
    }

    async fn retrieve(&self, principal: &Principal, id: i64) -> Result<RecipeDetail, ServiceError> {
        let found = self.repo.find_by_id_and_owner(id, principal.user_id).await?;
        require_owned(self.label(), found)
    }

    async fn create(&self, principal: &Principal, payload: &Value) -> Result<RecipeDetail, ServiceError> {
        let recipe = NewRecipe::from_json(payload)?;
        let created = self.repo.create(principal.user_id, recipe).await?;
        info!("Recipe {} created for user {}", created.id(), principal.user_id);
        Ok(created)
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i64,
        payload: &Value,
        mode: UpdateMode,
    ) -> Result<RecipeDetail, ServiceError> {
        let changes = RecipeChanges::from_json(payload, mode)?;
        let updated = self.repo.update(id, principal.user_id, changes).await?;
        require_owned(self.label(), updated)
    }

    async fn delete(&self, principal: &Principal, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete(id, principal.user_id).await? {
            return Err(ServiceError::NotFound(self.label()));
        }
        info!("Recipe {} deleted by user {}", id, principal.user_id);
        Ok(())
    }
}
