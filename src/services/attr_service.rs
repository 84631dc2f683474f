use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::database::AttrRepository;
use crate::models::{AttrChanges, Attribute, FieldErrors, NewAttr, Principal, UpdateMode};
use crate::services::resource::{require_owned, CrudResource, ServiceError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttrFilters {
    /// `0`/`1`; restricts the list to rows used by one of the principal's recipes
    pub assigned_only: Option<String>,
}

impl AttrFilters {
    pub fn assigned_only(&self) -> Result<bool, FieldErrors> {
        match self.assigned_only.as_deref().map(str::trim) {
            None | Some("") => Ok(false),
            Some(raw) => raw
                .parse::<i64>()
                .map(|flag| flag != 0)
                .map_err(|_| FieldErrors::single("assigned_only", "Must be 0 or 1.")),
        }
    }
}

/// Tags and ingredients: same behaviour, different tables
pub struct AttrResource {
    repo: Arc<dyn AttrRepository>,
}

impl AttrResource {
    pub fn new(repo: Arc<dyn AttrRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CrudResource for AttrResource {
    type Summary = Attribute;
    type Detail = Attribute;
    type Filters = AttrFilters;

    fn label(&self) -> &'static str {
        self.repo.kind().label()
    }

    async fn list(&self, principal: &Principal, filters: AttrFilters) -> Result<Vec<Attribute>, ServiceError> {
        let rows = if filters.assigned_only()? {
            self.repo.list_assigned_by_owner(principal.user_id).await?
        } else {
            self.repo.list_by_owner(principal.user_id).await?
        };
        Ok(rows)
    }

    async fn retrieve(&self, principal: &Principal, id: i64) -> Result<Attribute, ServiceError> {
        let found = self.repo.find_by_id_and_owner(id, principal.user_id).await?;
        require_owned(self.label(), found)
    }

    async fn create(&self, principal: &Principal, payload: &Value) -> Result<Attribute, ServiceError> {
        let attr = NewAttr::from_json(payload)?;
        let created = self.repo.create(principal.user_id, attr).await?;
        info!("{} {} created for user {}", self.label(), created.id, principal.user_id);
        Ok(created)
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i64,
        payload: &Value,
        mode: UpdateMode,
    ) -> Result<Attribute, ServiceError> {
        let changes = AttrChanges::from_json(payload, mode)?;
        let updated = match changes.name {
            Some(name) => self.repo.update_name(id, principal.user_id, &name).await?,
            None => self.repo.find_by_id_and_owner(id, principal.user_id).await?,
        };
        require_owned(self.label(), updated)
    }

    async fn delete(&self, principal: &Principal, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete(id, principal.user_id).await? {
            return Err(ServiceError::NotFound(self.label()));
        }
        info!("{} {} deleted by user {}", self.label(), id, principal.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(raw: Option<&str>) -> AttrFilters {
        AttrFilters {
            assigned_only: raw.map(str::to_string),
        }
    }

    #[test]
    fn assigned_only_parses_integers() {
        assert_eq!(filters(None).assigned_only(), Ok(false));
        assert_eq!(filters(Some("0")).assigned_only(), Ok(false));
        assert_eq!(filters(Some("1")).assigned_only(), Ok(true));
        assert_eq!(filters(Some("2")).assigned_only(), Ok(true));
        assert!(filters(Some("yes")).assigned_only().is_err());
    }
}
