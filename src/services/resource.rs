use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::database::DatabaseError;
use crate::models::{FieldErrors, Principal, UpdateMode};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing id and foreign-owned id look the same to the caller
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid payload: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

/// Uniform owner-scoped CRUD over one resource type. Every call receives the
/// principal explicitly; implementations never see rows owned by anyone else.
#[async_trait]
pub trait CrudResource: Send + Sync + 'static {
    /// Shape returned by `list`
    type Summary: Serialize + Send + 'static;
    /// Shape returned by `retrieve`, `create` and `update`
    type Detail: Serialize + Send + 'static;
    /// Query-string filters accepted by `list`
    type Filters: DeserializeOwned + Send + 'static;

    /// Human-readable resource name, used in not-found messages
    fn label(&self) -> &'static str;

    async fn list(&self, principal: &Principal, filters: Self::Filters) -> Result<Vec<Self::Summary>, ServiceError>;

    async fn retrieve(&self, principal: &Principal, id: i64) -> Result<Self::Detail, ServiceError>;

    /// Owner is always the principal; any owner field in the payload is ignored
    async fn create(&self, principal: &Principal, payload: &Value) -> Result<Self::Detail, ServiceError>;

    async fn update(
        &self,
        principal: &Principal,
        id: i64,
        payload: &Value,
        mode: UpdateMode,
    ) -> Result<Self::Detail, ServiceError>;

    async fn delete(&self, principal: &Principal, id: i64) -> Result<(), ServiceError>;
}

/// Turns an owner-scoped lookup result into the resource or `NotFound`
pub fn require_owned<T>(label: &'static str, found: Option<T>) -> Result<T, ServiceError> {
    found.ok_or(ServiceError::NotFound(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_become_not_found() {
        assert!(matches!(require_owned::<i64>("Tag", None), Err(ServiceError::NotFound("Tag"))));
        assert_eq!(require_owned("Tag", Some(3)).unwrap(), 3);
    }

    #[test]
    fn not_found_message_names_resource() {
        assert_eq!(ServiceError::NotFound("Recipe").to_string(), "Recipe not found");
    }
}
