pub mod attr_service;
pub mod recipe_service;
pub mod resource;

pub use attr_service::{AttrFilters, AttrResource};
pub use recipe_service::{RecipeListParams, RecipeResource};
pub use resource::{CrudResource, ServiceError};
