pub mod attr;
pub mod recipe;
pub mod user;
pub mod validation;

pub use attr::{AttrChanges, AttrKind, Attribute, Ingredient, NewAttr, Tag};
pub use recipe::{NewRecipe, Recipe, RecipeChanges, RecipeDetail, RecipeFilter};
pub use user::{NewUser, Principal, User};
pub use validation::{FieldErrors, UpdateMode};
