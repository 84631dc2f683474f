use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::validation::{as_object, check_required, parse_name, FieldErrors, UpdateMode, MAX_NAME_LENGTH};

/// The two user-owned recipe attributes. They share one shape and one set of
/// queries; only the tables differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    Tag,
    Ingredient,
}

impl AttrKind {
    pub fn label(self) -> &'static str {
        match self {
            AttrKind::Tag => "Tag",
            AttrKind::Ingredient => "Ingredient",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            AttrKind::Tag => "tags",
            AttrKind::Ingredient => "ingredients",
        }
    }

    /// Join table linking recipes to this attribute
    pub fn link_table(self) -> &'static str {
        match self {
            AttrKind::Tag => "recipe_tags",
            AttrKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttrKind::Tag => "tag_id",
            AttrKind::Ingredient => "ingredient_id",
        }
    }
}

/// Wire and row shape of a tag or ingredient. The owner is implied by the
/// query scope and never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attribute {
    pub id: i64,
    pub name: String,
}

pub type Tag = Attribute;
pub type Ingredient = Attribute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttr {
    pub name: String,
}

impl NewAttr {
    pub fn from_json(payload: &Value) -> Result<Self, FieldErrors> {
        let changes = AttrChanges::from_json(payload, UpdateMode::Full)?;
        // Full mode guarantees the name is present once validation passed
        Ok(Self { name: changes.name.unwrap_or_default() })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrChanges {
    pub name: Option<String>,
}

impl AttrChanges {
    pub fn from_json(payload: &Value, mode: UpdateMode) -> Result<Self, FieldErrors> {
        let map = as_object(payload)?;
        let mut errors = FieldErrors::new();
        let mut name = None;

        if check_required(map, "name", mode, &mut errors) {
            match parse_name(&map["name"], MAX_NAME_LENGTH) {
                Ok(value) => name = Some(value),
                Err(msg) => errors.add("name", msg),
            }
        }

        errors.finish(|| Self { name })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_name() {
        let errors = NewAttr::from_json(&json!({})).unwrap_err();
        assert_eq!(errors.get("name"), Some("This field is required."));
    }

    #[test]
    fn create_ignores_owner_field() {
        let attr = NewAttr::from_json(&json!({"name": "Vegan", "user": 99})).unwrap();
        assert_eq!(attr.name, "Vegan");
    }

    #[test]
    fn partial_update_allows_empty_payload() {
        let changes = AttrChanges::from_json(&json!({}), UpdateMode::Partial).unwrap();
        assert!(changes.is_empty());
        assert!(AttrChanges::from_json(&json!({}), UpdateMode::Full).is_err());
    }

    #[test]
    fn rejects_non_object_payload() {
        let errors = AttrChanges::from_json(&json!(["Vegan"]), UpdateMode::Partial).unwrap_err();
        assert!(errors.get("non_field_errors").is_some());
    }

    #[test]
    fn kinds_map_to_distinct_tables() {
        assert_eq!(AttrKind::Tag.table(), "tags");
        assert_eq!(AttrKind::Ingredient.link_table(), "recipe_ingredients");
        assert_eq!(AttrKind::Ingredient.link_column(), "ingredient_id");
    }
}
