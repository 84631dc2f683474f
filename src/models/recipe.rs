use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attr::{Ingredient, Tag};
use super::validation::{
    as_object, check_required, parse_money, parse_name, parse_name_list, parse_non_negative_i32,
    parse_text, FieldErrors, UpdateMode, MAX_NAME_LENGTH,
};

/// Price column is NUMERIC(5, 2)
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;
pub const MAX_LINK_LENGTH: usize = 255;

/// List representation of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

/// Detail representation: the list fields plus the long description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub description: String,
}

impl RecipeDetail {
    pub fn id(&self) -> i64 {
        self.recipe.id
    }

    pub fn summary(self) -> Recipe {
        self.recipe
    }
}

/// Recipe list filters: comma-separated tag / ingredient ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

impl RecipeFilter {
    pub fn parse(tags: Option<&str>, ingredients: Option<&str>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let tags = parse_id_list("tags", tags, &mut errors);
        let ingredients = parse_id_list("ingredients", ingredients, &mut errors);
        errors.finish(|| Self { tags, ingredients })
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.ingredients.is_empty()
    }
}

fn parse_id_list(field: &str, raw: Option<&str>, errors: &mut FieldErrors) -> Vec<i64> {
    let Some(raw) = raw else { return Vec::new() };
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<i64>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => {
                errors.add(field, format!("'{}' is not a valid id.", part));
                return Vec::new();
            }
        }
    }
    ids
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

impl NewRecipe {
    pub fn from_json(payload: &Value) -> Result<Self, FieldErrors> {
        let changes = RecipeChanges::from_json(payload, UpdateMode::Full)?;
        match (changes.title, changes.time_minutes, changes.price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(Self {
                title,
                time_minutes,
                price,
                link: changes.link.unwrap_or_default(),
                description: changes.description.unwrap_or_default(),
                tags: changes.tags.unwrap_or_default(),
                ingredients: changes.ingredients.unwrap_or_default(),
            }),
            _ => Err(FieldErrors::single("non_field_errors", "Incomplete recipe payload.")),
        }
    }
}

/// Fields supplied by an update; `None` leaves the stored value untouched.
/// A supplied tag/ingredient list replaces the recipe's current set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn from_json(payload: &Value, mode: UpdateMode) -> Result<Self, FieldErrors> {
        let map = as_object(payload)?;
        let mut errors = FieldErrors::new();
        let mut changes = Self::default();

        if check_required(map, "title", mode, &mut errors) {
            changes.title = collect(&mut errors, "title", parse_name(&map["title"], MAX_NAME_LENGTH));
        }
        if check_required(map, "time_minutes", mode, &mut errors) {
            changes.time_minutes = collect(&mut errors, "time_minutes", parse_non_negative_i32(&map["time_minutes"]));
        }
        if check_required(map, "price", mode, &mut errors) {
            changes.price = collect(
                &mut errors,
                "price",
                parse_money(&map["price"], PRICE_MAX_DIGITS, PRICE_DECIMAL_PLACES),
            );
        }
        if let Some(link) = map.get("link") {
            changes.link = collect(&mut errors, "link", parse_text(link, Some(MAX_LINK_LENGTH)));
        }
        if let Some(description) = map.get("description") {
            changes.description = collect(&mut errors, "description", parse_text(description, None));
        }
        changes.tags = optional_name_list(map, "tags", &mut errors);
        changes.ingredients = optional_name_list(map, "ingredients", &mut errors);

        errors.finish(|| changes)
    }
}

fn collect<T>(errors: &mut FieldErrors, field: &str, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(msg) => {
            errors.add(field, msg);
            None
        }
    }
}

fn optional_name_list(map: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<Vec<String>> {
    match map.get(field) {
        None => None,
        Some(Value::Null) => Some(Vec::new()),
        Some(value) => collect(errors, field, parse_name_list(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_collects_every_missing_field() {
        let errors = NewRecipe::from_json(&json!({})).unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("time_minutes").is_some());
        assert!(errors.get("price").is_some());
    }

    #[test]
    fn create_applies_defaults() {
        let recipe = NewRecipe::from_json(&json!({
            "title": "Eggs",
            "time_minutes": 5,
            "price": 3.99,
            "tags": [{"name": "Breakfast"}],
        }))
        .unwrap();
        assert_eq!(recipe.title, "Eggs");
        assert_eq!(recipe.price.to_string(), "3.99");
        assert_eq!(recipe.link, "");
        assert_eq!(recipe.tags, vec!["Breakfast".to_string()]);
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn create_rejects_negative_time() {
        let errors = NewRecipe::from_json(&json!({"title": "Eggs", "time_minutes": -5, "price": "1.00"})).unwrap_err();
        assert!(errors.get("time_minutes").is_some());
        assert!(errors.get("title").is_none());
    }

    #[test]
    fn partial_changes_only_carry_supplied_fields() {
        let changes = RecipeChanges::from_json(&json!({"title": "New"}), UpdateMode::Partial).unwrap();
        assert_eq!(changes.title.as_deref(), Some("New"));
        assert!(changes.price.is_none());
        assert!(changes.tags.is_none());
    }

    #[test]
    fn empty_tag_list_clears() {
        let changes = RecipeChanges::from_json(&json!({"tags": []}), UpdateMode::Partial).unwrap();
        assert_eq!(changes.tags, Some(vec![]));
    }

    #[test]
    fn filter_parses_comma_separated_ids() {
        let filter = RecipeFilter::parse(Some("1, 2,2"), None).unwrap();
        assert_eq!(filter.tags, vec![1, 2]);
        assert!(filter.ingredients.is_empty());
        assert!(RecipeFilter::parse(None, Some("1,x")).is_err());
    }

    #[test]
    fn detail_serializes_flat() {
        let detail = RecipeDetail {
            recipe: Recipe {
                id: 1,
                title: "Eggs".to_string(),
                time_minutes: 5,
                price: Decimal::new(399, 2),
                link: String::new(),
                tags: vec![],
                ingredients: vec![],
            },
            description: "Scrambled".to_string(),
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["title"], "Eggs");
        assert_eq!(value["price"], "3.99");
        assert_eq!(value["description"], "Scrambled");
    }
}
