//! In-process store for tests and local runs without PostgreSQL.
//!
//! One `RwLock` guards all tables, so each repository call is atomic the same
//! way a single transaction is in the PostgreSQL backend.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::repository::{AttrRepository, HealthCheck, RecipeRepository, UserRepository};
use crate::models::{
    AttrKind, Attribute, NewAttr, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, User,
};

#[derive(Debug, Clone)]
struct StoredAttr {
    owner: i64,
    name: String,
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    owner: i64,
    title: String,
    time_minutes: i32,
    price: Decimal,
    link: String,
    description: String,
    tags: BTreeSet<i64>,
    ingredients: BTreeSet<i64>,
}

impl StoredRecipe {
    fn links(&self, kind: AttrKind) -> &BTreeSet<i64> {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }

    fn links_mut(&mut self, kind: AttrKind) -> &mut BTreeSet<i64> {
        match kind {
            AttrKind::Tag => &mut self.tags,
            AttrKind::Ingredient => &mut self.ingredients,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, StoredAttr>,
    ingredients: BTreeMap<i64, StoredAttr>,
    recipes: BTreeMap<i64, StoredRecipe>,
    sequences: HashMap<&'static str, i64>,
}

impl MemoryState {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn attrs(&self, kind: AttrKind) -> &BTreeMap<i64, StoredAttr> {
        match kind {
            AttrKind::Tag => &self.tags,
            AttrKind::Ingredient => &self.ingredients,
        }
    }

    fn attrs_mut(&mut self, kind: AttrKind) -> &mut BTreeMap<i64, StoredAttr> {
        match kind {
            AttrKind::Tag => &mut self.tags,
            AttrKind::Ingredient => &mut self.ingredients,
        }
    }

    fn owned_attrs(&self, kind: AttrKind, owner: i64) -> impl Iterator<Item = Attribute> + '_ {
        self.attrs(kind)
            .iter()
            .filter(move |(_, attr)| attr.owner == owner)
            .map(|(id, attr)| Attribute { id: *id, name: attr.name.clone() })
    }

    /// Same lookup-or-create the PostgreSQL backend does inside its transaction
    fn resolve_attr_ids(&mut self, kind: AttrKind, owner: i64, names: &[String]) -> BTreeSet<i64> {
        let mut ids = BTreeSet::new();
        for name in names {
            let existing = self
                .attrs(kind)
                .iter()
                .find(|(_, attr)| attr.owner == owner && attr.name == *name)
                .map(|(id, _)| *id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = self.next_id(kind.table());
                    self.attrs_mut(kind).insert(id, StoredAttr { owner, name: name.clone() });
                    id
                }
            };
            ids.insert(id);
        }
        ids
    }

    fn linked(&self, kind: AttrKind, ids: &BTreeSet<i64>) -> Vec<Attribute> {
        let table = self.attrs(kind);
        let mut attrs: Vec<Attribute> = ids
            .iter()
            .filter_map(|id| table.get(id).map(|attr| Attribute { id: *id, name: attr.name.clone() }))
            .collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        attrs
    }

    fn detail(&self, id: i64, recipe: &StoredRecipe) -> RecipeDetail {
        RecipeDetail {
            recipe: Recipe {
                id,
                title: recipe.title.clone(),
                time_minutes: recipe.time_minutes,
                price: recipe.price,
                link: recipe.link.clone(),
                tags: self.linked(AttrKind::Tag, &recipe.tags),
                ingredients: self.linked(AttrKind::Ingredient, &recipe.ingredients),
            },
            description: recipe.description.clone(),
        }
    }
}

fn sort_by_name_desc(attrs: &mut [Attribute]) {
    attrs.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
}

/// Shared in-memory tables. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr_repository(&self, kind: AttrKind) -> MemoryAttrRepository {
        MemoryAttrRepository {
            kind,
            state: self.state.clone(),
        }
    }

    /// Marks a user inactive; used to exercise credential rejection
    pub async fn deactivate_user(&self, id: i64) -> bool {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        }
    }
}

pub struct MemoryAttrRepository {
    kind: AttrKind,
    state: Arc<RwLock<MemoryState>>,
}

#[async_trait]
impl AttrRepository for MemoryAttrRepository {
    fn kind(&self) -> AttrKind {
        self.kind
    }

    async fn list_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError> {
        let state = self.state.read().await;
        let mut attrs: Vec<Attribute> = state.owned_attrs(self.kind, owner).collect();
        sort_by_name_desc(&mut attrs);
        Ok(attrs)
    }

    async fn list_assigned_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError> {
        let state = self.state.read().await;
        let assigned: BTreeSet<i64> = state
            .recipes
            .values()
            .filter(|recipe| recipe.owner == owner)
            .flat_map(|recipe| recipe.links(self.kind).iter().copied())
            .collect();
        let mut attrs: Vec<Attribute> = state
            .owned_attrs(self.kind, owner)
            .filter(|attr| assigned.contains(&attr.id))
            .collect();
        sort_by_name_desc(&mut attrs);
        Ok(attrs)
    }

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<Attribute>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .attrs(self.kind)
            .get(&id)
            .filter(|attr| attr.owner == owner)
            .map(|attr| Attribute { id, name: attr.name.clone() }))
    }

    async fn create(&self, owner: i64, attr: NewAttr) -> Result<Attribute, DatabaseError> {
        let mut state = self.state.write().await;
        let id = state.next_id(self.kind.table());
        state.attrs_mut(self.kind).insert(
            id,
            StoredAttr {
                owner,
                name: attr.name.clone(),
            },
        );
        Ok(Attribute { id, name: attr.name })
    }

    async fn update_name(&self, id: i64, owner: i64, name: &str) -> Result<Option<Attribute>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state
            .attrs_mut(self.kind)
            .get_mut(&id)
            .filter(|attr| attr.owner == owner)
            .map(|attr| {
                attr.name = name.to_string();
                Attribute { id, name: attr.name.clone() }
            }))
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        let owned = state
            .attrs(self.kind)
            .get(&id)
            .is_some_and(|attr| attr.owner == owner);
        if !owned {
            return Ok(false);
        }
        state.attrs_mut(self.kind).remove(&id);
        for recipe in state.recipes.values_mut() {
            recipe.links_mut(self.kind).remove(&id);
        }
        Ok(true)
    }
}

#[async_trait]
impl RecipeRepository for MemoryStore {
    async fn list_by_owner(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError> {
        let state = self.state.read().await;
        let matches_any = |wanted: &[i64], linked: &BTreeSet<i64>| {
            wanted.is_empty() || wanted.iter().any(|id| linked.contains(id))
        };
        Ok(state
            .recipes
            .iter()
            .rev()
            .filter(|(_, recipe)| recipe.owner == owner)
            .filter(|(_, recipe)| matches_any(filter.tags.as_slice(), &recipe.tags))
            .filter(|(_, recipe)| matches_any(filter.ingredients.as_slice(), &recipe.ingredients))
            .map(|(id, recipe)| state.detail(*id, recipe).summary())
            .collect())
    }

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<RecipeDetail>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .recipes
            .get(&id)
            .filter(|recipe| recipe.owner == owner)
            .map(|recipe| state.detail(id, recipe)))
    }

    async fn create(&self, owner: i64, recipe: NewRecipe) -> Result<RecipeDetail, DatabaseError> {
        let mut state = self.state.write().await;
        let tags = state.resolve_attr_ids(AttrKind::Tag, owner, &recipe.tags);
        let ingredients = state.resolve_attr_ids(AttrKind::Ingredient, owner, &recipe.ingredients);
        let id = state.next_id("recipes");
        let stored = StoredRecipe {
            owner,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            description: recipe.description,
            tags,
            ingredients,
        };
        let detail = state.detail(id, &stored);
        state.recipes.insert(id, stored);
        Ok(detail)
    }

    async fn update(&self, id: i64, owner: i64, changes: RecipeChanges) -> Result<Option<RecipeDetail>, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.recipes.get(&id).is_some_and(|recipe| recipe.owner == owner) {
            return Ok(None);
        }

        let tags = changes
            .tags
            .as_deref()
            .map(|names| state.resolve_attr_ids(AttrKind::Tag, owner, names));
        let ingredients = changes
            .ingredients
            .as_deref()
            .map(|names| state.resolve_attr_ids(AttrKind::Ingredient, owner, names));

        let Some(recipe) = state.recipes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            recipe.title = title;
        }
        if let Some(time_minutes) = changes.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(link) = changes.link {
            recipe.link = link;
        }
        if let Some(description) = changes.description {
            recipe.description = description;
        }
        if let Some(tags) = tags {
            recipe.tags = tags;
        }
        if let Some(ingredients) = ingredients {
            recipe.ingredients = ingredients;
        }

        let recipe = recipe.clone();
        Ok(Some(state.detail(id, &recipe)))
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.recipes.get(&id).is_some_and(|recipe| recipe.owner == owner) {
            return Ok(false);
        }
        state.recipes.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_active(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).filter(|user| user.is_active).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(DatabaseError::Conflict(format!("user '{}' already exists", user.email)));
        }
        let id = state.next_id("users");
        let user = User {
            id,
            email: user.email,
            name: user.name,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
