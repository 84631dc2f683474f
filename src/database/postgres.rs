use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use tracing::debug;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::repository::{AttrRepository, HealthCheck, RecipeRepository, UserRepository};
use crate::models::{
    AttrKind, Attribute, NewAttr, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeDetail, RecipeFilter, User,
};

/// PostgreSQL implementation of the tag / ingredient repository.
/// Table names come from `AttrKind`, never from request input.
pub struct PgAttrRepository {
    kind: AttrKind,
    pool: PgPool,
}

impl PgAttrRepository {
    pub fn new(kind: AttrKind, pool: PgPool) -> Self {
        Self { kind, pool }
    }
}

#[async_trait]
impl AttrRepository for PgAttrRepository {
    fn kind(&self) -> AttrKind {
        self.kind
    }

    async fn list_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError> {
        let sql = format!(
            "SELECT id, name FROM {} WHERE user_id = $1 ORDER BY name DESC, id DESC",
            self.kind.table()
        );
        let rows = sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        debug!("Listed {} {} rows for user {}", rows.len(), self.kind.table(), owner);
        Ok(rows)
    }

    async fn list_assigned_by_owner(&self, owner: i64) -> Result<Vec<Attribute>, DatabaseError> {
        // EXISTS rather than a join so an attribute on several recipes appears once
        let sql = format!(
            r#"
            SELECT a.id, a.name
            FROM {table} a
            WHERE a.user_id = $1
              AND EXISTS (
                  SELECT 1
                  FROM {link} l
                  JOIN recipes r ON r.id = l.recipe_id
                  WHERE l.{column} = a.id AND r.user_id = $1
              )
            ORDER BY a.name DESC, a.id DESC
            "#,
            table = self.kind.table(),
            link = self.kind.link_table(),
            column = self.kind.link_column(),
        );
        let rows = sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        debug!("Listed {} assigned {} rows for user {}", rows.len(), self.kind.table(), owner);
        Ok(rows)
    }

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<Attribute>, DatabaseError> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1 AND user_id = $2", self.kind.table());
        Ok(sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create(&self, owner: i64, attr: NewAttr) -> Result<Attribute, DatabaseError> {
        let sql = format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, name",
            self.kind.table()
        );
        Ok(sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .bind(&attr.name)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_name(&self, id: i64, owner: i64, name: &str) -> Result<Option<Attribute>, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, name",
            self.kind.table()
        );
        Ok(sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError> {
        // Link rows go with it through ON DELETE CASCADE
        let sql = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", self.kind.table());
        let result = sqlx::query(&sql).bind(id).bind(owner).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: i64,
    title: String,
    time_minutes: i32,
    price: Decimal,
    link: String,
    description: String,
}

impl RecipeRow {
    fn into_detail(self, tags: Vec<Attribute>, ingredients: Vec<Attribute>) -> RecipeDetail {
        RecipeDetail {
            recipe: Recipe {
                id: self.id,
                title: self.title,
                time_minutes: self.time_minutes,
                price: self.price,
                link: self.link,
                tags,
                ingredients,
            },
            description: self.description,
        }
    }
}

const RECIPE_COLUMNS: &str = "id, title, time_minutes, price, link, description";

/// PostgreSQL implementation of the recipe and user repositories
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attributes linked to each of `recipe_ids`, name ascending
    async fn load_links(
        conn: &mut PgConnection,
        kind: AttrKind,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Attribute>>, DatabaseError> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            r#"
            SELECT l.recipe_id, a.id, a.name
            FROM {link} l
            JOIN {table} a ON a.id = l.{column}
            WHERE l.recipe_id = ANY($1)
            ORDER BY a.name, a.id
            "#,
            link = kind.link_table(),
            table = kind.table(),
            column = kind.link_column(),
        );
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(&sql)
            .bind(recipe_ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut links: HashMap<i64, Vec<Attribute>> = HashMap::new();
        for (recipe_id, id, name) in rows {
            links.entry(recipe_id).or_default().push(Attribute { id, name });
        }
        Ok(links)
    }

    async fn load_detail(
        conn: &mut PgConnection,
        id: i64,
        owner: i64,
    ) -> Result<Option<RecipeDetail>, DatabaseError> {
        let sql = format!("SELECT {} FROM recipes WHERE id = $1 AND user_id = $2", RECIPE_COLUMNS);
        let Some(row) = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let mut tags = Self::load_links(conn, AttrKind::Tag, &[id]).await?;
        let mut ingredients = Self::load_links(conn, AttrKind::Ingredient, &[id]).await?;
        Ok(Some(row.into_detail(
            tags.remove(&id).unwrap_or_default(),
            ingredients.remove(&id).unwrap_or_default(),
        )))
    }

    /// Looks up each name among the owner's rows, creating the missing ones.
    /// Only the owner's rows are considered, so links never cross users.
    async fn resolve_attr_ids(
        conn: &mut PgConnection,
        kind: AttrKind,
        owner: i64,
        names: &[String],
    ) -> Result<Vec<i64>, DatabaseError> {
        let select = format!(
            "SELECT id FROM {} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1",
            kind.table()
        );
        let insert = format!("INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id", kind.table());

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let existing: Option<i64> = sqlx::query_scalar(&select)
                .bind(owner)
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
            let id = match existing {
                Some(id) => id,
                None => {
                    sqlx::query_scalar(&insert)
                        .bind(owner)
                        .bind(name)
                        .fetch_one(&mut *conn)
                        .await?
                }
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Replaces the recipe's links for one attribute kind
    async fn replace_links(
        conn: &mut PgConnection,
        kind: AttrKind,
        owner: i64,
        recipe_id: i64,
        names: &[String],
    ) -> Result<(), DatabaseError> {
        let clear = format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table());
        sqlx::query(&clear).bind(recipe_id).execute(&mut *conn).await?;

        let ids = Self::resolve_attr_ids(conn, kind, owner, names).await?;
        if ids.is_empty() {
            return Ok(());
        }
        let link = format!(
            "INSERT INTO {link} (recipe_id, {column}) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            link = kind.link_table(),
            column = kind.link_column(),
        );
        sqlx::query(&link).bind(recipe_id).bind(&ids).execute(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeRepository for PgStore {
    async fn list_by_owner(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {columns}
            FROM recipes r
            WHERE r.user_id = $1
              AND (cardinality($2::bigint[]) = 0 OR EXISTS (
                  SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
              ))
              AND (cardinality($3::bigint[]) = 0 OR EXISTS (
                  SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)
              ))
            ORDER BY r.id DESC
            "#,
            columns = RECIPE_COLUMNS,
        );

        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(owner)
            .bind(&filter.tags)
            .bind(&filter.ingredients)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut tags = Self::load_links(&mut conn, AttrKind::Tag, &ids).await?;
        let mut ingredients = Self::load_links(&mut conn, AttrKind::Ingredient, &ids).await?;

        let recipes: Vec<Recipe> = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_detail(
                    tags.remove(&id).unwrap_or_default(),
                    ingredients.remove(&id).unwrap_or_default(),
                )
                .summary()
            })
            .collect();
        debug!("Listed {} recipes for user {}", recipes.len(), owner);
        Ok(recipes)
    }

    async fn find_by_id_and_owner(&self, id: i64, owner: i64) -> Result<Option<RecipeDetail>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::load_detail(&mut conn, id, owner).await
    }

    async fn create(&self, owner: i64, recipe: NewRecipe) -> Result<RecipeDetail, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price, link, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&recipe.title)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.link)
        .bind(&recipe.description)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_links(&mut tx, AttrKind::Tag, owner, id, &recipe.tags).await?;
        Self::replace_links(&mut tx, AttrKind::Ingredient, owner, id, &recipe.ingredients).await?;

        let detail = Self::load_detail(&mut tx, id, owner)
            .await?
            .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))?;
        tx.commit().await?;

        debug!("Created recipe {} for user {}", id, owner);
        Ok(detail)
    }

    async fn update(&self, id: i64, owner: i64, changes: RecipeChanges) -> Result<Option<RecipeDetail>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE recipes SET
                title = COALESCE($3, title),
                time_minutes = COALESCE($4, time_minutes),
                price = COALESCE($5, price),
                link = COALESCE($6, link),
                description = COALESCE($7, description)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&changes.title)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(&changes.link)
        .bind(&changes.description)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(tags) = &changes.tags {
            Self::replace_links(&mut tx, AttrKind::Tag, owner, id, tags).await?;
        }
        if let Some(ingredients) = &changes.ingredients {
            Self::replace_links(&mut tx, AttrKind::Ingredient, owner, id, ingredients).await?;
        }

        let detail = Self::load_detail(&mut tx, id, owner).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_active(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, name, is_active, created_at FROM users WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, name, is_active, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, is_active, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::Conflict(format!("user '{}' already exists", user.email))
            }
            other => DatabaseError::Sqlx(other),
        })
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
