use log::debug;
use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{invalidate_after_write, CacheKeyType, CacheLifetime, RedisValue},
    constants::MAX_NAME_LENGTH,
    error::{Error, Missing},
    schema::{Ingredient, Uuid},
    session::SessionData,
    validation::validate_name,
};

/// Lists the catalog, optionally narrowed to names starting with `prefix`.
pub async fn list_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let list: Vec<Ingredient> = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE starts_with(name, $1) ORDER BY name, id")
                .bind(prefix)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(list)
}

pub async fn list_ingredients_cached(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, Error> {
    let key = CacheKeyType::Ingredients.new(prefix.unwrap_or_default().to_owned());
    let cached = RedisValue::get_or(key, cache, || list_ingredients(prefix, pool)).await?;

    Ok(cached.value)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, Error> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    ingredient.ok_or(Error::NotFound(Missing::Ingredient(id)))
}

pub async fn create_ingredient(
    session: &SessionData,
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageCatalog)?;
    validate_name(name, MAX_NAME_LENGTH)?;
    validate_name(measurement_unit, MAX_NAME_LENGTH)?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(name.trim())
    .bind(measurement_unit.trim())
    .fetch_one(pool)
    .await?;

    debug!("Created ingredient {} ({})", ingredient.id, ingredient.name);

    invalidate_after_write(CacheLifetime::BindCatalogCache, cache).await;
    Ok(ingredient)
}
