use log::debug;
use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{invalidate_after_write, CacheKeyType, CacheLifetime, RedisValue},
    constants::MAX_NAME_LENGTH,
    error::{Error, Missing},
    schema::{Tag, Uuid},
    session::SessionData,
    validation::{validate_color, validate_name, validate_slug},
};

pub async fn create_tag(
    session: &SessionData,
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageCatalog)?;
    validate_name(name, MAX_NAME_LENGTH)?;
    validate_color(color)?;
    validate_slug(slug)?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(name.trim())
    .bind(color)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    let tag = tag.ok_or_else(|| Error::AlreadyExists(format!("Tag '{slug}'")))?;
    debug!("Created tag {} ({})", tag.id, tag.slug);

    invalidate_after_write(CacheLifetime::BindCatalogCache, cache).await;
    Ok(tag)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    tag.ok_or(Error::NotFound(Missing::Tag(id)))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, Error> {
    let cached =
        RedisValue::get_or(CacheKeyType::Tags.new("all"), cache, || list_tags(pool)).await?;

    Ok(cached.value)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}
