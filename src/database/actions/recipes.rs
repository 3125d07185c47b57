use std::collections::HashMap;

use log::{debug, info};
use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{invalidate_after_write, CacheKeyType, CacheLifetime, RedisValue},
    config::Limits,
    error::{Error, Missing, QueryError},
    pagination::{PageContext, PageRequest},
    schema::{
        IngredientAmount, Recipe, RecipeDetails, RecipeFilter, RecipeIngredient, RecipeInput,
        RecipePresentation, RecipeRow, Tag, UserPresentation, Uuid,
    },
    session::SessionData,
    validation::validate_recipe,
};

use super::{
    membership::{compute_is_favorited, compute_is_in_shopping_cart},
    subscriptions::is_subscribed,
    tags::list_recipe_tags,
    users::find_profile,
};

/// Creates a recipe together with its ingredient amounts and tags.
///
/// The input is validated before anything is written. The recipe row and
/// both association sets are written in one transaction, so a failure at any
/// point leaves no trace of the recipe.
pub async fn compose_recipe(
    session: &SessionData,
    input: &RecipeInput,
    limits: &Limits,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    validate_recipe(input, limits)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(input.name.trim())
    .bind(&input.text)
    .bind(&input.image)
    .bind(input.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    replace_ingredients(recipe.id, &input.ingredients, &mut tr).await?;
    replace_tags(recipe.id, &input.tags, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    info!("User {} created recipe {}", session.user_id, recipe.id);

    invalidate_after_write(CacheLifetime::BindRecipeCache, cache).await;
    Ok(recipe)
}

/// Replaces every field and both association sets of an existing recipe.
/// An empty `image` keeps the stored one.
pub async fn recompose_recipe(
    id: Uuid,
    session: &SessionData,
    input: &RecipeInput,
    limits: &Limits,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Recipe, Error> {
    get_recipe_mut(id, session, pool).await?;
    validate_recipe(input, limits)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes
        SET name = $1,
            text = $2,
            image = CASE WHEN $3 = '' THEN image ELSE $3 END,
            cooking_time = $4
        WHERE id = $5
        RETURNING *
    ",
    )
    .bind(input.name.trim())
    .bind(&input.text)
    .bind(&input.image)
    .bind(input.cooking_time)
    .bind(id)
    .fetch_optional(&mut *tr)
    .await?;
    // deleted since get_recipe_mut
    let recipe = recipe.ok_or(Error::NotFound(Missing::Recipe(id)))?;

    replace_ingredients(recipe.id, &input.ingredients, &mut tr).await?;
    replace_tags(recipe.id, &input.tags, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    info!("User {} updated recipe {}", session.user_id, recipe.id);

    invalidate_after_write(CacheLifetime::BindRecipeCache, cache).await;
    Ok(recipe)
}

/// Orders ingredient amounts by ingredient name, then id.
/// Fails on the first id missing from `names`.
fn order_by_ingredient_name(
    parts: &[IngredientAmount],
    names: &HashMap<Uuid, String>,
) -> Result<Vec<IngredientAmount>, Error> {
    let mut ordered = Vec::with_capacity(parts.len());
    for part in parts {
        let name = names
            .get(&part.id)
            .ok_or(Error::NotFound(Missing::Ingredient(part.id)))?;
        ordered.push((name, *part));
    }
    ordered.sort_by(|(a, x), (b, y)| a.cmp(b).then(x.id.cmp(&y.id)));

    Ok(ordered.into_iter().map(|(_, part)| part).collect())
}

async fn replace_ingredients(
    recipe_id: Uuid,
    parts: &[IngredientAmount],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let ids: Vec<Uuid> = parts.iter().map(|part| part.id).collect();
    let names: Vec<(i32, String)> =
        sqlx::query_as("SELECT id, name FROM ingredients WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut **tr)
            .await?;
    let parts = order_by_ingredient_name(parts, &names.into_iter().collect())?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await?;

    if !parts.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

        query_builder.push_values(parts.iter(), |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.id)
                .push_bind(part.amount);
        });

        query_builder.build().execute(&mut **tr).await?;
    }

    Ok(())
}

async fn replace_tags(
    recipe_id: Uuid,
    tags: &[Uuid],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let known: Vec<(i32,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_all(&mut **tr)
        .await?;
    if let Some(missing) = tags.iter().find(|id| !known.iter().any(|row| row.0 == **id)) {
        return Err(Error::NotFound(Missing::Tag(*missing)));
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await?;

    if !tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder.build().execute(&mut **tr).await?;
    }

    Ok(())
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe the caller is allowed to change: their own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(Error::NotFound(Missing::Recipe(id)))?;

    match recipe.author_id == Some(session.user_id) {
        true => session.authenticate(ActionType::ManageOwnRecipes)?,
        false => session.authenticate(ActionType::ManageAllRecipes)?,
    }

    Ok(recipe)
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<(), Error> {
    get_recipe_mut(id, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM shopping_cart WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;
    info!("User {} deleted recipe {}", session.user_id, id);

    invalidate_after_write(CacheLifetime::BindRecipeCache, cache).await;
    Ok(())
}

/// Ingredients of a recipe in stored order, which is by ingredient name.
pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn load_details(recipe: Recipe, pool: &Pool<Postgres>) -> Result<RecipeDetails, Error> {
    let author = match recipe.author_id {
        Some(author_id) => Some(find_profile(author_id, pool).await?),
        None => None,
    };
    let tags: Vec<Tag> = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;

    Ok(RecipeDetails {
        recipe,
        author,
        tags,
        ingredients,
    })
}

pub async fn fetch_recipe_details(id: Uuid, pool: &Pool<Postgres>) -> Result<RecipeDetails, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or(Error::NotFound(Missing::Recipe(id)))?;

    load_details(recipe, pool).await
}

pub async fn fetch_recipe_details_cached(
    id: Uuid,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<RecipeDetails, Error> {
    let cached = RedisValue::get_or(CacheKeyType::Recipe.new(id), cache, || {
        fetch_recipe_details(id, pool)
    })
    .await?;

    Ok(cached.value)
}

/// Adds the viewer dependent parts to a recipe.
pub async fn present_recipe(
    details: RecipeDetails,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipePresentation, Error> {
    let author = match &details.author {
        Some(profile) => Some(UserPresentation {
            profile: profile.to_owned(),
            is_subscribed: is_subscribed(viewer, profile.id, pool).await?,
        }),
        None => None,
    };
    let is_favorited = compute_is_favorited(viewer, details.recipe.id, pool).await?;
    let is_in_shopping_cart = compute_is_in_shopping_cart(viewer, details.recipe.id, pool).await?;

    Ok(RecipePresentation::new(
        details,
        author,
        is_favorited,
        is_in_shopping_cart,
    ))
}

pub async fn get_recipe_presentation(
    id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<RecipePresentation, Error> {
    let details = match cache {
        Some(cache) => fetch_recipe_details_cached(id, pool, cache).await?,
        None => fetch_recipe_details(id, pool).await?,
    };

    present_recipe(details, viewer, pool).await
}

/// Appends the `WHERE` conditions of `filter` to a query over `recipes r`.
///
/// Tags match any of the given slugs. `is_favorited` and `is_in_shopping_cart`
/// only narrow the list when there is a viewer.
fn push_recipe_filter(
    query_builder: &mut QueryBuilder<'_, Postgres>,
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
) {
    query_builder.push(" WHERE TRUE");

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
    }
}

pub async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_recipe_filter(&mut query_builder, filter, viewer);

    let row: (i64,) = query_builder.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Lists recipes newest first.
pub async fn list_recipes(
    filter: &RecipeFilter,
    page: PageRequest,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipePresentation>, Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r");
    push_recipe_filter(&mut query_builder, filter, viewer);

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = query_builder.build_query_as().fetch_all(pool).await?;
    debug!("Listed {} recipes with {filter:?}", rows.len());

    // Past the last page the window count has no row to ride on.
    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_recipes(filter, viewer, pool).await?,
        None => 0,
    };
    let mut recipes = Vec::with_capacity(rows.len());
    for row in rows {
        let details = load_details(row.recipe, pool).await?;
        recipes.push(present_recipe(details, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(recipes, total_count, page))
}
