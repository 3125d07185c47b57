use log::{debug, warn};
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, Missing},
    pagination::{PageContext, PageRequest},
    schema::{
        Membership, MembershipKind, MembershipOp, MembershipOutcome, RecipeSummary, Uuid,
    },
    session::SessionData,
};

use super::recipes::get_recipe;

#[derive(sqlx::FromRow, Debug, Clone)]
struct RecipeSummaryRow {
    #[sqlx(flatten)]
    recipe: RecipeSummary,
    count: i64,
}

fn required_action(kind: MembershipKind) -> ActionType {
    match kind {
        MembershipKind::Favorite => ActionType::ManageOwnFavorites,
        MembershipKind::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

fn label(kind: MembershipKind) -> &'static str {
    match kind {
        MembershipKind::Favorite => "Favorite",
        MembershipKind::ShoppingCart => "Shopping cart entry",
    }
}

/// Adds or removes `recipe_id` in the caller's favorites or shopping cart.
///
/// Adding a pair that is already present fails with `AlreadyExists`, removing
/// one that isn't fails with `NotFound`. Neither changes any rows.
pub async fn toggle_membership(
    kind: MembershipKind,
    session: &SessionData,
    recipe_id: Uuid,
    op: MembershipOp,
    pool: &Pool<Postgres>,
) -> Result<MembershipOutcome, Error> {
    session.authenticate(required_action(kind))?;

    match op {
        MembershipOp::Add => add_membership(kind, session.user_id, recipe_id, pool)
            .await
            .map(MembershipOutcome::Added),
        MembershipOp::Remove => remove_membership(kind, session.user_id, recipe_id, pool)
            .await
            .map(|_| MembershipOutcome::Removed),
    }
}

pub async fn add_membership(
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Membership, Error> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound(Missing::Recipe(recipe_id)))?;

    // The unique (user_id, recipe_id) constraint decides concurrent adds.
    let row: Option<(i32,)> = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    let id = match row {
        Some((id,)) => id,
        None => {
            warn!("{} of recipe {recipe_id} for user {user_id} already exists", label(kind));
            return Err(Error::AlreadyExists(label(kind).to_owned()));
        }
    };
    debug!("Added recipe {recipe_id} to {} of user {user_id}", kind.table());

    Ok(Membership {
        id,
        user_id,
        kind,
        recipe: RecipeSummary::from(&recipe),
    })
}

pub async fn remove_membership(
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound(Missing::Recipe(recipe_id)))?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!("Recipe {recipe_id} is not in {} of user {user_id}", kind.table());
        return Err(Error::NotFound(Missing::Membership(kind)));
    }
    debug!("Removed recipe {recipe_id} from {} of user {user_id}", kind.table());

    Ok(())
}

pub async fn is_member(
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Reads `favorites`; false for anonymous viewers.
pub async fn compute_is_favorited(
    viewer: Option<&SessionData>,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    match viewer {
        Some(viewer) => is_member(MembershipKind::Favorite, viewer.user_id, recipe_id, pool).await,
        None => Ok(false),
    }
}

/// Reads `shopping_cart`; false for anonymous viewers.
pub async fn compute_is_in_shopping_cart(
    viewer: Option<&SessionData>,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    match viewer {
        Some(viewer) => {
            is_member(MembershipKind::ShoppingCart, viewer.user_id, recipe_id, pool).await
        }
        None => Ok(false),
    }
}

pub async fn count_memberships(
    kind: MembershipKind,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1",
        kind.table()
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// The caller's favorites or cart, most recently added first.
pub async fn list_memberships(
    kind: MembershipKind,
    session: &SessionData,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeSummary>, Error> {
    let rows: Vec<RecipeSummaryRow> = sqlx::query_as(&format!(
        "
        SELECT r.id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count
        FROM {} m
        INNER JOIN recipes r ON r.id = m.recipe_id
        WHERE m.user_id = $1
        ORDER BY m.id DESC
        LIMIT $2 OFFSET $3
    ",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_memberships(kind, session.user_id, pool).await?,
        None => 0,
    };
    let recipes = rows.into_iter().map(|row| row.recipe).collect();

    Ok(PageContext::from_rows(recipes, total_count, page))
}
