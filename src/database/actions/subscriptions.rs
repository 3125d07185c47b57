use std::collections::HashSet;

use log::{debug, warn};
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{Error, Missing},
    pagination::{PageContext, PageRequest},
    schema::{Profile, ProfileRow, RecipeSummary, SubscriptionView, UserPresentation, Uuid},
    session::SessionData,
};

use super::users::find_profile;

/// Subscribes the caller to `author_id` and returns the author's view.
pub async fn subscribe(
    session: &SessionData,
    author_id: Uuid,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    if session.user_id == author_id {
        warn!("User {} tried to subscribe to themselves", session.user_id);
        return Err(Error::SelfReference);
    }
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let author = find_profile(author_id, pool).await?;

    let row: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO subscriptions (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    if row.is_none() {
        warn!(
            "User {} is already subscribed to {}",
            session.user_id, author_id
        );
        return Err(Error::AlreadyExists(String::from("Subscription")));
    }
    debug!("User {} subscribed to {}", session.user_id, author_id);

    subscriber_view(author, true, recipes_limit, pool).await
}

pub async fn unsubscribe(
    session: &SessionData,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    find_profile(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(
            "User {} is not subscribed to {}",
            session.user_id, author_id
        );
        return Err(Error::NotFound(Missing::Subscription(author_id)));
    }
    debug!("User {} unsubscribed from {}", session.user_id, author_id);

    Ok(())
}

/// Always false for anonymous viewers.
pub async fn is_subscribed(
    viewer: Option<&SessionData>,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return Ok(false),
    };

    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(viewer.user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// The subset of `author_ids` the viewer is subscribed to.
pub async fn subscribed_authors(
    viewer: Option<&SessionData>,
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Uuid>, Error> {
    let viewer = match viewer {
        Some(viewer) if !author_ids.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };

    let rows: Vec<(i32,)> = sqlx::query_as(
        "SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = ANY($2)",
    )
    .bind(viewer.user_id)
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Recipes of an author, newest first.
pub async fn list_author_recipes(
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeSummary>, Error> {
    let rows: Vec<RecipeSummary> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 ORDER BY id DESC",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn subscriber_view(
    author: Profile,
    is_subscribed: bool,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, Error> {
    let recipes = list_author_recipes(author.id, pool).await?;

    Ok(SubscriptionView::new(
        UserPresentation {
            profile: author,
            is_subscribed,
        },
        recipes,
        recipes_limit,
    ))
}

pub async fn count_subscriptions(user_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Authors the caller follows, oldest subscription first.
pub async fn list_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, Error> {
    let rows: Vec<ProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_subscriptions(session.user_id, pool).await?,
        None => 0,
    };

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(subscriber_view(row.profile, true, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}
