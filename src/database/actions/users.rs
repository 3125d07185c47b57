use log::{debug, warn};
use sqlx::{Pool, Postgres};

use crate::{
    authentication::cryptography::{hash_password, verify_password},
    constants::MAX_USERNAME_LENGTH,
    error::{Error, Missing, QueryError, ValidationError},
    pagination::{PageContext, PageRequest},
    schema::{NewUser, Profile, ProfileRow, User, UserPresentation, Uuid},
    session::SessionData,
    validation::{validate_email, validate_name, validate_username},
};

use super::subscriptions::{is_subscribed, subscribed_authors};

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Public profile of a user, failing with `NotFound` when there is none.
pub async fn find_profile(user_id: Uuid, pool: &Pool<Postgres>) -> Result<Profile, Error> {
    let row: Option<Profile> = sqlx::query_as(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.ok_or(Error::NotFound(Missing::User(user_id)))
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<Profile, Error> {
    validate_username(&user.username)?;
    validate_email(&user.email)?;
    validate_name(&user.first_name, MAX_USERNAME_LENGTH)?;
    validate_name(&user.last_name, MAX_USERNAME_LENGTH)?;
    if user.password.is_empty() {
        return Err(ValidationError::InvalidPassword.into());
    }

    let password = hash_password(&user.password)
        .map_err(|e| QueryError::new(format!("Could not hash password: {e}")))?;

    let row: Option<Profile> = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING id, username, email, first_name, last_name
    ",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await?;

    let profile = row.ok_or_else(|| Error::AlreadyExists(String::from("User")))?;
    debug!("Registered user {} ({})", profile.id, profile.username);

    Ok(profile)
}

/// Checks email and password, returning the caller's session on success.
pub async fn authenticate_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<SessionData, Error> {
    let user = match get_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Err(Error::Unauthenticated),
    };

    let authenticated = verify_password(password, &user.password).unwrap_or_else(|e| {
        warn!("Stored password hash of user {} is unreadable: {e}", user.id);
        false
    });
    if !authenticated {
        return Err(Error::Unauthenticated);
    }

    Ok(SessionData::from(&user))
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or(Error::NotFound(Missing::User(session.user_id)))?;

    if !verify_password(current_password, &user.password).unwrap_or(false) {
        return Err(ValidationError::InvalidPassword.into());
    }
    if new_password.is_empty() {
        return Err(ValidationError::InvalidPassword.into());
    }

    let password = hash_password(new_password)
        .map_err(|e| QueryError::new(format!("Could not hash password: {e}")))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await?;

    debug!("Changed password of user {}", user.id);
    Ok(())
}

pub async fn get_profile(
    user_id: Uuid,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserPresentation, Error> {
    let profile = find_profile(user_id, pool).await?;
    let is_subscribed = is_subscribed(viewer, user_id, pool).await?;

    Ok(UserPresentation {
        profile,
        is_subscribed,
    })
}

pub async fn count_users(pool: &Pool<Postgres>) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn list_users(
    viewer: Option<&SessionData>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserPresentation>, Error> {
    let rows: Vec<ProfileRow> = sqlx::query_as(
        "
        SELECT id, username, email, first_name, last_name, COUNT(*) OVER() AS count
        FROM users
        ORDER BY id
        LIMIT $1 OFFSET $2
    ",
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.page > 1 => count_users(pool).await?,
        None => 0,
    };
    let ids: Vec<Uuid> = rows.iter().map(|row| row.profile.id).collect();
    let subscribed = subscribed_authors(viewer, &ids, pool).await?;

    let users = rows
        .into_iter()
        .map(|row| UserPresentation {
            is_subscribed: subscribed.contains(&row.profile.id),
            profile: row.profile,
        })
        .collect();

    Ok(PageContext::from_rows(users, total_count, page))
}
