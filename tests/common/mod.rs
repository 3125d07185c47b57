//! Seed helpers shared by the database integration tests.
//!
//! The tests need a PostgreSQL server reachable through `DATABASE_URL`;
//! `sqlx::test` creates a fresh database per test and runs `migrations/`.
//! Run with: `cargo test -- --ignored`

#![allow(dead_code)]

use foodgram_sdk::{
    schema::{IngredientAmount, RecipeInput, UserRole, Uuid},
    session::SessionData,
};
use sqlx::PgPool;

pub async fn seed_user(pool: &PgPool, username: &str) -> SessionData {
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (username, email, first_name, last_name, password)
         VALUES ($1, $2, '', '', 'not-a-hash')
         RETURNING id",
    )
    .bind(username)
    .bind(format!("{username}@example.com"))
    .fetch_one(pool)
    .await
    .unwrap();

    SessionData::new(id, username.to_string(), UserRole::User)
}

pub async fn seed_ingredient(pool: &PgPool, name: &str, unit: &str) -> Uuid {
    let (id,): (i32,) =
        sqlx::query_as("INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(unit)
            .fetch_one(pool)
            .await
            .unwrap();

    id
}

pub async fn seed_tag(pool: &PgPool, slug: &str, color: &str) -> Uuid {
    let (id,): (i32,) =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $1) RETURNING id")
            .bind(slug)
            .bind(color)
            .fetch_one(pool)
            .await
            .unwrap();

    id
}

pub fn recipe_input(name: &str, ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> RecipeInput {
    RecipeInput {
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
        image: String::from("recipes/images/test.png"),
        name: name.to_string(),
        text: String::from("Mix everything"),
        cooking_time: 15,
    }
}

pub async fn count(pool: &PgPool, table: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();

    count
}
