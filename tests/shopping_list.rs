mod common;

use common::{recipe_input, seed_ingredient, seed_tag, seed_user};
use foodgram_sdk::{
    actions::{build_shopping_list, compose_recipe, toggle_membership},
    config::Limits,
    error::Error,
    schema::{MembershipKind, MembershipOp},
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn sums_cart_across_recipes(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "tsp").await;
    let flour = seed_ingredient(&pool, "flour", "cup").await;
    let tag = seed_tag(&pool, "baking", "#E26C2D").await;
    let limits = Limits::default();

    let a = compose_recipe(&chef, &recipe_input("A", &[(flour, 2), (salt, 1)], &[tag]), &limits, &pool, None)
        .await
        .unwrap();
    let b = compose_recipe(&chef, &recipe_input("B", &[(flour, 3)], &[tag]), &limits, &pool, None)
        .await
        .unwrap();
    for recipe in [&a, &b] {
        toggle_membership(MembershipKind::ShoppingCart, &chef, recipe.id, MembershipOp::Add, &pool)
            .await
            .unwrap();
    }

    let list = build_shopping_list(&chef, &pool).await.unwrap();
    let lines: Vec<(&str, i64)> = list
        .lines
        .iter()
        .map(|line| (line.name.as_str(), line.amount))
        .collect();
    assert_eq!(lines, vec![("flour", 5), ("salt", 1)]);

    assert_eq!(list.filename(), "chef_shopping_cart.txt");
    assert_eq!(
        list.to_string(),
        "Shopping list for: chef\n\n- flour (cup) - 5\n- salt (tsp) - 1"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn empty_cart_is_rejected(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;

    let result = build_shopping_list(&chef, &pool).await;
    assert!(matches!(result, Err(Error::EmptyShoppingList)));
}
