mod common;

use common::{count, recipe_input, seed_ingredient, seed_tag, seed_user};
use foodgram_sdk::{
    actions::{
        compose_recipe, delete_recipe, get_recipe_presentation, list_recipe_ingredients,
        list_recipe_tags, list_recipes, recompose_recipe, toggle_membership,
    },
    config::{Limits, Pagination},
    error::{Error, Missing, ValidationError},
    pagination::PageRequest,
    schema::{MembershipKind, MembershipOp, RecipeFilter, UserRole},
    session::SessionData,
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn compose_persists_exact_sets(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let flour = seed_ingredient(&pool, "flour", "g").await;
    let breakfast = seed_tag(&pool, "breakfast", "#E26C2D").await;
    let lunch = seed_tag(&pool, "lunch", "#49B64E").await;

    let input = recipe_input("Bread", &[(salt, 10), (flour, 500)], &[lunch, breakfast]);
    let recipe = compose_recipe(&chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();

    assert_eq!(recipe.author_id, Some(chef.user_id));
    assert_eq!(recipe.name, "Bread");

    let ingredients = list_recipe_ingredients(recipe.id, &pool).await.unwrap();
    let stored: Vec<(i32, i32)> = ingredients.iter().map(|i| (i.id, i.amount)).collect();
    // stored by ingredient name
    assert_eq!(stored, vec![(flour, 500), (salt, 10)]);

    let mut tags: Vec<i32> = list_recipe_tags(recipe.id, &pool)
        .await
        .unwrap()
        .iter()
        .map(|tag| tag.id)
        .collect();
    tags.sort();
    let mut expected = vec![breakfast, lunch];
    expected.sort();
    assert_eq!(tags, expected);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn invalid_input_persists_nothing(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let empty = recipe_input("Nothing", &[], &[tag]);
    let result = compose_recipe(&chef, &empty, &Limits::default(), &pool, None).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::IngredientsRequired))
    ));

    let repeated = recipe_input("Salty", &[(salt, 1), (salt, 2)], &[tag]);
    let result = compose_recipe(&chef, &repeated, &Limits::default(), &pool, None).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::DuplicateIngredient(id))) if id == salt
    ));

    assert_eq!(count(&pool, "recipes").await, 0);
    assert_eq!(count(&pool, "recipe_ingredients").await, 0);
    assert_eq!(count(&pool, "recipe_tags").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn unknown_references_roll_back(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let input = recipe_input("Ghost", &[(salt, 1), (salt + 100, 1)], &[tag]);
    let result = compose_recipe(&chef, &input, &Limits::default(), &pool, None).await;
    assert!(matches!(
        result,
        Err(Error::NotFound(Missing::Ingredient(id))) if id == salt + 100
    ));

    let input = recipe_input("Ghost", &[(salt, 1)], &[tag, tag + 100]);
    let result = compose_recipe(&chef, &input, &Limits::default(), &pool, None).await;
    assert!(matches!(result, Err(Error::NotFound(Missing::Tag(_)))));

    assert_eq!(count(&pool, "recipes").await, 0);
    assert_eq!(count(&pool, "recipe_ingredients").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn duplicate_name_is_already_exists(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let input = recipe_input("Soup", &[(salt, 1)], &[tag]);
    compose_recipe(&chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();
    let result = compose_recipe(&chef, &input, &Limits::default(), &pool, None).await;

    assert!(matches!(result, Err(Error::AlreadyExists(_))));
    assert_eq!(count(&pool, "recipes").await, 1);
    assert_eq!(count(&pool, "recipe_ingredients").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn recompose_replaces_everything(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let flour = seed_ingredient(&pool, "flour", "g").await;
    let water = seed_ingredient(&pool, "water", "ml").await;
    let breakfast = seed_tag(&pool, "breakfast", "#E26C2D").await;
    let dinner = seed_tag(&pool, "dinner", "#8775D2").await;

    let input = recipe_input("Bread", &[(salt, 10), (flour, 500)], &[breakfast]);
    let recipe = compose_recipe(&chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();

    let mut input = recipe_input("Flatbread", &[(water, 200), (flour, 300)], &[dinner]);
    input.image = String::new();
    let updated = recompose_recipe(recipe.id, &chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();

    assert_eq!(updated.id, recipe.id);
    assert_eq!(updated.name, "Flatbread");
    assert_eq!(updated.image, recipe.image);

    let ingredients = list_recipe_ingredients(recipe.id, &pool).await.unwrap();
    let stored: Vec<(i32, i32)> = ingredients.iter().map(|i| (i.id, i.amount)).collect();
    assert_eq!(stored, vec![(flour, 300), (water, 200)]);

    let tags = list_recipe_tags(recipe.id, &pool).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, dinner);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn only_author_or_admin_may_change(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let other = seed_user(&pool, "other").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let input = recipe_input("Soup", &[(salt, 1)], &[tag]);
    let recipe = compose_recipe(&chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();

    let result = delete_recipe(recipe.id, &other, &pool, None).await;
    assert!(matches!(result, Err(Error::Forbidden)));

    let admin = SessionData::new(other.user_id, other.username, UserRole::Admin);
    let input = recipe_input("Broth", &[(salt, 2)], &[tag]);
    recompose_recipe(recipe.id, &admin, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn delete_cascades(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let input = recipe_input("Soup", &[(salt, 1)], &[tag]);
    let recipe = compose_recipe(&chef, &input, &Limits::default(), &pool, None)
        .await
        .unwrap();
    toggle_membership(MembershipKind::Favorite, &chef, recipe.id, MembershipOp::Add, &pool)
        .await
        .unwrap();
    toggle_membership(MembershipKind::ShoppingCart, &chef, recipe.id, MembershipOp::Add, &pool)
        .await
        .unwrap();

    delete_recipe(recipe.id, &chef, &pool, None).await.unwrap();

    for table in ["recipes", "recipe_ingredients", "recipe_tags", "favorites", "shopping_cart"] {
        assert_eq!(count(&pool, table).await, 0, "{table} not empty");
    }
    assert!(matches!(
        delete_recipe(recipe.id, &chef, &pool, None).await,
        Err(Error::NotFound(Missing::Recipe(_)))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn list_filters_use_their_own_relation(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let breakfast = seed_tag(&pool, "breakfast", "#E26C2D").await;
    let dinner = seed_tag(&pool, "dinner", "#8775D2").await;

    let limits = Limits::default();
    let porridge = compose_recipe(&chef, &recipe_input("Porridge", &[(salt, 1)], &[breakfast]), &limits, &pool, None)
        .await
        .unwrap();
    let stew = compose_recipe(&chef, &recipe_input("Stew", &[(salt, 2)], &[dinner]), &limits, &pool, None)
        .await
        .unwrap();

    toggle_membership(MembershipKind::Favorite, &chef, porridge.id, MembershipOp::Add, &pool)
        .await
        .unwrap();
    toggle_membership(MembershipKind::ShoppingCart, &chef, stew.id, MembershipOp::Add, &pool)
        .await
        .unwrap();

    let page = PageRequest::new(None, None, &Pagination::default());

    let all = list_recipes(&RecipeFilter::default(), page, Some(&chef), &pool)
        .await
        .unwrap();
    // newest first
    assert_eq!(
        all.rows.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![stew.id, porridge.id]
    );
    assert_eq!(all.total_rows, 2);

    let filter = RecipeFilter {
        is_favorited: true,
        ..RecipeFilter::default()
    };
    let favorites = list_recipes(&filter, page, Some(&chef), &pool).await.unwrap();
    assert_eq!(favorites.rows.len(), 1);
    assert_eq!(favorites.rows[0].id, porridge.id);
    assert!(favorites.rows[0].is_favorited);
    assert!(!favorites.rows[0].is_in_shopping_cart);

    let filter = RecipeFilter {
        is_in_shopping_cart: true,
        ..RecipeFilter::default()
    };
    let cart = list_recipes(&filter, page, Some(&chef), &pool).await.unwrap();
    assert_eq!(cart.rows.len(), 1);
    assert_eq!(cart.rows[0].id, stew.id);
    assert!(cart.rows[0].is_in_shopping_cart);
    assert!(!cart.rows[0].is_favorited);

    let filter = RecipeFilter {
        tags: vec![String::from("dinner")],
        ..RecipeFilter::default()
    };
    let dinners = list_recipes(&filter, page, None, &pool).await.unwrap();
    assert_eq!(dinners.rows.len(), 1);
    assert_eq!(dinners.rows[0].id, stew.id);

    // anonymous viewers are not narrowed by relation filters
    let filter = RecipeFilter {
        is_favorited: true,
        ..RecipeFilter::default()
    };
    let anonymous = list_recipes(&filter, page, None, &pool).await.unwrap();
    assert_eq!(anonymous.total_rows, 2);
    assert!(anonymous.rows.iter().all(|r| !r.is_favorited));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn presentation_reflects_viewer(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let reader = seed_user(&pool, "reader").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;

    let recipe = compose_recipe(&chef, &recipe_input("Soup", &[(salt, 3)], &[tag]), &Limits::default(), &pool, None)
        .await
        .unwrap();
    toggle_membership(MembershipKind::Favorite, &reader, recipe.id, MembershipOp::Add, &pool)
        .await
        .unwrap();

    let seen = get_recipe_presentation(recipe.id, Some(&reader), &pool, None)
        .await
        .unwrap();
    assert!(seen.is_favorited);
    assert!(!seen.is_in_shopping_cart);
    assert_eq!(seen.ingredients[0].amount, 3);
    assert_eq!(seen.author.as_ref().map(|a| a.profile.id), Some(chef.user_id));

    let seen = get_recipe_presentation(recipe.id, Some(&chef), &pool, None)
        .await
        .unwrap();
    assert!(!seen.is_favorited);

    let missing = get_recipe_presentation(recipe.id + 1, None, &pool, None).await;
    assert!(matches!(missing, Err(Error::NotFound(Missing::Recipe(_)))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires running PostgreSQL instance"]
async fn recompose_of_concurrently_deleted_recipe_is_not_found(pool: PgPool) {
    let chef = seed_user(&pool, "chef").await;
    let salt = seed_ingredient(&pool, "salt", "g").await;
    let tag = seed_tag(&pool, "dinner", "#8775D2").await;
    let recipe_id = compose_recipe(&chef, &recipe_input("Soup", &[(salt, 1)], &[tag]), &Limits::default(), &pool, None)
        .await
        .unwrap()
        .id;

    // holds the row lock, so the update below waits until the delete commits
    let mut deleting = pool.begin().await.unwrap();
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut *deleting)
        .await
        .unwrap();

    let task = tokio::spawn({
        let pool = pool.clone();
        let input = recipe_input("Broth", &[(salt, 2)], &[tag]);
        async move { recompose_recipe(recipe_id, &chef, &input, &Limits::default(), &pool, None).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    deleting.commit().await.unwrap();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(Error::NotFound(Missing::Recipe(id))) if id == recipe_id));
    assert_eq!(count(&pool, "recipes").await, 0);
}
