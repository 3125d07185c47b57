use log::debug;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::Error,
    session::SessionData,
    shopping_list::{aggregate, CartIngredient, ShoppingList},
};

use super::users::find_profile;

/// Every ingredient row of every recipe in the user's cart, unsummed.
pub async fn list_cart_ingredients(
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredient>, Error> {
    let rows: Vec<CartIngredient> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sums the caller's cart into a shopping list. An empty cart is an error.
pub async fn build_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let owner = find_profile(session.user_id, pool).await?;
    let rows = list_cart_ingredients(session.user_id, pool).await?;
    debug!(
        "Building shopping list of user {} from {} rows",
        session.user_id,
        rows.len()
    );

    ShoppingList::new(&owner, aggregate(rows))
}
