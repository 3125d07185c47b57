use serde::{Deserialize, Serialize};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

/// Public part of a user, safe to hand out to other users.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Profile {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();

        if name.is_empty() {
            self.username.to_owned()
        } else {
            name.to_owned()
        }
    }
}

impl From<User> for Profile {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ProfileRow {
    #[sqlx(flatten)]
    pub profile: Profile,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPresentation {
    #[serde(flatten)]
    pub profile: Profile,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeSummary {
    fn from(value: &Recipe) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
            image: value.image.to_owned(),
            cooking_time: value.cooking_time,
        }
    }
}

/// An ingredient as it appears inside a recipe, with its quantity.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Write model of a recipe. Every create or update supplies the full
/// ingredient and tag lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeInput {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl From<&RecipePresentation> for RecipeInput {
    fn from(value: &RecipePresentation) -> Self {
        Self {
            ingredients: value
                .ingredients
                .iter()
                .map(|ingredient| IngredientAmount {
                    id: ingredient.id,
                    amount: ingredient.amount,
                })
                .collect(),
            tags: value.tags.iter().map(|tag| tag.id).collect(),
            image: value.image.to_owned(),
            name: value.name.to_owned(),
            text: value.text.to_owned(),
            cooking_time: value.cooking_time,
        }
    }
}

/// Everything about a recipe that doesn't depend on who is looking at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: Option<Profile>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

/// Read model of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipePresentation {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: Option<UserPresentation>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipePresentation {
    pub fn new(
        details: RecipeDetails,
        author: Option<UserPresentation>,
        is_favorited: bool,
        is_in_shopping_cart: bool,
    ) -> Self {
        let RecipeDetails {
            recipe,
            tags,
            ingredients,
            ..
        } = details;

        Self {
            id: recipe.id,
            tags,
            author,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Favorite,
    ShoppingCart,
}

impl MembershipKind {
    pub fn table(&self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorites",
            MembershipKind::ShoppingCart => "shopping_cart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOp {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: MembershipKind,
    pub recipe: RecipeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MembershipOutcome {
    Added(Membership),
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserPresentation,
    pub recipes_count: i64,
    pub recipes: Vec<RecipeSummary>,
}

impl SubscriptionView {
    /// `recipes_count` always counts every recipe, `recipes` is cut to `limit`.
    pub fn new(author: UserPresentation, mut recipes: Vec<RecipeSummary>, limit: Option<usize>) -> Self {
        let recipes_count = recipes.len() as i64;
        if let Some(limit) = limit {
            recipes.truncate(limit);
        }

        Self {
            author,
            recipes_count,
            recipes,
        }
    }
}
