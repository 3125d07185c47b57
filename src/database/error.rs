use std::fmt::{self, Display};

use thiserror::Error;
use warp::reject::Rejection;

use super::schema::MembershipKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(Missing),

    #[error("You can't subscribe to yourself")]
    SelfReference,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Shopping cart is empty, nothing to report")]
    EmptyShoppingList,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl Error {
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::SelfReference | Error::EmptyShoppingList => 400,
            Error::NotFound(missing) if missing.is_relation() => 400,
            Error::Unauthenticated => 401,
            Error::Forbidden => 403,
            Error::NotFound(_) => 404,
            Error::AlreadyExists(_) => 409,
            Error::Query(_) | Error::Cache(_) => 500,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            let constraint = e.constraint().unwrap_or("record").to_owned();

            if e.is_unique_violation() {
                return Self::AlreadyExists(constraint);
            }
            if e.is_foreign_key_violation() {
                return Self::NotFound(Missing::Reference(constraint));
            }
        }

        Self::Query(QueryError::from(value))
    }
}

impl From<redis::RedisError> for Error {
    fn from(value: redis::RedisError) -> Self {
        Self::Cache(CacheError::from(value))
    }
}

impl From<Error> for potion::Error {
    fn from(value: Error) -> Self {
        potion::Error {
            code: value.status_code().into(),
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}

impl From<Error> for Rejection {
    fn from(value: Error) -> Self {
        potion::Error::from(value).into()
    }
}

/// The entity or relation a lookup or removal failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Recipe(i32),
    Ingredient(i32),
    Tag(i32),
    User(i32),
    Membership(MembershipKind),
    Subscription(i32),
    Reference(String),
}

impl Missing {
    /// Relations are rejected as bad requests, entities as not found.
    pub fn is_relation(&self) -> bool {
        matches!(self, Missing::Membership(_) | Missing::Subscription(_))
    }
}

impl Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Recipe(id) => write!(f, "No recipe exists with id {id}"),
            Missing::Ingredient(id) => write!(f, "No ingredient exists with id {id}"),
            Missing::Tag(id) => write!(f, "No tag exists with id {id}"),
            Missing::User(id) => write!(f, "No user exists with id {id}"),
            Missing::Membership(MembershipKind::Favorite) => write!(f, "Recipe is not in favorites"),
            Missing::Membership(MembershipKind::ShoppingCart) => {
                write!(f, "Recipe is not in the shopping cart")
            }
            Missing::Subscription(id) => write!(f, "You are not subscribed to user {id}"),
            Missing::Reference(constraint) => write!(f, "Referenced entity doesn't exist ({constraint})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least one ingredient is required")]
    IngredientsRequired,
    #[error("Ingredient {0} is listed more than once")]
    DuplicateIngredient(i32),
    #[error("Amount of ingredient {0} is out of range")]
    InvalidAmount(i32),
    #[error("At least one tag is required")]
    TagsRequired,
    #[error("Tag {0} is listed more than once")]
    DuplicateTag(i32),
    #[error("Cooking time is out of range")]
    InvalidCookingTime,
    #[error("Name is empty or too long")]
    InvalidName,
    #[error("Username may contain only letters, digits and @/./+/-/_")]
    InvalidUsername,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password can't be empty")]
    InvalidPassword,
    #[error("Color must be a #RRGGBB hex code")]
    InvalidColor,
    #[error("Slug may contain only letters, digits, '-' and '_'")]
    InvalidSlug,
    #[error("Invalid value for parameter '{0}'")]
    InvalidParameter(String),
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::IngredientsRequired | ValidationError::DuplicateIngredient(_) => {
                "ingredients"
            }
            ValidationError::InvalidAmount(_) => "amount",
            ValidationError::TagsRequired | ValidationError::DuplicateTag(_) => "tags",
            ValidationError::InvalidCookingTime => "cooking_time",
            ValidationError::InvalidName => "name",
            ValidationError::InvalidUsername => "username",
            ValidationError::InvalidEmail => "email",
            ValidationError::InvalidPassword => "password",
            ValidationError::InvalidColor => "color",
            ValidationError::InvalidSlug => "slug",
            ValidationError::InvalidParameter(key) => key,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::IngredientsRequired => "ingredients-required",
            ValidationError::DuplicateIngredient(_) => "duplicate-ingredient",
            ValidationError::InvalidAmount(_) => "invalid-amount",
            ValidationError::TagsRequired => "tags-required",
            ValidationError::DuplicateTag(_) => "duplicate-tag",
            ValidationError::InvalidCookingTime => "invalid-cooking-time",
            ValidationError::InvalidName => "invalid-name",
            ValidationError::InvalidUsername => "invalid-username",
            ValidationError::InvalidEmail => "invalid-email",
            ValidationError::InvalidPassword => "invalid-password",
            ValidationError::InvalidColor => "invalid-color",
            ValidationError::InvalidSlug => "invalid-slug",
            ValidationError::InvalidParameter(_) => "invalid-parameter",
        }
    }
}

#[derive(Debug, Error)]
#[error("{info}")]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

#[derive(Debug, Error)]
#[error("{info}")]
pub struct CacheError {
    info: String,
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}
