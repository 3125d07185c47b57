pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 10;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 32000;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;

pub const DEFAULT_POOL_SIZE: u32 = 5;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list for";
pub const SHOPPING_LIST_SUFFIX: &str = "_shopping_cart.txt";
