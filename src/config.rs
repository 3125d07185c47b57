use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use log::{info, warn};
use thiserror::Error;

use crate::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT,
    MAX_NAME_LENGTH, MAX_PAGE_SIZE, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Bounds enforced when a recipe is composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub amount: RangeInclusive<i32>,
    pub cooking_time: RangeInclusive<i32>,
    pub max_name_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            amount: MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT,
            cooking_time: MIN_COOKING_TIME..=MAX_COOKING_TIME,
            max_name_length: MAX_NAME_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: i64,
    pub max_page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub pool_size: u32,
    pub limits: Limits,
    pub pagination: Pagination,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let redis_url = lookup("REDIS_URL");
        if redis_url.is_none() {
            info!("REDIS_URL not set, caching disabled");
        }

        let limits = Limits {
            amount: try_load(&lookup, "FOODGRAM_MIN_AMOUNT", MIN_INGREDIENT_AMOUNT)?
                ..=try_load(&lookup, "FOODGRAM_MAX_AMOUNT", MAX_INGREDIENT_AMOUNT)?,
            cooking_time: try_load(&lookup, "FOODGRAM_MIN_COOKING_TIME", MIN_COOKING_TIME)?
                ..=try_load(&lookup, "FOODGRAM_MAX_COOKING_TIME", MAX_COOKING_TIME)?,
            max_name_length: try_load(&lookup, "FOODGRAM_MAX_NAME_LENGTH", MAX_NAME_LENGTH)?,
        };
        if limits.amount.is_empty() {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_MAX_AMOUNT",
                reason: String::from("range is empty"),
            });
        }
        if limits.cooking_time.is_empty() {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_MAX_COOKING_TIME",
                reason: String::from("range is empty"),
            });
        }

        let pagination = Pagination {
            page_size: try_load(&lookup, "FOODGRAM_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_page_size: try_load(&lookup, "FOODGRAM_MAX_PAGE_SIZE", MAX_PAGE_SIZE)?,
        };
        if pagination.page_size <= 0 || pagination.max_page_size < pagination.page_size {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_PAGE_SIZE",
                reason: format!(
                    "page size {} doesn't fit max page size {}",
                    pagination.page_size, pagination.max_page_size
                ),
            });
        }

        Ok(Self {
            database_url,
            redis_url,
            pool_size: try_load(&lookup, "FOODGRAM_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            limits,
            pagination,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/foodgram")]))
            .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/foodgram");
        assert_eq!(config.redis_url, None);
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.limits.cooking_time, 1..=32000);
        assert_eq!(config.pagination.page_size, 6);
        assert_eq!(config.pagination.max_page_size, 10);
    }

    #[test]
    fn database_url_is_required() {
        let result = Config::from_lookup(lookup(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("REDIS_URL", "redis://cache"),
            ("FOODGRAM_MAX_AMOUNT", "500"),
            ("FOODGRAM_PAGE_SIZE", "3"),
        ]))
        .unwrap();

        assert_eq!(config.redis_url.as_deref(), Some("redis://cache"));
        assert_eq!(config.limits.amount, 1..=500);
        assert_eq!(config.pagination.page_size, 3);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("FOODGRAM_MAX_COOKING_TIME", "forever"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "FOODGRAM_MAX_COOKING_TIME",
                ..
            })
        ));

        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("FOODGRAM_PAGE_SIZE", "50"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "FOODGRAM_PAGE_SIZE",
                ..
            })
        ));
    }
}
