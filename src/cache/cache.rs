use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn to_string(&self) -> String {
        self.into()
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for String {
    fn from(key: &CacheKey<T>) -> String {
        match key._type {
            CacheKeyType::Recipe => format!("recipe-{}", key._value.to_string()),
            CacheKeyType::Ingredients => format!("ingredients-{}", key._value.to_string()),
            CacheKeyType::Tags => format!("tags-{}", key._value.to_string()),
            CacheKeyType::Custom(_) => key._value.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Recipe,
    Ingredients,
    Tags,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<CacheKey<T>> for CacheLifetime {
    fn from(key: CacheKey<T>) -> Self {
        match key._type {
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
            CacheKeyType::Ingredients | CacheKeyType::Tags => CacheLifetime::BindCatalogCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value),
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    Custom(String),
    BindRecipeCache,
    BindCatalogCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> Option<&'static str> {
        match self {
            CacheLifetime::BindRecipeCache => Some("recipe-cache-key"),
            CacheLifetime::BindCatalogCache => Some("catalog-cache-key"),
            CacheLifetime::Custom(_) => None,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
            _ => match self.bind_key() {
                Some(key) => get_cache_value::<&str, String>(key, cache).await,
                None => Ok(None),
            },
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        match self {
            CacheLifetime::Custom(value) => match lifetime {
                CacheLifetime::Custom(_value) => Ok(value == &_value),
                _ => {
                    log::error!("Found conflicting bindings");
                    Ok(false)
                }
            },
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }

    /// Moves the bind to a new generation; every value bound to it goes stale.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), Error> {
        if let Some(key) = self.bind_key() {
            let generation: i64 = cache.incr(key, 1).await?;
            log::trace!("> Invalidated {key} (generation {generation})");
        }
        Ok(())
    }
}

/// Invalidates after a committed write. The write already happened, so a cache
/// failure is logged instead of returned.
pub async fn invalidate_after_write(
    lifetime: CacheLifetime,
    cache: Option<&mut MultiplexedConnection>,
) {
    if let Some(cache) = cache {
        if let Err(e) = lifetime.invalidate(cache).await {
            log::error!("> Failed to invalidate {lifetime:?}: {e}");
        }
    }
}

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    /// `bind` must be read before `value` is fetched, otherwise a write
    /// landing in between would bless a stale value with the new generation.
    fn new(value: T, lifetime: CacheLifetime, bind: Option<String>) -> Self {
        Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        }
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, key.into(), cache)
            .await
    }

    /// Returns the cached value for `key`, or runs `callback` and caches its result.
    pub async fn get_or<F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let value = get_cache_value::<String, RedisValue<T>>((&key).into(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.to_string());
                match value.validate(key.to_owned(), cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {:?}", key.to_string());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {:?}", key.to_string());
                let lifetime: CacheLifetime = key.to_owned().into();
                let bind = lifetime.get_cache_bind(cache).await?;
                let value = RedisValue::new(callback().await?, lifetime, bind);

                if let Err(e) =
                    set_cache_value::<String, RedisValue<T>>((&key).into(), value.clone(), cache)
                        .await
                {
                    log::error!("{e:?}");
                }

                Ok(value)
            }
        }
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}
