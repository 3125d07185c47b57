use log::info;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    error::{Error, QueryError},
};

pub async fn connect(config: &Config) -> Result<Pool<Postgres>, Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database (pool size {})", config.pool_size);
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::new(format!("Could not run migrations: {e}")))?;

    info!("Migrations applied");
    Ok(())
}

/// Opens the optional redis connection used for read caching.
pub async fn connect_cache(
    config: &Config,
) -> Result<Option<redis::aio::MultiplexedConnection>, Error> {
    match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let connection = client.get_multiplexed_async_connection().await?;
            info!("Connected to cache");
            Ok(Some(connection))
        }
        None => Ok(None),
    }
}
