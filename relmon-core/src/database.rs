//! MySQL pool handle shared by the readiness gate, the bootstrapper, and
//! the reconcile task.

use std::fmt;
use std::time::Duration;

use sqlx::{
    Connection, MySqlPool,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
};

use crate::{error::Result, settings::ConnectTarget};

/// This service issues strictly sequential queries per connection owner, so
/// the pool stays small.
const MAX_CONNECTIONS: u32 = 4;

/// Handle over a lazily-connected MySQL pool.
///
/// The pool is created without touching the network; the readiness gate
/// owns the first connection attempt.
#[derive(Clone)]
pub struct MysqlDatabase {
    pool: MySqlPool,
    target: ConnectTarget,
}

impl fmt::Debug for MysqlDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlDatabase")
            .field("target", &self.target)
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl MysqlDatabase {
    pub fn connect_lazy(target: &ConnectTarget) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.username)
            .password(&target.password)
            .database(&target.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(30))
            .test_before_acquire(true)
            .connect_lazy_with(options);

        MysqlDatabase {
            pool,
            target: target.clone(),
        }
    }

    /// Lightweight liveness check: acquires a connection and pings it.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    /// Version string of the backing engine.
    pub async fn server_version(&self) -> Result<String> {
        let (version,): (String,) = sqlx::query_as("SELECT VERSION()")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }
}
