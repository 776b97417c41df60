//! Idempotent provisioning of the persistent objects the service owns.

use tracing::info;

use crate::{
    database::MysqlDatabase,
    error::{RelmonError, Result},
};

/// A single table provisioned at startup.
///
/// Descriptors are static and parameterized only by the architecture
/// variant, which is embedded in the table name. A descriptor whose columns
/// reference another object's identity column must be declared after it.
#[derive(Debug)]
pub struct SchemaObject {
    base_name: &'static str,
    columns: &'static str,
}

impl SchemaObject {
    pub fn table_name(&self, variant: &str) -> String {
        format!("{}_{}", self.base_name, variant)
    }

    pub fn create_statement(&self, variant: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name(variant),
            self.columns
        )
    }
}

/// Tables provisioned per architecture variant, in creation order.
pub const SCHEMA_OBJECTS: &[SchemaObject] = &[
    SchemaObject {
        base_name: "releases",
        columns: "\
            id INT NOT NULL AUTO_INCREMENT, \
            name VARCHAR(64) NOT NULL, \
            PRIMARY KEY (id)",
    },
    SchemaObject {
        // release_id points at a releases row but is not declared as a
        // foreign key.
        base_name: "results",
        columns: "\
            id INT NOT NULL AUTO_INCREMENT, \
            release_id INT NOT NULL, \
            name VARCHAR(64) NOT NULL, \
            state VARCHAR(16) NOT NULL, \
            url VARCHAR(256) NOT NULL, \
            PRIMARY KEY (id)",
    },
];

/// Creates every schema object if absent, in declaration order, via the
/// elevated connection.
///
/// Safe to run against an already-provisioned store. Provisioning is
/// best-effort-once: the first failure aborts the remaining objects and
/// nothing already created is rolled back.
pub async fn ensure_schema(db: &MysqlDatabase, variant: &str) -> Result<()> {
    let version = db.server_version().await?;
    info!(%version, "connected to backing store");

    for object in SCHEMA_OBJECTS {
        let table = object.table_name(variant);
        sqlx::query(&object.create_statement(variant))
            .execute(db.pool())
            .await
            .map_err(|source| RelmonError::SchemaProvision {
                object: table.clone(),
                source,
            })?;
        info!(%table, "schema object ensured");
    }

    Ok(())
}
