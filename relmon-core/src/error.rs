use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelmonError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unable to provision schema object `{object}`: {source}")]
    SchemaProvision {
        object: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RelmonError>;
