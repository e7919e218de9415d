use thiserror::Error;

/// Database errors application code can meaningfully branch on.
///
/// Constraint violations are split out because handlers turn them into
/// specific HTTP responses (duplicate email, illegal status transition,
/// overdrawn wallet). Everything else is non-recoverable.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let details = |db_err: &dyn sqlx::error::DatabaseError| {
            (
                db_err.constraint().map(str::to_string),
                db_err.table().map(str::to_string),
                db_err.message().to_string(),
            )
        };

        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let (constraint, table, message) = details(db_err.as_ref());
                DbError::UniqueViolation { constraint, table, message }
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                let (constraint, table, message) = details(db_err.as_ref());
                DbError::ForeignKeyViolation { constraint, table, message }
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                let (constraint, table, message) = details(db_err.as_ref());
                DbError::CheckViolation { constraint, table, message }
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
