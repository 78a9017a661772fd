//! Database initialization, schema and settings

pub mod init;
pub mod migrations;
pub mod settings;

pub use init::init_database;
pub use migrations::{run_migrations, CURRENT_SCHEMA_VERSION};
pub use settings::{
    current_academic_year, get_setting, load_jwt_secret, set_setting, CURRENT_ACADEMIC_YEAR_KEY,
    JWT_SECRET_KEY,
};

/// True when the error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// True when the error is a FOREIGN KEY constraint violation
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}
