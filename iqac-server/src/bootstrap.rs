//! First-start administrator account

use iqac_common::models::NewUser;
use iqac_common::password::{hash_password_blocking, random_token};
use iqac_common::Role;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;

/// Length of a generated bootstrap password
const GENERATED_PASSWORD_LEN: usize = 16;

/// Create an approved admin when none exists
///
/// Returns the generated password when `password` was not supplied, so
/// the caller can report it once.
pub async fn ensure_admin(
    pool: &SqlitePool,
    email: &str,
    password: Option<&str>,
    bcrypt_cost: u32,
) -> iqac_common::Result<Option<String>> {
    if db::users::admin_exists(pool).await? {
        return Ok(None);
    }

    let generated = match password {
        Some(_) => None,
        None => Some(random_token(GENERATED_PASSWORD_LEN)),
    };
    let password = password
        .map(str::to_string)
        .or_else(|| generated.clone())
        .unwrap_or_default();

    let account = NewUser {
        name: "Administrator".to_string(),
        email: email.to_string(),
        password,
        role: Role::Admin,
        department_id: None,
        phone: None,
        designation: Some("IQAC Administrator".to_string()),
    }
    .validate()?;

    let hash = hash_password_blocking(account.password.clone(), bcrypt_cost).await?;
    let admin = db::users::insert(pool, &account, &hash, true).await?;
    info!("Created administrator account {}", admin.email);

    if let Some(generated) = &generated {
        warn!(
            "Generated password for {}: {} (set IQAC_ADMIN_PASSWORD to choose one)",
            admin.email, generated
        );
    }
    Ok(generated)
}
