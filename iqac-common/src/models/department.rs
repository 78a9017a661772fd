//! Academic departments

use super::required_text;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub coordinator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub coordinator_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentInput {
    pub name: String,
    pub code: String,
}

impl DepartmentInput {
    /// Trim the name and uppercase the code (2-10 alphanumerics)
    pub fn validate(self) -> Result<Self> {
        let name = required_text("name", &self.name, 120)?;
        let code = self.code.trim().to_uppercase();
        let code_ok = (2..=10).contains(&code.len())
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !code_ok {
            return Err(Error::invalid(
                "Department code must be 2-10 letters or digits",
            ));
        }
        Ok(Self { name, code })
    }
}
