//! Portal user accounts

use super::{normalize_email, optional_text, required_text, Role};
use crate::password::validate_password;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub is_approved: bool,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub department_name: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when this user coordinates the given department
    pub fn coordinates(&self, department_id: Option<Uuid>) -> bool {
        self.role == Role::Coordinator
            && self.department_id.is_some()
            && self.department_id == department_id
    }
}

/// Account creation payload (registration and admin creation)
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub phone: Option<String>,
    pub designation: Option<String>,
}

impl NewUser {
    /// Normalize and validate fields; department is required for the
    /// roles that belong to a department
    pub fn validate(mut self) -> Result<Self> {
        self.name = required_text("name", &self.name, 120)?;
        self.email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        self.phone = optional_text("phone", self.phone.as_deref(), 20)?;
        self.designation = optional_text("designation", self.designation.as_deref(), 80)?;

        let needs_department = matches!(
            self.role,
            Role::Faculty | Role::Student | Role::Coordinator
        );
        if needs_department && self.department_id.is_none() {
            return Err(Error::invalid(format!(
                "A department is required for role {}",
                self.role
            )));
        }
        Ok(self)
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
}

impl ProfileUpdate {
    /// Apply present fields to `user`; a blank phone or designation clears it
    pub fn apply(self, user: &mut User) -> Result<()> {
        if let Some(name) = self.name {
            user.name = required_text("name", &name, 120)?;
        }
        if let Some(phone) = self.phone {
            user.phone = optional_text("phone", Some(&phone), 20)?;
        }
        if let Some(designation) = self.designation {
            user.designation = optional_text("designation", Some(&designation), 80)?;
        }
        Ok(())
    }
}

/// Fields an administrator may change on any account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    pub phone: Option<String>,
    pub designation: Option<String>,
}

impl UserUpdate {
    /// Apply present fields to `user` and re-check the department rule
    pub fn apply(self, user: &mut User) -> Result<()> {
        ProfileUpdate {
            name: self.name,
            phone: self.phone,
            designation: self.designation,
        }
        .apply(user)?;

        if let Some(email) = self.email {
            user.email = normalize_email(&email)?;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if self.department_id.is_some() {
            user.department_id = self.department_id;
        }

        let needs_department = matches!(
            user.role,
            Role::Faculty | Role::Student | Role::Coordinator
        );
        if needs_department && user.department_id.is_none() {
            return Err(Error::invalid(format!(
                "A department is required for role {}",
                user.role
            )));
        }
        Ok(())
    }
}
