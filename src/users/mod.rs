//! User accounts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::security::auth::{Principal, Role, hash_password, verify_password};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn view(&self) -> UserView {
        UserView::from(self)
    }
}

/// What clients see of a [`User`]. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration or admin-create payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl NewUser {
    fn validate(&self) -> ApiResult<()> {
        check_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::bad_request(format!(
                "password must be longer than or equal to {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(ApiError::bad_request(
                "firstName and lastName should not be empty",
            ));
        }
        Ok(())
    }
}

fn check_email(email: &str) -> ApiResult<()> {
    let valid = email
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ApiError::bad_request("email must be an email"));
    }
    Ok(())
}

/// Self-service profile update. The role is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// In-memory user table keyed by id.
pub struct UserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the demo admin and regular accounts unless their emails are
    /// already taken.
    pub fn seed(&self) {
        let accounts = [
            ("admin@test.com", "Admin", Role::Admin),
            ("user@test.com", "Regular", Role::User),
        ];
        for (email, first_name, role) in accounts {
            if self.find_by_email(email).is_some() {
                continue;
            }
            let created = self.create(NewUser {
                email: email.to_owned(),
                password: "password123".to_owned(),
                first_name: first_name.to_owned(),
                last_name: "User".to_owned(),
                role: Some(role),
            });
            if let Ok(user) = created {
                info!(email = %user.email, role = %user.role, "seeded user");
            }
        }
    }

    /// Validates `input` and stores a new user. Emails are unique ignoring
    /// case.
    pub fn create(&self, input: NewUser) -> ApiResult<User> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let mut users = self.users();
        if users.values().any(|u| u.email == email) {
            return Err(ApiError::conflict("User with this email already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: hash_password(&input.password),
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            role: input.role.unwrap_or_default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        info!(user_id = %user.id, "created user");
        Ok(user)
    }

    pub fn find(&self, id: Uuid) -> ApiResult<User> {
        self.users()
            .get(&id)
            .cloned()
            .ok_or_else(|| user_not_found(id))
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim().to_lowercase();
        self.users().values().find(|u| u.email == email).cloned()
    }

    /// Checks credentials. Unknown email, wrong password and inactive
    /// account all fail the same way.
    pub fn verify_credentials(&self, email: &str, password: &str) -> ApiResult<User> {
        self.find_by_email(email)
            .filter(|u| u.is_active && verify_password(password, &u.password_hash))
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))
    }

    /// All users, oldest first.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users().values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    pub fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> ApiResult<User> {
        let mut users = self.users();

        let email = update
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            check_email(email)?;
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(ApiError::conflict("User with this email already exists"));
            }
        }

        let user = users.get_mut(&id).ok_or_else(|| user_not_found(id))?;
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(first_name) = update.first_name.filter(|n| !n.trim().is_empty()) {
            user.first_name = first_name.trim().to_owned();
        }
        if let Some(last_name) = update.last_name.filter(|n| !n.trim().is_empty()) {
            user.last_name = last_name.trim().to_owned();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    pub fn delete(&self, id: Uuid) -> ApiResult<()> {
        if self.users().remove(&id).is_none() {
            return Err(user_not_found(id));
        }
        info!(user_id = %id, "deleted user");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn user_not_found(id: Uuid) -> ApiError {
    ApiError::not_found("User", format!("User with ID {id} not found"))
}
