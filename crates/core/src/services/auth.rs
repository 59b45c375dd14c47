//! Registration, login and account queries.

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use civic_common::{AppError, AppResult, IdGenerator, config::BootstrapAdminConfig};
use civic_db::{
    entities::user::{self, UserRole},
    repositories::{ComplaintRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::{
    access::{Caller, Operation},
    session::SessionKeys,
};

/// Input for registering a new account.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 256, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[validate(length(max = 1024))]
    pub address: Option<String>,

    /// `NGO` registers an NGO account; anything else registers a citizen.
    pub role: Option<String>,

    pub organization: Option<String>,

    pub service_area: Option<String>,
}

/// Input for logging in.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: user::Model,
}

/// A user row with the number of reports they filed.
#[derive(Debug, Clone)]
pub struct UserWithReportCount {
    pub user: user::Model,
    pub report_count: i64,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    complaint_repo: ComplaintRepository,
    keys: SessionKeys,
    plaintext_admin_passwords: bool,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        complaint_repo: ComplaintRepository,
        keys: SessionKeys,
        plaintext_admin_passwords: bool,
    ) -> Self {
        Self {
            user_repo,
            complaint_repo,
            keys,
            plaintext_admin_passwords,
            id_gen: IdGenerator::new(),
        }
    }

    /// Session keys used to sign and verify tokens.
    #[must_use]
    pub const fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Register a citizen or NGO account and sign it in.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;

        let role = match input.role.as_deref() {
            Some("NGO") => UserRole::Ngo,
            _ => UserRole::Citizen,
        };

        let (organization, service_area) = match role {
            UserRole::Ngo => {
                let organization = non_empty(input.organization).ok_or_else(|| {
                    AppError::Validation("Organization is required for NGO accounts".to_string())
                })?;
                let service_area = non_empty(input.service_area).ok_or_else(|| {
                    AppError::Validation("Service area is required for NGO accounts".to_string())
                })?;
                (Some(organization), Some(service_area))
            }
            UserRole::Citizen | UserRole::Admin => (None, None),
        };

        let email = input.email.trim().to_string();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let now = chrono::Utc::now();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            phone: Set(non_empty(input.phone)),
            address: Set(non_empty(input.address)),
            role: Set(role),
            organization: Set(organization),
            service_area: Set(service_area),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "Registered account");

        let token = self.keys.issue(&user.id, user.role)?;
        Ok(AuthSession { token, user })
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(input.email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !self.password_matches(&user, &input.password) {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(AppError::Unauthorized);
        }

        let token = self.keys.issue(&user.id, user.role)?;
        Ok(AuthSession { token, user })
    }

    /// Load the caller's own account.
    pub async fn profile(&self, caller: &Caller) -> AppResult<user::Model> {
        caller.authorize(Operation::GetProfile)?;
        self.user_repo.get_by_id(&caller.id).await
    }

    /// List every account with its report count. The admin role is re-checked
    /// against the store.
    pub async fn list_users(&self, caller: &Caller) -> AppResult<Vec<UserWithReportCount>> {
        let fresh = self.fresh_caller(caller).await?;
        fresh.authorize(Operation::ListUsers)?;

        let users = self.user_repo.find_all().await?;
        let counts: HashMap<String, i64> =
            self.complaint_repo.count_by_reporter().await?.into_iter().collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let report_count = counts.get(&user.id).copied().unwrap_or(0);
                UserWithReportCount { user, report_count }
            })
            .collect())
    }

    /// Create the configured admin account if no account holds its email.
    ///
    /// Returns the new account, or `None` when the email is already taken.
    pub async fn bootstrap_admin(
        &self,
        admin: &BootstrapAdminConfig,
    ) -> AppResult<Option<user::Model>> {
        if self.user_repo.find_by_email(&admin.email).await?.is_some() {
            tracing::debug!(email = %admin.email, "Bootstrap admin already present");
            return Ok(None);
        }

        let credential = if self.plaintext_admin_passwords {
            admin.password.clone()
        } else {
            hash_password(&admin.password)?
        };
        let now = chrono::Utc::now();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(admin.name.clone()),
            email: Set(admin.email.clone()),
            password_hash: Set(credential),
            phone: Set(None),
            address: Set(None),
            role: Set(UserRole::Admin),
            organization: Set(None),
            service_area: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "Created bootstrap admin account");
        Ok(Some(user))
    }

    /// Reload the caller's role from the store.
    ///
    /// A deleted account is treated as having no permissions at all.
    pub async fn fresh_caller(&self, caller: &Caller) -> AppResult<Caller> {
        self.user_repo
            .find_by_id(&caller.id)
            .await?
            .map(|user| Caller::from(&user))
            .ok_or_else(|| AppError::Forbidden("Account no longer exists".to_string()))
    }

    fn password_matches(&self, user: &user::Model, password: &str) -> bool {
        match user.role {
            UserRole::Admin if self.plaintext_admin_passwords => password == user.password_hash,
            UserRole::Admin | UserRole::Citizen | UserRole::Ngo => {
                match verify_password(password, &user.password_hash) {
                    Ok(valid) => valid,
                    Err(e) => {
                        tracing::warn!(user_id = %user.id, error = %e, "Stored credential is not a valid hash");
                        false
                    }
                }
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against an Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
