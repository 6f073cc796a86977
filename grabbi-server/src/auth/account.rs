//! Account creation, credential checks and the seed admin

use shared::error::{AppError, ErrorCode};
use shared::models::{NewUser, Role, User};
use sqlx::{PgExecutor, PgPool};

use crate::db;
use crate::error::{BoxError, ServiceResult, unique_violation};
use crate::util::{hash_password, verify_password};

pub use shared::util::normalize_email;

pub fn hash(password: &str) -> ServiceResult<String> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hash failed");
        AppError::internal("Password hash failed").into()
    })
}

/// Insert a user; a live account with the same email is 409
pub async fn create_user(conn: impl PgExecutor<'_>, user: &NewUser) -> ServiceResult<User> {
    match db::users::insert(conn, user).await {
        Ok(created) => {
            tracing::info!(user_id = %created.id, role = %created.role, "User created");
            Ok(created)
        }
        Err(e) if unique_violation(&e) == Some("users_email_key") => {
            Err(AppError::new(ErrorCode::EmailTaken).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Email + password check; blocked accounts are refused with 403
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> ServiceResult<User> {
    let email = normalize_email(email);
    let Some(user) = db::users::find_by_email(pool, &email).await? else {
        tracing::warn!(email = %email, "Login failed: unknown email");
        return Err(AppError::invalid_credentials().into());
    };
    if !verify_password(password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::invalid_credentials().into());
    }
    if user.is_blocked {
        tracing::warn!(user_id = %user.id, "Login refused: account blocked");
        return Err(AppError::new(ErrorCode::AccountBlocked).into());
    }
    Ok(user)
}

/// Create the admin account from config when no account has that email
pub async fn seed_admin(pool: &PgPool, email: &str, password: &str) -> Result<(), BoxError> {
    let email = normalize_email(email);
    if db::users::find_by_email(pool, &email).await?.is_some() {
        tracing::debug!(email = %email, "Seed admin already present");
        return Ok(());
    }
    let password_hash = hash_password(password).map_err(|e| e.to_string())?;
    let admin = NewUser::new(email, password_hash, "Administrator".into(), Role::Admin);
    db::users::insert(pool, &admin).await?;
    tracing::info!(email = %admin.email, "Seed admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies() {
        let h = hash("correct horse").unwrap();
        assert!(verify_password("correct horse", &h));
        assert!(!verify_password("wrong horse", &h));
    }
}
