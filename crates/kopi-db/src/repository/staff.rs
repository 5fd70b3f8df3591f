//! # Staff Repository
//!
//! Staff accounts for the admin screens. Passwords are stored as Argon2 PHC
//! strings and never leave this module.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kopi_core::{StaffProfile, StaffRole};

const STAFF_COLUMNS: &str = "id, email, full_name, role, active, created_at, updated_at";

/// Fields an admin may change on an existing account.
#[derive(Debug, Clone, Default)]
pub struct StaffUpdate {
    pub full_name: Option<String>,
    pub role: Option<StaffRole>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| DbError::Internal(format!("failed to encode salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// Creates an account. `email` is stored lower-cased.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create(
        &self,
        email: &str,
        full_name: &str,
        role: StaffRole,
        password: &str,
    ) -> DbResult<StaffProfile> {
        let email = email.trim().to_lowercase();
        debug!(email = %email, role = ?role, "Creating staff account");

        let now = Utc::now();
        let profile = StaffProfile {
            id: Uuid::new_v4().to_string(),
            email,
            full_name: full_name.trim().to_string(),
            role,
            active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO staff_profiles (id, email, full_name, role, password_hash, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role)
        .bind(hash_password(password)?)
        .bind(profile.active)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: profile.email.clone(),
            },
            other => other,
        })?;

        Ok(profile)
    }

    pub async fn list(&self) -> DbResult<Vec<StaffProfile>> {
        let staff = sqlx::query_as::<_, StaffProfile>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff_profiles ORDER BY full_name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StaffProfile>> {
        let staff = sqlx::query_as::<_, StaffProfile>(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff_profiles WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    /// Applies the non-empty fields of `update`.
    pub async fn update(&self, id: &str, update: &StaffUpdate) -> DbResult<StaffProfile> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Staff", id))?;

        let full_name = update.full_name.as_deref().map(str::trim).unwrap_or(&current.full_name);
        let role = update.role.unwrap_or(current.role);
        let active = update.active.unwrap_or(current.active);
        let now = Utc::now();

        sqlx::query("UPDATE staff_profiles SET full_name = ?2, role = ?3, active = ?4, updated_at = ?5 WHERE id = ?1")
            .bind(id)
            .bind(full_name)
            .bind(role)
            .bind(active)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if let Some(password) = &update.password {
            sqlx::query("UPDATE staff_profiles SET password_hash = ?2 WHERE id = ?1")
                .bind(id)
                .bind(hash_password(password)?)
                .execute(&self.pool)
                .await?;
        }

        debug!(id = %id, "Staff account updated");

        Ok(StaffProfile {
            full_name: full_name.to_string(),
            role,
            active,
            updated_at: now,
            ..current
        })
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM staff_profiles WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", id));
        }
        Ok(())
    }

    /// Returns the active account matching `email` and `password`.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> DbResult<Option<StaffProfile>> {
        let email = email.trim().to_lowercase();
        let stored: Option<(String, String)> =
            sqlx::query_as("SELECT id, password_hash FROM staff_profiles WHERE email = ?1 AND active = 1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, hash)) = stored else {
            return Ok(None);
        };
        let parsed = PasswordHash::new(&hash).map_err(|e| DbError::Internal(format!("stored hash is invalid: {}", e)))?;
        if Argon2::default().verify_password(password.as_bytes(), &parsed).is_err() {
            return Ok(None);
        }
        self.get_by_id(&id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;

    #[tokio::test]
    async fn test_create_and_verify() {
        let db = db().await;
        let staff = db
            .staff()
            .create("Barista@Kopi.my", "Farid", StaffRole::Cashier, "flatwhite123")
            .await
            .unwrap();
        assert_eq!(staff.email, "barista@kopi.my");

        let ok = db.staff().verify_credentials("barista@kopi.my", "flatwhite123").await.unwrap();
        assert_eq!(ok.map(|s| s.id), Some(staff.id.clone()));
        let bad = db.staff().verify_credentials("barista@kopi.my", "wrong-pass").await.unwrap();
        assert!(bad.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = db().await;
        db.staff().create("a@kopi.my", "A", StaffRole::Admin, "password1").await.unwrap();
        let dup = db.staff().create("A@kopi.my", "A2", StaffRole::Kitchen, "password2").await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = db().await;
        let staff = db.staff().create("k@kopi.my", "Kitchen", StaffRole::Kitchen, "password1").await.unwrap();

        let updated = db
            .staff()
            .update(
                &staff.id,
                &StaffUpdate {
                    role: Some(StaffRole::Cashier),
                    active: Some(false),
                    password: Some("password2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, StaffRole::Cashier);
        assert!(!updated.active);
        assert_eq!(updated.full_name, "Kitchen");
        // inactive accounts cannot sign in
        assert!(db.staff().verify_credentials("k@kopi.my", "password2").await.unwrap().is_none());

        db.staff().delete(&staff.id).await.unwrap();
        assert!(db.staff().list().await.unwrap().is_empty());
        assert!(matches!(
            db.staff().update(&staff.id, &StaffUpdate::default()).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
