//! CRUD operations for directory accounts.
//!
//! Passwords are stored as a per-account random salt plus the hex BLAKE3
//! hash of `salt || password`; plaintext never touches the database.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use trellis_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{UserAccount, UserSummary};

const DATE_FMT: &str = "%Y-%m-%d";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Register a new account.  Fails with [`StoreError::Conflict`] when
    /// the user id is already taken.
    pub fn create_user(&self, user_id: &UserId, password: &str, email: &str) -> Result<()> {
        let salt: [u8; 16] = rand::random();
        let hash = hash_password(&salt, password);

        self.conn()
            .execute(
                "INSERT INTO users (user_id, password_salt, password_hash, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user_id.as_str(),
                    hex::encode(salt),
                    hash,
                    email,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| match &e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict(format!("user id '{user_id}' already taken"))
                }
                _ => StoreError::from(e),
            })?;

        tracing::info!(user = %user_id, "account created");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single account by user id.
    pub fn get_user(&self, user_id: &UserId) -> Result<UserAccount> {
        self.conn()
            .query_row(
                "SELECT user_id, email, name, date_of_birth, created_at
                 FROM users WHERE user_id = ?1",
                params![user_id.as_str()],
                row_to_account,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::from(other),
            })
    }

    pub fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Check login credentials.  Returns `false` for a wrong password and
    /// for an unknown user alike; callers get no oracle for which it was.
    pub fn authenticate(&self, user_id: &UserId, password: &str) -> Result<bool> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT password_salt, password_hash FROM users WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((salt_hex, stored_hash)) = row else {
            return Ok(false);
        };

        let salt_bytes = hex::decode(&salt_hex)?;
        let mut salt = [0u8; 16];
        if salt_bytes.len() != 16 {
            return Ok(false);
        }
        salt.copy_from_slice(&salt_bytes);

        Ok(hash_password(&salt, password) == stored_hash)
    }

    /// Exact-name directory search.
    pub fn search_by_name(&self, name: &str) -> Result<Vec<UserSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, name, email FROM users WHERE name = ?1 ORDER BY user_id ASC",
        )?;

        let rows = stmt.query_map(params![name], |row| {
            Ok(UserSummary {
                user_id: UserId(row.get(0)?),
                name: row.get(1)?,
                email: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Re-salt and replace the stored password hash.
    pub fn change_password(&self, user_id: &UserId, new_password: &str) -> Result<()> {
        let salt: [u8; 16] = rand::random();
        let hash = hash_password(&salt, new_password);

        let affected = self.conn().execute(
            "UPDATE users SET password_salt = ?2, password_hash = ?3 WHERE user_id = ?1",
            params![user_id.as_str(), hex::encode(salt), hash],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn update_name(&self, user_id: &UserId, name: &str) -> Result<()> {
        self.update_account_field(user_id, "name", Some(name.to_string()))
    }

    pub fn update_email(&self, user_id: &UserId, email: &str) -> Result<()> {
        self.update_account_field(user_id, "email", Some(email.to_string()))
    }

    pub fn update_birth_date(&self, user_id: &UserId, date: Option<NaiveDate>) -> Result<()> {
        self.update_account_field(
            user_id,
            "date_of_birth",
            date.map(|d| d.format(DATE_FMT).to_string()),
        )
    }

    fn update_account_field(
        &self,
        user_id: &UserId,
        column: &str,
        value: Option<String>,
    ) -> Result<()> {
        // `column` is one of our own identifiers, never caller input.
        let sql = format!("UPDATE users SET {column} = ?2 WHERE user_id = ?1");
        let affected = self
            .conn()
            .execute(&sql, params![user_id.as_str(), value])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// The engines only ever ask the directory for existence.
impl trellis_engine::UserDirectory for Database {
    fn exists(&self, user: &UserId) -> std::result::Result<bool, trellis_engine::StoreFault> {
        self.user_exists(user).map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hash_password(salt: &[u8; 16], password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Map a `rusqlite::Row` to a [`UserAccount`].
fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserAccount> {
    let user_id: String = row.get(0)?;
    let email: String = row.get(1)?;
    let name: Option<String> = row.get(2)?;
    let dob_str: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;

    let date_of_birth = dob_str
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FMT))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(UserAccount {
        user_id: UserId(user_id),
        email,
        name,
        date_of_birth,
        created_at,
    })
}
