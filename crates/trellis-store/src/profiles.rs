//! Work-experience and education records, and per-viewer profile assembly.
//!
//! The store assembles a [`ProfileView`]; whether the birth date may be
//! included is decided upstream by the engine's
//! [`ProfileGate`](trellis_engine::ProfileGate).

use chrono::NaiveDate;
use rusqlite::params;

use trellis_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Education, NewEducation, NewWorkExperience, ProfileView, WorkExperience};

const DATE_FMT: &str = "%Y-%m-%d";

impl Database {
    // ------------------------------------------------------------------
    // Work experience
    // ------------------------------------------------------------------

    /// Insert a work-experience entry and return its row id.
    pub fn add_work_experience(&self, entry: &NewWorkExperience) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO work_experience (user_id, company, role, location, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.user_id.as_str(),
                entry.company,
                entry.role,
                entry.location,
                entry.start_date.format(DATE_FMT).to_string(),
                entry.end_date.map(|d| d.format(DATE_FMT).to_string()),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// All work-experience entries for a user, most recent first.
    pub fn list_work_experience(&self, user_id: &UserId) -> Result<Vec<WorkExperience>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, company, role, location, start_date, end_date
             FROM work_experience
             WHERE user_id = ?1
             ORDER BY start_date DESC",
        )?;

        let rows = stmt.query_map(params![user_id.as_str()], row_to_work)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Delete a work-experience entry by row id.  Returns `true` if a row
    /// was deleted.
    pub fn remove_work_experience(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM work_experience WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Education
    // ------------------------------------------------------------------

    /// Insert an education entry and return its row id.
    pub fn add_education(&self, entry: &NewEducation) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO education (user_id, institution, major, degree, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.user_id.as_str(),
                entry.institution,
                entry.major,
                entry.degree,
                entry.start_date.format(DATE_FMT).to_string(),
                entry.end_date.map(|d| d.format(DATE_FMT).to_string()),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// All education entries for a user, most recent first.
    pub fn list_education(&self, user_id: &UserId) -> Result<Vec<Education>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, institution, major, degree, start_date, end_date
             FROM education
             WHERE user_id = ?1
             ORDER BY start_date DESC",
        )?;

        let rows = stmt.query_map(params![user_id.as_str()], row_to_education)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Delete an education entry by row id.  Returns `true` if a row was
    /// deleted.
    pub fn remove_education(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM education WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Profile assembly
    // ------------------------------------------------------------------

    /// Assemble `owner`'s profile for display.
    ///
    /// `include_birth_date` is the upstream gate decision; everything else
    /// on a profile is visible to any authenticated viewer.
    pub fn profile_view(&self, owner: &UserId, include_birth_date: bool) -> Result<ProfileView> {
        let account = self.get_user(owner)?;
        let work = self.list_work_experience(owner)?;
        let education = self.list_education(owner)?;

        Ok(ProfileView {
            user_id: account.user_id,
            name: account.name,
            email: account.email,
            date_of_birth: account.date_of_birth.filter(|_| include_birth_date),
            work,
            education,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_date(col: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a `rusqlite::Row` to a [`WorkExperience`].
fn row_to_work(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkExperience> {
    let start_str: String = row.get(5)?;
    let end_str: Option<String> = row.get(6)?;

    Ok(WorkExperience {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        company: row.get(2)?,
        role: row.get(3)?,
        location: row.get(4)?,
        start_date: parse_date(5, &start_str)?,
        end_date: end_str.map(|s| parse_date(6, &s)).transpose()?,
    })
}

/// Map a `rusqlite::Row` to an [`Education`].
fn row_to_education(row: &rusqlite::Row<'_>) -> rusqlite::Result<Education> {
    let start_str: String = row.get(5)?;
    let end_str: Option<String> = row.get(6)?;

    Ok(Education {
        id: row.get(0)?,
        user_id: UserId(row.get(1)?),
        institution: row.get(2)?,
        major: row.get(3)?,
        degree: row.get(4)?,
        start_date: parse_date(5, &start_str)?,
        end_date: end_str.map(|s| parse_date(6, &s)).transpose()?,
    })
}
