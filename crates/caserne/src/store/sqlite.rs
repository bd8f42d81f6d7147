//! `SQLite`-backed record store.
//!
//! This module provides the concrete [`RecordStore`] used by the binary:
//! persistent storage over `SQLite` plus a simple account table and an
//! in-process session slot. Record identities and creation timestamps are
//! assigned by the database, never by callers.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{
    Engin, GalleryItem, Materiel, MaterielPatch, NewEngin, NewMateriel, NewPersonnel, Personnel,
    PersonnelProfile,
};
use crate::store::{MaterielFilter, RecordStore, Session, User};

use super::migrations;

/// Minimum accepted password length at sign-up.
const MIN_PASSWORD_LEN: usize = 6;

/// Metadata key holding the signed-in user between invocations.
const SESSION_KEY: &str = "session_user";

/// Columns selected for every materiel read, with the engin name joined on.
const MATERIEL_COLUMNS: &str = r"
    m.id, m.user_id, m.name, m.description, m.photo_url, m.doc, m.media,
    m.quantite_nominale, m.quantite_reelle, m.emplacement, m.etat,
    m.engin_id, e.name AS engin_name, m.affectation, m.comment,
    m.is_controlled, m.created_at
";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|_| unreachable!())
    })
}

fn password_digest(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.with_timezone(&Utc);
    }
    // datetime('now') defaults are stored without an offset
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map_or_else(|_| Utc::now(), |naive| naive.and_utc())
}

/// Registry store over `SQLite`.
///
/// Holds the database connection and the active session. The connection is
/// behind a mutex, so concurrent callers are sequenced; writes to the same
/// record are additionally serialized by the caller-side
/// [`WriteGate`](crate::store::WriteGate).
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// The active session, if any.
    session: Mutex<Option<Session>>,
}

impl SqliteStore {
    /// Open or create a registry database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;
        let session = Self::load_persisted_session(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            session: Mutex::new(session),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
            session: Mutex::new(None),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Restore the session recorded by a previous invocation, if any.
    ///
    /// A stale entry pointing at a deleted account is discarded silently.
    fn load_persisted_session(conn: &Connection) -> Result<Option<Session>> {
        let user_id: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                [SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let user = conn
            .query_row(
                "SELECT id, email, affectation FROM users WHERE id = ?1",
                [&user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        affectation: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user.map(|user| Session { user }))
    }

    fn persist_session(conn: &Connection, user_id: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            (SESSION_KEY, user_id),
        )?;
        Ok(())
    }

    /// The acting user, or `NoSession` for writes issued unauthenticated.
    fn require_user(&self) -> Result<User> {
        self.session_slot()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or(Error::NoSession)
    }

    fn materiel_by_id(conn: &Connection, id: &str) -> Result<Materiel> {
        let sql = format!(
            "SELECT {MATERIEL_COLUMNS} FROM materiels m \
             LEFT JOIN engins e ON e.id = m.engin_id WHERE m.id = ?1"
        );
        conn.query_row(&sql, [id], Self::row_to_materiel)
            .optional()?
            .ok_or_else(|| Error::not_found("materiels", id))
    }

    fn personnel_by_user(conn: &Connection, user_id: &str) -> Result<Option<Personnel>> {
        let row = conn
            .query_row(
                r"
                SELECT id, user_id, name, prenom, grade, affectation, status,
                       contact_email, photo_url, created_at
                FROM personnel WHERE user_id = ?1
                ",
                [user_id],
                Self::row_to_personnel,
            )
            .optional()?;
        Ok(row)
    }

    fn row_to_gallery_item(row: &rusqlite::Row) -> rusqlite::Result<GalleryItem> {
        let created_at: String = row.get(4)?;
        Ok(GalleryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            photo_url: row.get(3)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_engin(row: &rusqlite::Row) -> rusqlite::Result<Engin> {
        let created_at: String = row.get(6)?;
        Ok(Engin {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            photo_url: row.get(4)?,
            cs_affectation: row.get(5)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_materiel(row: &rusqlite::Row) -> rusqlite::Result<Materiel> {
        let is_controlled: i64 = row.get(15)?;
        let created_at: String = row.get(16)?;
        Ok(Materiel {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            photo_url: row.get(4)?,
            doc: row.get(5)?,
            media: row.get(6)?,
            quantite_nominale: row.get(7)?,
            quantite_reelle: row.get(8)?,
            emplacement: row.get(9)?,
            etat: row.get(10)?,
            engin_id: row.get(11)?,
            engin_name: row.get(12)?,
            affectation: row.get(13)?,
            comment: row.get(14)?,
            is_controlled: is_controlled != 0,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_personnel(row: &rusqlite::Row) -> rusqlite::Result<Personnel> {
        let created_at: String = row.get(9)?;
        Ok(Personnel {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            prenom: row.get(3)?,
            grade: row.get(4)?,
            affectation: row.get(5)?,
            status: row.get(6)?,
            contact_email: row.get(7)?,
            photo_url: row.get(8)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn session(&self) -> Result<Option<Session>> {
        Ok(self.session_slot().clone())
    }

    async fn user(&self) -> Result<Option<User>> {
        Ok(self.session_slot().as_ref().map(|s| s.user.clone()))
    }

    async fn sign_up(&self, email: &str, password: &str, affectation: &str) -> Result<Session> {
        if !email_pattern().is_match(email) {
            return Err(Error::InvalidSignUp {
                message: format!("malformed email: {email}"),
            });
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidSignUp {
                message: format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            });
        }

        let conn = self.conn();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(Error::AccountExists {
                email: email.to_string(),
            });
        }

        let id: String = conn.query_row(
            r"
            INSERT INTO users (email, password_hash, affectation)
            VALUES (?1, ?2, ?3) RETURNING id
            ",
            params![email, password_digest(password), affectation],
            |row| row.get(0),
        )?;
        Self::persist_session(&conn, &id)?;
        drop(conn);

        info!("Created account for {}", email);
        let session = Session {
            user: User {
                id,
                email: email.to_string(),
                affectation: Some(affectation.to_string()),
            },
        };
        *self.session_slot() = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let conn = self.conn();
        let row: Option<(String, String, Option<String>)> = conn
            .query_row(
                "SELECT id, password_hash, affectation FROM users WHERE email = ?1",
                [email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        // Unknown account and wrong password are reported identically.
        let Some((id, stored_digest, affectation)) = row else {
            return Err(Error::InvalidCredentials {
                email: email.to_string(),
            });
        };
        if stored_digest != password_digest(password) {
            return Err(Error::InvalidCredentials {
                email: email.to_string(),
            });
        }
        Self::persist_session(&conn, &id)?;
        drop(conn);

        debug!("Opened session for {}", email);
        let session = Session {
            user: User {
                id,
                email: email.to_string(),
                affectation,
            },
        };
        *self.session_slot() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.session_slot().take().is_some() {
            self.conn()
                .execute("DELETE FROM metadata WHERE key = ?1", [SESSION_KEY])?;
            debug!("Session closed");
        }
        Ok(())
    }

    async fn gallery_items(&self) -> Result<Vec<GalleryItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, description, photo_url, created_at
            FROM items ORDER BY created_at DESC
            ",
        )?;
        let items = stmt
            .query_map([], Self::row_to_gallery_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn engins(&self) -> Result<Vec<Engin>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r"
            SELECT id, user_id, name, description, photo_url, cs_affectation, created_at
            FROM engins ORDER BY name
            ",
        )?;
        let engins = stmt
            .query_map([], Self::row_to_engin)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(engins)
    }

    async fn personnel(&self) -> Result<Vec<Personnel>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r"
            SELECT id, user_id, name, prenom, grade, affectation, status,
                   contact_email, photo_url, created_at
            FROM personnel ORDER BY name, prenom
            ",
        )?;
        let personnel = stmt
            .query_map([], Self::row_to_personnel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(personnel)
    }

    async fn materiels(&self, filter: &MaterielFilter) -> Result<Vec<Materiel>> {
        let mut sql = format!(
            "SELECT {MATERIEL_COLUMNS} FROM materiels m LEFT JOIN engins e ON e.id = m.engin_id"
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(name) = &filter.name_contains {
            bindings.push(Box::new(format!("%{name}%")));
            clauses.push(format!("m.name LIKE ?{}", bindings.len()));
        }
        if let Some(engin_id) = &filter.engin_id {
            bindings.push(Box::new(engin_id.clone()));
            clauses.push(format!("m.engin_id = ?{}", bindings.len()));
        }
        if let Some(emplacement) = &filter.emplacement_contains {
            bindings.push(Box::new(format!("%{emplacement}%")));
            clauses.push(format!("m.emplacement LIKE ?{}", bindings.len()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY m.name");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let materiels = stmt
            .query_map(
                params_from_iter(bindings.iter().map(AsRef::as_ref)),
                Self::row_to_materiel,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(materiels)
    }

    async fn materiel(&self, id: &str) -> Result<Materiel> {
        let conn = self.conn();
        Self::materiel_by_id(&conn, id)
    }

    async fn personnel_for_user(&self, user_id: &str) -> Result<Option<Personnel>> {
        let conn = self.conn();
        Self::personnel_by_user(&conn, user_id)
    }

    async fn insert_materiel(&self, new: &NewMateriel) -> Result<Materiel> {
        let user = self.require_user()?;
        let conn = self.conn();

        // The initial count seeds both the nominal and the real quantity;
        // they diverge only through later inventory edits.
        let id: String = conn.query_row(
            r"
            INSERT INTO materiels
                (user_id, name, description, photo_url, doc, media,
                 quantite_nominale, quantite_reelle, emplacement, etat,
                 engin_id, affectation, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING id
            ",
            params![
                user.id,
                new.name,
                new.description,
                new.photo_url,
                new.doc,
                new.media,
                new.quantite,
                new.quantite,
                new.emplacement,
                new.etat,
                new.engin_id,
                new.affectation,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;

        debug!("Inserted materiel {} for user {}", id, user.id);
        Self::materiel_by_id(&conn, &id)
    }

    async fn insert_engin(&self, new: &NewEngin) -> Result<Engin> {
        let user = self.require_user()?;
        let conn = self.conn();

        let id: String = conn.query_row(
            r"
            INSERT INTO engins (user_id, name, description, photo_url, cs_affectation, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id
            ",
            params![
                user.id,
                new.name,
                new.description,
                new.photo_url,
                new.cs_affectation,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;

        debug!("Inserted engin {} for user {}", id, user.id);
        conn.query_row(
            r"
            SELECT id, user_id, name, description, photo_url, cs_affectation, created_at
            FROM engins WHERE id = ?1
            ",
            [&id],
            Self::row_to_engin,
        )
        .optional()?
        .ok_or_else(|| Error::not_found("engins", id))
    }

    async fn insert_personnel(&self, new: &NewPersonnel) -> Result<Personnel> {
        let user = self.require_user()?;
        let conn = self.conn();

        let id: String = conn.query_row(
            r"
            INSERT INTO personnel
                (user_id, name, prenom, grade, affectation, status,
                 contact_email, photo_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) RETURNING id
            ",
            params![
                user.id,
                new.name,
                new.prenom,
                new.grade,
                new.affectation,
                new.status,
                new.contact_email,
                new.photo_url,
                Utc::now().to_rfc3339(),
            ],
            |row| row.get(0),
        )?;

        debug!("Inserted personnel {} for user {}", id, user.id);
        Self::personnel_by_user(&conn, &user.id)?
            .ok_or_else(|| Error::not_found("personnel", id))
    }

    async fn update_materiel(&self, id: &str, patch: &MaterielPatch) -> Result<Materiel> {
        self.require_user()?;
        if patch.is_empty() {
            return Err(Error::empty_patch("materiels", id));
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut bindings: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(comment) = &patch.comment {
            bindings.push(Box::new(comment.clone()));
            assignments.push(format!("comment = ?{}", bindings.len()));
        }
        if let Some(quantity) = patch.quantite_reelle {
            bindings.push(Box::new(quantity));
            assignments.push(format!("quantite_reelle = ?{}", bindings.len()));
        }
        if let Some(controlled) = patch.is_controlled {
            bindings.push(Box::new(controlled));
            assignments.push(format!("is_controlled = ?{}", bindings.len()));
        }

        bindings.push(Box::new(id.to_string()));
        let sql = format!(
            "UPDATE materiels SET {} WHERE id = ?{}",
            assignments.join(", "),
            bindings.len()
        );

        let conn = self.conn();
        let affected = conn.execute(&sql, params_from_iter(bindings.iter().map(AsRef::as_ref)))?;
        if affected == 0 {
            return Err(Error::not_found("materiels", id));
        }

        debug!("Updated materiel {}", id);
        Self::materiel_by_id(&conn, id)
    }

    async fn update_personnel_profile(
        &self,
        user_id: &str,
        profile: &PersonnelProfile,
    ) -> Result<Personnel> {
        self.require_user()?;
        let conn = self.conn();

        let affected = conn.execute(
            r"
            UPDATE personnel
            SET name = ?1, prenom = ?2, grade = ?3, affectation = ?4,
                status = ?5, contact_email = ?6, photo_url = ?7
            WHERE user_id = ?8
            ",
            params![
                profile.name,
                profile.prenom,
                profile.grade,
                profile.affectation,
                profile.status,
                profile.contact_email,
                profile.photo_url,
                user_id,
            ],
        )?;
        if affected == 0 {
            return Err(Error::not_found("personnel", user_id));
        }

        debug!("Updated profile for user {}", user_id);
        Self::personnel_by_user(&conn, user_id)?
            .ok_or_else(|| Error::not_found("personnel", user_id))
    }
}
