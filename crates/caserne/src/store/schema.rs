//! `SQLite` schema definitions for the registry store.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema. Record identities are assigned here, in SQL, so
//! they are opaque to the rest of the crate.

/// SQL statement to create the accounts table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    affectation TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the gallery items table.
pub const CREATE_ITEMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    photo_url TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the engins table.
pub const CREATE_ENGINS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS engins (
    id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
    user_id TEXT NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    photo_url TEXT NOT NULL DEFAULT '',
    cs_affectation TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the materiels table.
pub const CREATE_MATERIELS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS materiels (
    id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
    user_id TEXT NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    photo_url TEXT NOT NULL DEFAULT '',
    doc TEXT,
    media TEXT,
    quantite_nominale INTEGER,
    quantite_reelle INTEGER,
    emplacement TEXT NOT NULL DEFAULT '',
    etat TEXT NOT NULL DEFAULT '',
    engin_id TEXT REFERENCES engins(id),
    affectation TEXT,
    comment TEXT,
    is_controlled INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the personnel table. One profile per user.
pub const CREATE_PERSONNEL_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS personnel (
    id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
    name TEXT NOT NULL,
    prenom TEXT NOT NULL DEFAULT '',
    grade TEXT NOT NULL DEFAULT '',
    affectation TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    contact_email TEXT NOT NULL DEFAULT '',
    photo_url TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on `engin_id` for the drill-down query.
pub const CREATE_MATERIELS_ENGIN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_materiels_engin ON materiels(engin_id)
";

/// SQL statement to create an index on `emplacement` for location filters.
pub const CREATE_MATERIELS_EMPLACEMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_materiels_emplacement ON materiels(emplacement)
";

/// SQL statement to create an index on materiel names for substring filters.
pub const CREATE_MATERIELS_NAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_materiels_name ON materiels(name)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_ITEMS_TABLE,
    CREATE_ENGINS_TABLE,
    CREATE_MATERIELS_TABLE,
    CREATE_PERSONNEL_TABLE,
    CREATE_MATERIELS_ENGIN_INDEX,
    CREATE_MATERIELS_EMPLACEMENT_INDEX,
    CREATE_MATERIELS_NAME_INDEX,
    CREATE_METADATA_TABLE,
];
