//! `caserne` - A resource registry for fire-department vehicles, materiel
//! and personnel
//!
//! This library provides the core functionality for tracking station
//! inventory: typed records, a session-gated record store over `SQLite`,
//! editable record cards with field-scoped partial updates, and list/detail
//! views that stay current without refetching.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod card;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod store;
pub mod view;

pub use card::{CardState, CardView, MaterielCard, RefreshOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Materiel, MaterielPatch, Record, RecordKind, RecordPatch};
pub use store::{MaterielFilter, RecordStore, Session, SqliteStore, User, WriteGate};
