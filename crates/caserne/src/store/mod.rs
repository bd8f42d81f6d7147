//! Record store boundary for the resource registry.
//!
//! This module defines the asynchronous [`RecordStore`] trait through which
//! every component reads and writes records, plus the session types and the
//! per-record write gate. The SQLite-backed implementation lives in
//! [`sqlite`].

pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::error::Result;
use crate::record::{
    Engin, GalleryItem, Materiel, MaterielPatch, NewEngin, NewMateriel, NewPersonnel, Personnel,
    PersonnelProfile, RecordId,
};

pub use sqlite::SqliteStore;

/// The acting identity, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned user identity.
    pub id: String,
    /// Sign-in email.
    pub email: String,
    /// Assignment label carried on the account, if any.
    pub affectation: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user.
    pub user: User,
}

/// Store-side filter predicates for materiel reads.
///
/// All predicates are optional and combined with AND. Substring matches are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterielFilter {
    /// Name substring.
    pub name_contains: Option<String>,
    /// Exact owning-vehicle match.
    pub engin_id: Option<RecordId>,
    /// Location substring.
    pub emplacement_contains: Option<String>,
}

impl MaterielFilter {
    /// Filter down to the materiels owned by one engin.
    #[must_use]
    pub fn for_engin(engin_id: impl Into<RecordId>) -> Self {
        Self {
            engin_id: Some(engin_id.into()),
            ..Self::default()
        }
    }

    /// Whether no predicate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_contains.is_none()
            && self.engin_id.is_none()
            && self.emplacement_contains.is_none()
    }
}

/// The persistence and auth boundary of the registry.
///
/// Every read and write in the crate goes through this trait; components
/// hold it as `Arc<dyn RecordStore>` so tests can substitute a double.
/// There is deliberately no delete operation: records are only created and
/// mutated through field-scoped partial updates.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The active session, if any. An absent session is not an error.
    async fn session(&self) -> Result<Option<Session>>;

    /// The acting user, if a session is active.
    async fn user(&self) -> Result<Option<User>>;

    /// Create an account and open a session for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed, the account already
    /// exists, or the store write fails.
    async fn sign_up(&self, email: &str, password: &str, affectation: &str) -> Result<Session>;

    /// Open a session for an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidCredentials`] when the email/password
    /// pair is not accepted.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Tear down the active session. A no-op when none is active.
    async fn sign_out(&self) -> Result<()>;

    /// All gallery items.
    async fn gallery_items(&self) -> Result<Vec<GalleryItem>>;

    /// All engins.
    async fn engins(&self) -> Result<Vec<Engin>>;

    /// All personnel records.
    async fn personnel(&self) -> Result<Vec<Personnel>>;

    /// Materiels matching the filter, each with the owning engin's name
    /// joined on for display.
    async fn materiels(&self, filter: &MaterielFilter) -> Result<Vec<Materiel>>;

    /// One materiel by identity, with the engin name joined on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RecordNotFound`] for an unknown identity.
    async fn materiel(&self, id: &str) -> Result<Materiel>;

    /// The personnel profile belonging to one user, if present.
    async fn personnel_for_user(&self, user_id: &str) -> Result<Option<Personnel>>;

    /// Insert a materiel, stamping the acting user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoSession`] when unauthenticated.
    async fn insert_materiel(&self, new: &NewMateriel) -> Result<Materiel>;

    /// Insert an engin, stamping the acting user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoSession`] when unauthenticated.
    async fn insert_engin(&self, new: &NewEngin) -> Result<Engin>;

    /// Insert a personnel record, stamping the acting user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoSession`] when unauthenticated.
    async fn insert_personnel(&self, new: &NewPersonnel) -> Result<Personnel>;

    /// Apply a field-scoped partial update to one materiel and return the
    /// updated record (with the engin name joined on).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptyPatch`] for an all-`None` patch and
    /// [`crate::Error::RecordNotFound`] for an unknown identity.
    async fn update_materiel(&self, id: &str, patch: &MaterielPatch) -> Result<Materiel>;

    /// Replace the profile fields of the personnel record owned by a user.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RecordNotFound`] when the user has no
    /// personnel record.
    async fn update_personnel_profile(
        &self,
        user_id: &str,
        profile: &PersonnelProfile,
    ) -> Result<Personnel>;
}

/// Serializes writes per record identity.
///
/// Cards acquire the gate for their record before issuing a store write, so
/// overlapping saves to the same record (e.g. a rapid double submit) are
/// applied one after the other. Writes to distinct records never contend.
#[derive(Debug, Default)]
pub struct WriteGate {
    locks: Mutex<HashMap<RecordId, Arc<tokio::sync::Mutex<()>>>>,
}

impl WriteGate {
    /// Create a new gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for one record identity, waiting if another
    /// write to the same record is in flight.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of record identities the gate has seen.
    #[must_use]
    pub fn tracked(&self) -> usize {
        match self.locks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
