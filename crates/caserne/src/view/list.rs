//! Session-gated record list.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::record::{Record, RecordPatch};
use crate::store::{MaterielFilter, RecordStore};

/// What a list shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    /// The gallery collection.
    Gallery,
    /// Materiels matching a store-side filter.
    Materiels(MaterielFilter),
    /// All engins.
    Engins,
    /// All personnel records.
    Personnel,
}

/// A fetched collection of records of one kind.
///
/// Loading is gated on an active session: without one the list is empty and
/// no read reaches the store. After a card write, [`ListView::apply_update`]
/// patches the matching record in place instead of refetching.
pub struct ListView {
    store: Arc<dyn RecordStore>,
    query: ListQuery,
    records: Vec<Record>,
    loaded: bool,
}

impl std::fmt::Debug for ListView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListView")
            .field("query", &self.query)
            .field("records", &self.records.len())
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl ListView {
    /// Create an unloaded list for the given query.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, query: ListQuery) -> Self {
        Self {
            store,
            query,
            records: Vec::new(),
            loaded: false,
        }
    }

    /// The records as currently held. Empty until [`load`](Self::load) runs.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Whether [`load`](Self::load) has completed at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fetch the collection from the store.
    ///
    /// Without an active session the list settles on empty and issues no
    /// read at all. Calling again refetches.
    ///
    /// # Errors
    ///
    /// Returns an error if the session check or the fetch fails.
    pub async fn load(&mut self) -> Result<()> {
        if self.store.session().await?.is_none() {
            debug!("No session; list settles empty without a fetch");
            self.records.clear();
            self.loaded = true;
            return Ok(());
        }

        self.records = match &self.query {
            ListQuery::Gallery => self
                .store
                .gallery_items()
                .await?
                .into_iter()
                .map(Record::Gallery)
                .collect(),
            ListQuery::Materiels(filter) => self
                .store
                .materiels(filter)
                .await?
                .into_iter()
                .map(Record::Materiel)
                .collect(),
            ListQuery::Engins => self
                .store
                .engins()
                .await?
                .into_iter()
                .map(Record::Engin)
                .collect(),
            ListQuery::Personnel => self
                .store
                .personnel()
                .await?
                .into_iter()
                .map(Record::Personnel)
                .collect(),
        };
        self.loaded = true;
        debug!("Loaded {} records for {:?}", self.records.len(), self.query);
        Ok(())
    }

    /// Merge a persisted card write into the held collection.
    ///
    /// Only the fields the patch carries change; everything else on the
    /// record is left alone. Applying the same patch again is a no-op.
    /// Returns whether a held record matched the patch's identity.
    pub fn apply_update(&mut self, patch: &RecordPatch) -> bool {
        for record in &mut self.records {
            if record.id() == patch.id {
                if let Some(materiel) = record.as_materiel_mut() {
                    patch.fields.apply_to(materiel);
                    return true;
                }
            }
        }
        false
    }
}
