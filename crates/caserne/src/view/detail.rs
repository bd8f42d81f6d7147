//! Vehicle detail view: one engin and the materiels it carries.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::record::{Engin, Materiel, RecordPatch};
use crate::store::{MaterielFilter, RecordStore};

/// Drill-down over one engin's materiels.
///
/// Offers a location filter built from the distinct `emplacement` values
/// actually present, and an inspection progress figure over the visible set.
pub struct EnginDetail {
    store: Arc<dyn RecordStore>,
    engin: Engin,
    materiels: Vec<Materiel>,
    emplacement_filter: Option<String>,
    loaded: bool,
}

impl std::fmt::Debug for EnginDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginDetail")
            .field("engin", &self.engin.id)
            .field("materiels", &self.materiels.len())
            .field("emplacement_filter", &self.emplacement_filter)
            .finish_non_exhaustive()
    }
}

impl EnginDetail {
    /// Create an unloaded detail view for the given engin.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, engin: Engin) -> Self {
        Self {
            store,
            engin,
            materiels: Vec::new(),
            emplacement_filter: None,
            loaded: false,
        }
    }

    /// The engin this view drills into.
    #[must_use]
    pub fn engin(&self) -> &Engin {
        &self.engin
    }

    /// All materiels carried by the engin, unfiltered.
    #[must_use]
    pub fn materiels(&self) -> &[Materiel] {
        &self.materiels
    }

    /// Whether [`load`](Self::load) has completed at least once.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fetch the engin's materiels from the store.
    ///
    /// Like the list view, the fetch is gated on an active session: without
    /// one the view settles on empty and issues no read.
    ///
    /// # Errors
    ///
    /// Returns an error if the session check or the fetch fails.
    pub async fn load(&mut self) -> Result<()> {
        if self.store.session().await?.is_none() {
            self.materiels.clear();
            self.loaded = true;
            return Ok(());
        }

        self.materiels = self
            .store
            .materiels(&MaterielFilter::for_engin(self.engin.id.clone()))
            .await?;
        self.loaded = true;
        debug!(
            "Loaded {} materiels for engin {}",
            self.materiels.len(),
            self.engin.id
        );
        Ok(())
    }

    /// The distinct storage locations present, sorted. Blank locations are
    /// left out.
    #[must_use]
    pub fn emplacements(&self) -> Vec<String> {
        let mut locations: Vec<String> = self
            .materiels
            .iter()
            .map(|m| m.emplacement.clone())
            .filter(|e| !e.trim().is_empty())
            .collect();
        locations.sort();
        locations.dedup();
        locations
    }

    /// Restrict [`filtered`](Self::filtered) to one storage location, or
    /// clear the restriction with `None`.
    pub fn set_emplacement_filter(&mut self, emplacement: Option<String>) {
        self.emplacement_filter = emplacement;
    }

    /// The active location restriction, if any.
    #[must_use]
    pub fn emplacement_filter(&self) -> Option<&str> {
        self.emplacement_filter.as_deref()
    }

    /// The materiels under the active location restriction.
    #[must_use]
    pub fn filtered(&self) -> Vec<&Materiel> {
        self.materiels
            .iter()
            .filter(|m| {
                self.emplacement_filter
                    .as_deref()
                    .map_or(true, |e| m.emplacement == e)
            })
            .collect()
    }

    /// Inspection progress over the filtered set, as a percentage.
    ///
    /// Follows the active location restriction, so narrowing to one
    /// emplacement reports that emplacement's progress. An empty filtered
    /// set reports 0%, never a division error.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        let filtered = self.filtered();
        if filtered.is_empty() {
            return 0.0;
        }
        let controlled = filtered.iter().filter(|m| m.is_controlled).count();
        (controlled as f64 / filtered.len() as f64) * 100.0
    }

    /// Merge a persisted card write into the held set. Returns whether a
    /// held materiel matched the patch's identity.
    pub fn apply_update(&mut self, patch: &RecordPatch) -> bool {
        for materiel in &mut self.materiels {
            if materiel.id == patch.id {
                patch.fields.apply_to(materiel);
                return true;
            }
        }
        false
    }
}
