//! Record card state machine.
//!
//! A [`MaterielCard`] wraps one equipment record and owns its edit cycle:
//! viewing, editing with a local buffer, deferred save of the comment and
//! observed quantity, and the immediate controlled toggle. The two write
//! paths are field-scoped and never clobber each other.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::{Materiel, MaterielPatch, Record, RecordPatch};
use crate::store::{RecordStore, WriteGate};

/// The card's position in its edit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    /// Showing the record as stored; no local buffer.
    Viewing,
    /// Holding unsaved comment/quantity input.
    Editing,
}

/// What a card did with an externally refreshed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fresh record replaced the card's copy.
    Applied,
    /// The card is editing; the fresh record was stashed and will be
    /// applied on cancel (or dropped if the edit saves).
    Deferred,
}

/// Editable card over one materiel record.
///
/// Writes go through the shared [`WriteGate`], so two overlapping saves to
/// the same record are applied one after the other.
pub struct MaterielCard {
    record: Materiel,
    state: CardState,
    comment_input: String,
    quantity_input: Option<u32>,
    pending: Option<Materiel>,
    store: Arc<dyn RecordStore>,
    gate: Arc<WriteGate>,
}

impl std::fmt::Debug for MaterielCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterielCard")
            .field("record", &self.record.id)
            .field("state", &self.state)
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl MaterielCard {
    /// Create a card in the `Viewing` state.
    #[must_use]
    pub fn new(record: Materiel, store: Arc<dyn RecordStore>, gate: Arc<WriteGate>) -> Self {
        Self {
            record,
            state: CardState::Viewing,
            comment_input: String::new(),
            quantity_input: None,
            pending: None,
            store,
            gate,
        }
    }

    /// The card's current state.
    #[must_use]
    pub fn state(&self) -> CardState {
        self.state
    }

    /// The record as the card currently shows it.
    #[must_use]
    pub fn record(&self) -> &Materiel {
        &self.record
    }

    /// The comment buffer. Meaningful only while editing.
    #[must_use]
    pub fn comment_input(&self) -> &str {
        &self.comment_input
    }

    /// The quantity buffer. `None` renders as a blank field.
    #[must_use]
    pub fn quantity_input(&self) -> Option<u32> {
        self.quantity_input
    }

    /// Whether a refreshed record is waiting for the edit to finish.
    #[must_use]
    pub fn has_pending_refresh(&self) -> bool {
        self.pending.is_some()
    }

    /// Enter the `Editing` state, seeding the buffer from the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardState`] when already editing.
    pub fn begin_edit(&mut self) -> Result<()> {
        if self.state == CardState::Editing {
            return Err(Error::InvalidCardState {
                id: self.record.id.clone(),
                expected: "viewing",
            });
        }
        self.comment_input = self.record.comment.clone().unwrap_or_default();
        self.quantity_input = self.record.quantite_reelle;
        self.state = CardState::Editing;
        Ok(())
    }

    /// Replace the comment buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardState`] when not editing.
    pub fn set_comment_input(&mut self, text: impl Into<String>) -> Result<()> {
        self.require_editing()?;
        self.comment_input = text.into();
        Ok(())
    }

    /// Replace the quantity buffer from raw input.
    ///
    /// Anything that doesn't parse as a non-negative count clears the buffer,
    /// the same as blanking the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardState`] when not editing.
    pub fn set_quantity_input(&mut self, raw: &str) -> Result<()> {
        self.require_editing()?;
        self.quantity_input = raw.trim().parse().ok();
        Ok(())
    }

    /// Leave the `Editing` state, discarding the buffer.
    ///
    /// A refresh that arrived during the edit is applied now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardState`] when not editing.
    pub fn cancel(&mut self) -> Result<()> {
        self.require_editing()?;
        self.comment_input.clear();
        self.quantity_input = None;
        if let Some(fresh) = self.pending.take() {
            debug!("Applying deferred refresh to card {}", self.record.id);
            self.record = fresh;
        }
        self.state = CardState::Viewing;
        Ok(())
    }

    /// Persist the edit buffer and return to `Viewing`.
    ///
    /// The write carries exactly the comment and the observed quantity; a
    /// cleared quantity field is left out rather than written as a zero. On
    /// success the store's copy replaces the card's record and any deferred
    /// refresh is dropped as stale. On failure the card stays in `Editing`
    /// with the buffer intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCardState`] when not editing, or the store
    /// error when the write fails.
    pub async fn save(&mut self) -> Result<RecordPatch> {
        self.require_editing()?;

        let fields = MaterielPatch {
            comment: Some(self.comment_input.clone()),
            quantite_reelle: self.quantity_input,
            is_controlled: None,
        };

        let _guard = self.gate.acquire(&self.record.id).await;
        let updated = self.store.update_materiel(&self.record.id, &fields).await?;

        debug!("Saved card edit for {}", self.record.id);
        self.record = updated;
        self.pending = None;
        self.comment_input.clear();
        self.quantity_input = None;
        self.state = CardState::Viewing;
        Ok(RecordPatch {
            id: self.record.id.clone(),
            fields,
        })
    }

    /// Flip the inspection flag and persist it immediately.
    ///
    /// The flag flips optimistically; if the write fails, it flips back and
    /// the error is returned. Valid in either state, since the toggle is
    /// independent of the comment/quantity edit.
    ///
    /// # Errors
    ///
    /// Returns the store error when the write fails.
    pub async fn toggle_controlled(&mut self) -> Result<RecordPatch> {
        let target = !self.record.is_controlled;
        self.record.is_controlled = target;

        let fields = MaterielPatch {
            is_controlled: Some(target),
            ..MaterielPatch::default()
        };

        let _guard = self.gate.acquire(&self.record.id).await;
        match self.store.update_materiel(&self.record.id, &fields).await {
            Ok(updated) => {
                if self.state == CardState::Viewing {
                    self.record = updated;
                } else {
                    // Keep the buffer's backing record; only the flag moved.
                    self.record.is_controlled = updated.is_controlled;
                }
                Ok(RecordPatch {
                    id: self.record.id.clone(),
                    fields,
                })
            }
            Err(err) => {
                warn!("Controlled toggle failed for {}: {err}", self.record.id);
                self.record.is_controlled = !target;
                Err(err)
            }
        }
    }

    /// Offer the card a freshly fetched copy of its record.
    ///
    /// Applied in place when viewing. While editing it is stashed instead,
    /// so the buffer is never clobbered mid-edit; a later refresh replaces
    /// the stashed one.
    pub fn refresh(&mut self, fresh: Materiel) -> RefreshOutcome {
        match self.state {
            CardState::Viewing => {
                self.record = fresh;
                RefreshOutcome::Applied
            }
            CardState::Editing => {
                self.pending = Some(fresh);
                RefreshOutcome::Deferred
            }
        }
    }

    fn require_editing(&self) -> Result<()> {
        if self.state == CardState::Editing {
            Ok(())
        } else {
            Err(Error::InvalidCardState {
                id: self.record.id.clone(),
                expected: "editing",
            })
        }
    }
}

/// Presentational projection of a materiel for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference, falling back when the record carries none.
    pub photo_url: String,
    /// Observed over expected, e.g. `"3 / 5"`. Blank parts for unset counts.
    pub quantity_label: String,
    /// Storage location.
    pub emplacement: String,
    /// Owning vehicle's display name, if attached.
    pub engin_name: Option<String>,
    /// Inspection flag.
    pub controlled: bool,
    /// Whether the card needs attention: commented or short of its
    /// expected count.
    pub highlighted: bool,
}

impl CardView {
    /// Project any record kind into its rendered form.
    ///
    /// Non-materiel kinds carry no quantity, location or inspection state;
    /// those parts render blank.
    #[must_use]
    pub fn from_record(record: &Record, fallback_photo_url: &str) -> Self {
        match record {
            Record::Materiel(materiel) => Self::from_materiel(materiel, fallback_photo_url),
            Record::Gallery(item) => Self::read_only(
                item.name.clone(),
                item.description.clone(),
                &item.photo_url,
                fallback_photo_url,
            ),
            Record::Engin(engin) => Self::read_only(
                engin.name.clone(),
                engin.description.clone(),
                &engin.photo_url,
                fallback_photo_url,
            ),
            Record::Personnel(personnel) => Self::read_only(
                format!("{} {}", personnel.name, personnel.prenom),
                personnel.grade.clone(),
                &personnel.photo_url,
                fallback_photo_url,
            ),
        }
    }

    /// Project a materiel into its rendered form.
    #[must_use]
    pub fn from_materiel(materiel: &Materiel, fallback_photo_url: &str) -> Self {
        let photo_url = if materiel.photo_url.trim().is_empty() {
            fallback_photo_url.to_string()
        } else {
            materiel.photo_url.clone()
        };

        let part = |q: Option<u32>| q.map_or_else(|| "-".to_string(), |v| v.to_string());
        let quantity_label = format!(
            "{} / {}",
            part(materiel.quantite_reelle),
            part(materiel.quantite_nominale)
        );

        Self {
            name: materiel.name.clone(),
            description: materiel.description.clone(),
            photo_url,
            quantity_label,
            emplacement: materiel.emplacement.clone(),
            engin_name: materiel.engin_name.clone(),
            controlled: materiel.is_controlled,
            highlighted: materiel.has_comment() || materiel.is_below_nominal(),
        }
    }

    fn read_only(name: String, description: String, photo: &str, fallback: &str) -> Self {
        let photo_url = if photo.trim().is_empty() {
            fallback.to_string()
        } else {
            photo.to_string()
        };
        Self {
            name,
            description,
            photo_url,
            quantity_label: String::new(),
            emplacement: String::new(),
            engin_name: None,
            controlled: false,
            highlighted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::record::{
        Engin, GalleryItem, NewEngin, NewMateriel, NewPersonnel, Personnel, PersonnelProfile,
    };
    use crate::store::{MaterielFilter, Session, User};

    /// Store double: serves one materiel, records every patch it is handed,
    /// and can be told to fail the next write.
    struct ProbeStore {
        record: Mutex<Materiel>,
        patches: Mutex<Vec<MaterielPatch>>,
        fail_next: AtomicBool,
    }

    impl ProbeStore {
        fn new(record: Materiel) -> Self {
            Self {
                record: Mutex::new(record),
                patches: Mutex::new(Vec::new()),
                fail_next: AtomicBool::new(false),
            }
        }

        fn fail_next_write(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }

        fn patches(&self) -> Vec<MaterielPatch> {
            self.patches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for ProbeStore {
        async fn session(&self) -> Result<Option<Session>> {
            Ok(None)
        }
        async fn user(&self) -> Result<Option<User>> {
            Ok(None)
        }
        async fn sign_up(&self, _: &str, _: &str, _: &str) -> Result<Session> {
            Err(Error::internal("not used"))
        }
        async fn sign_in(&self, _: &str, _: &str) -> Result<Session> {
            Err(Error::internal("not used"))
        }
        async fn sign_out(&self) -> Result<()> {
            Ok(())
        }
        async fn gallery_items(&self) -> Result<Vec<GalleryItem>> {
            Ok(Vec::new())
        }
        async fn engins(&self) -> Result<Vec<Engin>> {
            Ok(Vec::new())
        }
        async fn personnel(&self) -> Result<Vec<Personnel>> {
            Ok(Vec::new())
        }
        async fn materiels(&self, _: &MaterielFilter) -> Result<Vec<Materiel>> {
            Ok(vec![self.record.lock().unwrap().clone()])
        }
        async fn materiel(&self, _: &str) -> Result<Materiel> {
            Ok(self.record.lock().unwrap().clone())
        }
        async fn personnel_for_user(&self, _: &str) -> Result<Option<Personnel>> {
            Ok(None)
        }
        async fn insert_materiel(&self, _: &NewMateriel) -> Result<Materiel> {
            Err(Error::internal("not used"))
        }
        async fn insert_engin(&self, _: &NewEngin) -> Result<Engin> {
            Err(Error::internal("not used"))
        }
        async fn insert_personnel(&self, _: &NewPersonnel) -> Result<Personnel> {
            Err(Error::internal("not used"))
        }
        async fn update_materiel(&self, id: &str, patch: &MaterielPatch) -> Result<Materiel> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(Error::internal("injected failure"));
            }
            self.patches.lock().unwrap().push(patch.clone());
            let mut record = self.record.lock().unwrap();
            assert_eq!(record.id, id);
            patch.apply_to(&mut record);
            Ok(record.clone())
        }
        async fn update_personnel_profile(
            &self,
            _: &str,
            _: &PersonnelProfile,
        ) -> Result<Personnel> {
            Err(Error::internal("not used"))
        }
    }

    fn materiel() -> Materiel {
        Materiel {
            id: "m-1".to_string(),
            user_id: "u-1".to_string(),
            name: "Lance incendie".to_string(),
            description: "Lance 45mm".to_string(),
            photo_url: String::new(),
            doc: None,
            media: None,
            quantite_nominale: Some(5),
            quantite_reelle: Some(5),
            emplacement: "Coffre avant".to_string(),
            etat: "Bon".to_string(),
            engin_id: None,
            engin_name: None,
            affectation: None,
            comment: None,
            is_controlled: false,
            created_at: Utc::now(),
        }
    }

    fn card_with_store() -> (MaterielCard, Arc<ProbeStore>) {
        let record = materiel();
        let store = Arc::new(ProbeStore::new(record.clone()));
        let card = MaterielCard::new(record, Arc::clone(&store) as _, Arc::new(WriteGate::new()));
        (card, store)
    }

    #[test]
    fn test_begin_edit_seeds_buffer() {
        let (mut card, _store) = card_with_store();
        assert_eq!(card.state(), CardState::Viewing);

        card.begin_edit().unwrap();
        assert_eq!(card.state(), CardState::Editing);
        assert_eq!(card.comment_input(), "");
        assert_eq!(card.quantity_input(), Some(5));
    }

    #[test]
    fn test_begin_edit_twice_rejected() {
        let (mut card, _store) = card_with_store();
        card.begin_edit().unwrap();
        assert!(matches!(
            card.begin_edit(),
            Err(Error::InvalidCardState { .. })
        ));
    }

    #[test]
    fn test_edit_operations_require_editing() {
        let (mut card, _store) = card_with_store();
        assert!(card.set_comment_input("x").is_err());
        assert!(card.set_quantity_input("3").is_err());
        assert!(card.cancel().is_err());
    }

    #[test]
    fn test_quantity_input_coercion() {
        let (mut card, _store) = card_with_store();
        card.begin_edit().unwrap();

        card.set_quantity_input("3").unwrap();
        assert_eq!(card.quantity_input(), Some(3));

        card.set_quantity_input(" 12 ").unwrap();
        assert_eq!(card.quantity_input(), Some(12));

        for garbage in ["", "abc", "-1", "3.5"] {
            card.set_quantity_input(garbage).unwrap();
            assert_eq!(card.quantity_input(), None, "input {garbage:?}");
        }
    }

    #[tokio::test]
    async fn test_save_writes_exactly_comment_and_quantity() {
        let (mut card, store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("embout manquant").unwrap();
        card.set_quantity_input("3").unwrap();

        let patch = card.save().await.unwrap();
        assert_eq!(patch.id, "m-1");
        assert_eq!(patch.fields.comment.as_deref(), Some("embout manquant"));
        assert_eq!(patch.fields.quantite_reelle, Some(3));
        assert_eq!(patch.fields.is_controlled, None);

        assert_eq!(card.state(), CardState::Viewing);
        assert_eq!(card.record().comment.as_deref(), Some("embout manquant"));
        assert_eq!(card.record().quantite_reelle, Some(3));

        let patches = store.patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].is_controlled, None);
    }

    #[tokio::test]
    async fn test_save_omits_cleared_quantity() {
        let (mut card, store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("recomptage à faire").unwrap();
        card.set_quantity_input("").unwrap();

        card.save().await.unwrap();

        let patches = store.patches();
        assert_eq!(patches[0].quantite_reelle, None);
        assert!(patches[0].comment.is_some());
        // The stored count is untouched, not zeroed.
        assert_eq!(card.record().quantite_reelle, Some(5));
    }

    #[tokio::test]
    async fn test_save_requires_editing() {
        let (mut card, store) = card_with_store();
        assert!(matches!(
            card.save().await,
            Err(Error::InvalidCardState { .. })
        ));
        assert!(store.patches().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_buffer() {
        let (mut card, store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("usé").unwrap();
        card.set_quantity_input("2").unwrap();

        store.fail_next_write();
        assert!(card.save().await.is_err());

        assert_eq!(card.state(), CardState::Editing);
        assert_eq!(card.comment_input(), "usé");
        assert_eq!(card.quantity_input(), Some(2));
        assert_eq!(card.record().comment, None);

        // Retrying after the transient failure succeeds.
        let patch = card.save().await.unwrap();
        assert_eq!(patch.fields.comment.as_deref(), Some("usé"));
    }

    #[tokio::test]
    async fn test_cancel_discards_buffer() {
        let (mut card, store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("jeté").unwrap();

        card.cancel().unwrap();
        assert_eq!(card.state(), CardState::Viewing);
        assert_eq!(card.record().comment, None);
        assert!(store.patches().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_writes_only_flag() {
        let (mut card, store) = card_with_store();
        let patch = card.toggle_controlled().await.unwrap();

        assert_eq!(patch.fields.is_controlled, Some(true));
        assert_eq!(patch.fields.comment, None);
        assert_eq!(patch.fields.quantite_reelle, None);
        assert!(card.record().is_controlled);

        card.toggle_controlled().await.unwrap();
        assert!(!card.record().is_controlled);
        assert_eq!(store.patches().len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_reverts_on_failure() {
        let (mut card, store) = card_with_store();
        store.fail_next_write();

        assert!(card.toggle_controlled().await.is_err());
        assert!(!card.record().is_controlled);
        assert!(store.patches().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_during_edit_preserves_buffer() {
        let (mut card, _store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("en cours").unwrap();

        card.toggle_controlled().await.unwrap();

        assert_eq!(card.state(), CardState::Editing);
        assert_eq!(card.comment_input(), "en cours");
        assert!(card.record().is_controlled);
    }

    #[test]
    fn test_refresh_applied_while_viewing() {
        let (mut card, _store) = card_with_store();
        let mut fresh = materiel();
        fresh.quantite_reelle = Some(1);

        assert_eq!(card.refresh(fresh), RefreshOutcome::Applied);
        assert_eq!(card.record().quantite_reelle, Some(1));
    }

    #[test]
    fn test_refresh_deferred_while_editing_latest_wins() {
        let (mut card, _store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("en cours").unwrap();

        let mut first = materiel();
        first.quantite_reelle = Some(2);
        let mut second = materiel();
        second.quantite_reelle = Some(1);

        assert_eq!(card.refresh(first), RefreshOutcome::Deferred);
        assert_eq!(card.refresh(second), RefreshOutcome::Deferred);
        assert!(card.has_pending_refresh());
        // The buffer is untouched by either refresh.
        assert_eq!(card.comment_input(), "en cours");
        assert_eq!(card.record().quantite_reelle, Some(5));

        card.cancel().unwrap();
        assert_eq!(card.record().quantite_reelle, Some(1));
        assert!(!card.has_pending_refresh());
    }

    #[tokio::test]
    async fn test_successful_save_drops_deferred_refresh() {
        let (mut card, _store) = card_with_store();
        card.begin_edit().unwrap();
        card.set_comment_input("vérifié").unwrap();

        let mut stale = materiel();
        stale.comment = Some("ancien".to_string());
        card.refresh(stale);

        card.save().await.unwrap();
        assert!(!card.has_pending_refresh());
        assert_eq!(card.record().comment.as_deref(), Some("vérifié"));
    }

    #[test]
    fn test_card_view_fallback_photo_and_highlight() {
        let mut record = materiel();
        let view = CardView::from_materiel(&record, "https://example.org/placeholder.png");
        assert_eq!(view.photo_url, "https://example.org/placeholder.png");
        assert_eq!(view.quantity_label, "5 / 5");
        assert!(!view.highlighted);

        record.photo_url = "https://example.org/lance.jpg".to_string();
        record.quantite_reelle = Some(3);
        let view = CardView::from_materiel(&record, "https://example.org/placeholder.png");
        assert_eq!(view.photo_url, "https://example.org/lance.jpg");
        assert_eq!(view.quantity_label, "3 / 5");
        assert!(view.highlighted);

        record.quantite_reelle = Some(5);
        record.comment = Some("rayé".to_string());
        let view = CardView::from_materiel(&record, "");
        assert!(view.highlighted);
    }

    #[test]
    fn test_card_view_unset_quantities() {
        let mut record = materiel();
        record.quantite_nominale = None;
        record.quantite_reelle = None;
        let view = CardView::from_materiel(&record, "");
        assert_eq!(view.quantity_label, "- / -");
    }

    #[test]
    fn test_card_view_renders_every_kind() {
        let m = Record::Materiel(materiel());
        let view = CardView::from_record(&m, "fallback.png");
        assert_eq!(view.name, "Lance incendie");
        assert_eq!(view.quantity_label, "5 / 5");

        let gallery = Record::Gallery(crate::record::GalleryItem {
            id: "g-1".to_string(),
            name: "Casque F1".to_string(),
            description: "Casque".to_string(),
            photo_url: String::new(),
            created_at: Utc::now(),
        });
        let view = CardView::from_record(&gallery, "fallback.png");
        assert_eq!(view.name, "Casque F1");
        assert_eq!(view.photo_url, "fallback.png");
        assert!(view.quantity_label.is_empty());
        assert!(!view.highlighted);

        let personnel = Record::Personnel(crate::record::Personnel {
            id: "p-1".to_string(),
            user_id: "u-1".to_string(),
            name: "Martin".to_string(),
            prenom: "Luc".to_string(),
            grade: "Sergent".to_string(),
            affectation: "Noyon".to_string(),
            status: "Actif".to_string(),
            contact_email: String::new(),
            photo_url: String::new(),
            created_at: Utc::now(),
        });
        let view = CardView::from_record(&personnel, "");
        assert_eq!(view.name, "Martin Luc");
        assert_eq!(view.description, "Sergent");
    }
}
