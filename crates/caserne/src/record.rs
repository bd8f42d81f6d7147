//! Core record types for the resource registry.
//!
//! This module defines the four record kinds held by the record store and
//! the partial-update shapes used to mutate them. Records are carried as an
//! explicit tagged union (`Record`) so a card or view never has to guess a
//! record's kind from which optional fields happen to be present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque record identity, assigned by the record store at creation.
pub type RecordId = String;

/// The kind of a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A read-only gallery item.
    Gallery,
    /// An equipment record with quantity tracking.
    Materiel,
    /// A vehicle that may own zero or more materiels.
    Engin,
    /// A personnel record.
    Personnel,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gallery => write!(f, "gallery"),
            Self::Materiel => write!(f, "materiel"),
            Self::Engin => write!(f, "engin"),
            Self::Personnel => write!(f, "personnel"),
        }
    }
}

/// A read-only gallery item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference.
    pub photo_url: String,
    /// Creation timestamp, stamped by the store.
    pub created_at: DateTime<Utc>,
}

/// An equipment record.
///
/// Carries two independent counts: the nominal (expected) quantity and the
/// real (observed) quantity. Neither is derived from the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Materiel {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Identity of the user who created the record.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference.
    pub photo_url: String,
    /// Optional document reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Optional media reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Expected count. `None` when never set.
    pub quantite_nominale: Option<u32>,
    /// Observed count. `None` when never set.
    pub quantite_reelle: Option<u32>,
    /// Free-text storage location.
    pub emplacement: String,
    /// Free-text state.
    pub etat: String,
    /// Owning vehicle, if any.
    pub engin_id: Option<RecordId>,
    /// Display name of the owning vehicle, joined at read time.
    /// Derived field, never persisted back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engin_name: Option<String>,
    /// Assignment label.
    pub affectation: Option<String>,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Inspection-completed flag.
    pub is_controlled: bool,
    /// Creation timestamp, stamped by the store.
    pub created_at: DateTime<Utc>,
}

impl Materiel {
    /// Whether the observed count has fallen below the expected count.
    ///
    /// Derived display condition: true only when both quantities are defined
    /// and real < nominal. Never stored.
    #[must_use]
    pub fn is_below_nominal(&self) -> bool {
        matches!(
            (self.quantite_reelle, self.quantite_nominale),
            (Some(real), Some(nominal)) if real < nominal
        )
    }

    /// Whether the record carries a non-blank comment.
    #[must_use]
    pub fn has_comment(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

/// A vehicle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engin {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Identity of the user who created the record.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference.
    pub photo_url: String,
    /// Assignment label of the owning station.
    pub cs_affectation: String,
    /// Creation timestamp, stamped by the store.
    pub created_at: DateTime<Utc>,
}

/// A personnel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    /// Store-assigned identity.
    pub id: RecordId,
    /// Identity of the user this profile belongs to.
    pub user_id: String,
    /// Family name.
    pub name: String,
    /// First name.
    pub prenom: String,
    /// Rank.
    pub grade: String,
    /// Assignment label.
    pub affectation: String,
    /// Free-text status.
    pub status: String,
    /// Contact email.
    pub contact_email: String,
    /// Image reference.
    pub photo_url: String,
    /// Creation timestamp, stamped by the store.
    pub created_at: DateTime<Utc>,
}

/// A registry record of any kind.
///
/// The discriminant is explicit and travels with the record from the store
/// boundary inward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// A gallery item.
    Gallery(GalleryItem),
    /// An equipment record.
    Materiel(Materiel),
    /// A vehicle record.
    Engin(Engin),
    /// A personnel record.
    Personnel(Personnel),
}

impl Record {
    /// The record's kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Gallery(_) => RecordKind::Gallery,
            Self::Materiel(_) => RecordKind::Materiel,
            Self::Engin(_) => RecordKind::Engin,
            Self::Personnel(_) => RecordKind::Personnel,
        }
    }

    /// The record's store-assigned identity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Gallery(item) => &item.id,
            Self::Materiel(materiel) => &materiel.id,
            Self::Engin(engin) => &engin.id,
            Self::Personnel(personnel) => &personnel.id,
        }
    }

    /// The record's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Gallery(item) => &item.name,
            Self::Materiel(materiel) => &materiel.name,
            Self::Engin(engin) => &engin.name,
            Self::Personnel(personnel) => &personnel.name,
        }
    }

    /// Borrow the inner materiel, if this record is one.
    #[must_use]
    pub fn as_materiel(&self) -> Option<&Materiel> {
        match self {
            Self::Materiel(materiel) => Some(materiel),
            _ => None,
        }
    }

    /// Mutably borrow the inner materiel, if this record is one.
    pub fn as_materiel_mut(&mut self) -> Option<&mut Materiel> {
        match self {
            Self::Materiel(materiel) => Some(materiel),
            _ => None,
        }
    }
}

/// A field-scoped partial update for a materiel.
///
/// `None` means "not part of this update": the store must leave the column
/// untouched. The comment/quantity pair and the controlled flag travel in
/// separate patches so one write path never clobbers the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterielPatch {
    /// New comment text, when included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// New observed count, when included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantite_reelle: Option<u32>,
    /// New inspection flag, when included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_controlled: Option<bool>,
}

impl MaterielPatch {
    /// Whether the patch carries no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.quantite_reelle.is_none() && self.is_controlled.is_none()
    }

    /// Apply the included fields onto a materiel, leaving the rest alone.
    pub fn apply_to(&self, materiel: &mut Materiel) {
        if let Some(comment) = &self.comment {
            materiel.comment = Some(comment.clone());
        }
        if let Some(quantity) = self.quantite_reelle {
            materiel.quantite_reelle = Some(quantity);
        }
        if let Some(controlled) = self.is_controlled {
            materiel.is_controlled = controlled;
        }
    }
}

/// Reconciliation payload handed from a card to its owning view after a
/// successful write, so the view can patch its in-memory collection without
/// a refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPatch {
    /// Identity of the updated record.
    pub id: RecordId,
    /// The fields that were persisted.
    pub fields: MaterielPatch,
}

/// Insert payload for a materiel. The store stamps `user_id`, `created_at`
/// and the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMateriel {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference.
    pub photo_url: String,
    /// Optional document reference.
    pub doc: Option<String>,
    /// Optional media reference.
    pub media: Option<String>,
    /// Initial count, used for both the nominal and real quantities.
    pub quantite: Option<u32>,
    /// Free-text storage location.
    pub emplacement: String,
    /// Free-text state.
    pub etat: String,
    /// Owning vehicle, if any.
    pub engin_id: Option<RecordId>,
    /// Assignment label.
    pub affectation: Option<String>,
}

/// Insert payload for an engin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEngin {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Image reference.
    pub photo_url: String,
    /// Assignment label of the owning station.
    pub cs_affectation: String,
}

/// Insert payload for a personnel record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPersonnel {
    /// Family name.
    pub name: String,
    /// First name.
    pub prenom: String,
    /// Rank.
    pub grade: String,
    /// Assignment label.
    pub affectation: String,
    /// Free-text status.
    pub status: String,
    /// Contact email.
    pub contact_email: String,
    /// Image reference.
    pub photo_url: String,
}

/// Update payload for the acting user's own personnel profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonnelProfile {
    /// Family name.
    pub name: String,
    /// First name.
    pub prenom: String,
    /// Rank.
    pub grade: String,
    /// Assignment label.
    pub affectation: String,
    /// Free-text status.
    pub status: String,
    /// Contact email.
    pub contact_email: String,
    /// Image reference.
    pub photo_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materiel(real: Option<u32>, nominal: Option<u32>) -> Materiel {
        Materiel {
            id: "m-1".to_string(),
            user_id: "u-1".to_string(),
            name: "Lance incendie".to_string(),
            description: "Lance 45mm".to_string(),
            photo_url: String::new(),
            doc: None,
            media: None,
            quantite_nominale: nominal,
            quantite_reelle: real,
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

    #[test]
    fn test_below_nominal_requires_both_quantities() {
        assert!(!materiel(None, None).is_below_nominal());
        assert!(!materiel(Some(3), None).is_below_nominal());
        assert!(!materiel(None, Some(3)).is_below_nominal());
    }

    #[test]
    fn test_below_nominal_strict_ordering() {
        assert!(materiel(Some(2), Some(5)).is_below_nominal());
        assert!(!materiel(Some(5), Some(5)).is_below_nominal());
        assert!(!materiel(Some(7), Some(5)).is_below_nominal());
    }

    #[test]
    fn test_has_comment_ignores_blank() {
        let mut m = materiel(None, None);
        assert!(!m.has_comment());

        m.comment = Some("   ".to_string());
        assert!(!m.has_comment());

        m.comment = Some("manque un embout".to_string());
        assert!(m.has_comment());
    }

    #[test]
    fn test_record_kind_display() {
        assert_eq!(RecordKind::Gallery.to_string(), "gallery");
        assert_eq!(RecordKind::Materiel.to_string(), "materiel");
        assert_eq!(RecordKind::Engin.to_string(), "engin");
        assert_eq!(RecordKind::Personnel.to_string(), "personnel");
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::Materiel(materiel(Some(1), Some(2)));
        assert_eq!(record.kind(), RecordKind::Materiel);
        assert_eq!(record.id(), "m-1");
        assert_eq!(record.name(), "Lance incendie");
        assert!(record.as_materiel().is_some());

        let engin = Record::Engin(Engin {
            id: "e-1".to_string(),
            user_id: "u-1".to_string(),
            name: "FPT 1".to_string(),
            description: String::new(),
            photo_url: String::new(),
            cs_affectation: "Noyon".to_string(),
            created_at: Utc::now(),
        });
        assert_eq!(engin.kind(), RecordKind::Engin);
        assert!(engin.as_materiel().is_none());
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = Record::Materiel(materiel(Some(1), Some(2)));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"materiel""#));

        let roundtrip: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, record);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(MaterielPatch::default().is_empty());

        let patch = MaterielPatch {
            comment: Some(String::new()),
            ..MaterielPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_apply_to_leaves_omitted_fields() {
        let mut m = materiel(Some(4), Some(10));
        m.comment = Some("usé".to_string());

        let patch = MaterielPatch {
            quantite_reelle: Some(9),
            ..MaterielPatch::default()
        };
        patch.apply_to(&mut m);

        assert_eq!(m.quantite_reelle, Some(9));
        assert_eq!(m.comment.as_deref(), Some("usé"));
        assert!(!m.is_controlled);
    }

    #[test]
    fn test_patch_serializes_only_included_fields() {
        let patch = MaterielPatch {
            comment: Some(String::new()),
            quantite_reelle: Some(5),
            is_controlled: None,
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"comment":"","quantite_reelle":5}"#);
    }
}
