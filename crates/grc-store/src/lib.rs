//! # grc-store
//!
//! Persistence for the risk register.
//!
//! [`EntityStore`] is the seam between the rule engine and whatever keeps
//! the documents. Every document is addressed by its natural key: `riskId`,
//! `(riskId, treatmentId)`, or workshop `id` (with the legacy `_id` as a
//! fallback lookup). Each `modify_*` call is one read-modify-write of one
//! document under the store's write guard, which is the only atomicity the
//! engine relies on.
//!
//! Two backends ship with the crate:
//!
//! - [`JsonFileStore`]: one pretty-printed JSON file per document
//! - [`MemoryStore`]: in-process maps, for tests and throwaway runs

pub mod error;
pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};
use grc_register::{AgendaItem, AgendaTopic, Risk, Treatment, Workshop};

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What happened to a guarded agenda append.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The item was appended; carries the workshop as written.
    Appended(Workshop),
    /// No workshop with that id exists any more.
    NotMatched,
    /// The topic already lists the risk; nothing was written.
    Duplicate,
}

/// A mutation applied under the store's write guard.
///
/// Returning `false` leaves the stored document untouched.
pub type Mutation<'a, T> = &'a mut dyn FnMut(&mut T) -> bool;

/// Trait for persisting and retrieving register documents.
///
/// Implementations must make each `modify_*` call atomic with respect to
/// other writers of the same document.
pub trait EntityStore: Send + Sync {
    // ── Risks ────────────────────────────────────────────────────

    fn get_risk(&self, risk_id: &str) -> StoreResult<Option<Risk>>;

    /// All risks, ordered by `riskId`.
    fn list_risks(&self) -> StoreResult<Vec<Risk>>;

    /// Insert a new risk. Fails with `AlreadyExists` on a taken key.
    fn insert_risk(&self, risk: &Risk) -> StoreResult<()>;

    /// Read-modify-write one risk. `None` if it does not exist.
    fn modify_risk(&self, risk_id: &str, mutate: Mutation<'_, Risk>) -> StoreResult<Option<Risk>>;

    fn delete_risk(&self, risk_id: &str) -> StoreResult<bool>;

    // ── Treatments ───────────────────────────────────────────────

    fn get_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<Option<Treatment>>;

    /// Treatments of one risk, ordered by `treatmentId`.
    fn list_treatments(&self, risk_id: &str) -> StoreResult<Vec<Treatment>>;

    fn insert_treatment(&self, treatment: &Treatment) -> StoreResult<()>;

    fn modify_treatment(
        &self,
        risk_id: &str,
        treatment_id: &str,
        mutate: Mutation<'_, Treatment>,
    ) -> StoreResult<Option<Treatment>>;

    fn delete_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<bool>;

    // ── Workshops ────────────────────────────────────────────────

    /// Look up a workshop by its natural id only.
    fn get_workshop(&self, id: &str) -> StoreResult<Option<Workshop>>;

    /// All workshops, ordered by date then id.
    fn list_workshops(&self) -> StoreResult<Vec<Workshop>>;

    fn insert_workshop(&self, workshop: &Workshop) -> StoreResult<()>;

    fn modify_workshop(
        &self,
        id: &str,
        mutate: Mutation<'_, Workshop>,
    ) -> StoreResult<Option<Workshop>>;

    fn delete_workshop(&self, id: &str) -> StoreResult<bool>;

    // ── Provided ─────────────────────────────────────────────────

    /// Resolve a workshop by natural id, falling back to the legacy `_id`.
    fn find_workshop(&self, reference: &str) -> StoreResult<Option<Workshop>> {
        if let Some(ws) = self.get_workshop(reference)? {
            return Ok(Some(ws));
        }
        Ok(self
            .list_workshops()?
            .into_iter()
            .find(|ws| ws.legacy_id.as_deref() == Some(reference)))
    }

    /// Overwrite a stored risk. `false` if it no longer exists.
    fn replace_risk(&self, risk: &Risk) -> StoreResult<bool> {
        let updated = self.modify_risk(&risk.risk_id, &mut |stored: &mut Risk| {
            *stored = risk.clone();
            true
        })?;
        Ok(updated.is_some())
    }

    /// Overwrite a stored treatment. `false` if it no longer exists.
    fn replace_treatment(&self, treatment: &Treatment) -> StoreResult<bool> {
        let updated = self.modify_treatment(
            &treatment.risk_id,
            &treatment.treatment_id,
            &mut |stored: &mut Treatment| {
                *stored = treatment.clone();
                true
            },
        )?;
        Ok(updated.is_some())
    }

    /// Overwrite a stored workshop. `false` if it no longer exists.
    fn replace_workshop(&self, workshop: &Workshop) -> StoreResult<bool> {
        let updated = self.modify_workshop(&workshop.id, &mut |stored: &mut Workshop| {
            *stored = workshop.clone();
            true
        })?;
        Ok(updated.is_some())
    }

    /// Append an agenda item in one guarded write.
    ///
    /// The write is matched on the workshop id and rejected if the topic
    /// already lists the item's risk, so two racing appends of the same
    /// risk cannot both land.
    fn append_agenda_item(
        &self,
        workshop_id: &str,
        topic: AgendaTopic,
        item: &AgendaItem,
        at: DateTime<Utc>,
    ) -> StoreResult<AppendOutcome> {
        let mut duplicate = false;
        let written = self.modify_workshop(workshop_id, &mut |ws: &mut Workshop| {
            if ws.contains_risk(topic, &item.risk_id) {
                duplicate = true;
                return false;
            }
            ws.push_agenda_item(topic, item.clone(), at);
            true
        })?;
        Ok(match written {
            None => AppendOutcome::NotMatched,
            Some(_) if duplicate => AppendOutcome::Duplicate,
            Some(ws) => AppendOutcome::Appended(ws),
        })
    }
}

/// Natural keys double as file names, so they are restricted to a safe
/// alphabet and may not start with a dot.
pub(crate) fn check_key(key: &str) -> StoreResult<()> {
    let safe = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
