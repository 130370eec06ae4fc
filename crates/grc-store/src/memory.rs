// memory.rs: MemoryStore, in-process maps behind a RwLock.
//
// Nothing survives the process. Used by tests and by `grcd --ephemeral`.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use grc_register::{Risk, Treatment, Workshop};

use crate::error::StoreError;
use crate::{EntityStore, Mutation, StoreResult};

#[derive(Default)]
struct Collections {
    risks: BTreeMap<String, Risk>,
    /// Keyed by `(riskId, treatmentId)` so a risk's treatments sort together.
    treatments: BTreeMap<(String, String), Treatment>,
    workshops: BTreeMap<String, Workshop>,
}

/// Volatile store holding every document in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Apply a mutation to a copy and commit it only when asked.
fn modify_entry<T: Clone>(slot: Option<&mut T>, mutate: Mutation<'_, T>) -> Option<T> {
    let slot = slot?;
    let mut draft = slot.clone();
    if mutate(&mut draft) {
        *slot = draft.clone();
        Some(draft)
    } else {
        Some(slot.clone())
    }
}

impl EntityStore for MemoryStore {
    fn get_risk(&self, risk_id: &str) -> StoreResult<Option<Risk>> {
        Ok(self.read()?.risks.get(risk_id).cloned())
    }

    fn list_risks(&self) -> StoreResult<Vec<Risk>> {
        Ok(self.read()?.risks.values().cloned().collect())
    }

    fn insert_risk(&self, risk: &Risk) -> StoreResult<()> {
        let mut guard = self.write()?;
        if guard.risks.contains_key(&risk.risk_id) {
            return Err(StoreError::AlreadyExists {
                collection: "risk",
                key: risk.risk_id.clone(),
            });
        }
        guard.risks.insert(risk.risk_id.clone(), risk.clone());
        Ok(())
    }

    fn modify_risk(&self, risk_id: &str, mutate: Mutation<'_, Risk>) -> StoreResult<Option<Risk>> {
        let mut guard = self.write()?;
        Ok(modify_entry(guard.risks.get_mut(risk_id), mutate))
    }

    fn delete_risk(&self, risk_id: &str) -> StoreResult<bool> {
        Ok(self.write()?.risks.remove(risk_id).is_some())
    }

    fn get_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<Option<Treatment>> {
        let key = (risk_id.to_string(), treatment_id.to_string());
        Ok(self.read()?.treatments.get(&key).cloned())
    }

    fn list_treatments(&self, risk_id: &str) -> StoreResult<Vec<Treatment>> {
        Ok(self
            .read()?
            .treatments
            .iter()
            .filter(|((rid, _), _)| rid == risk_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    fn insert_treatment(&self, treatment: &Treatment) -> StoreResult<()> {
        let key = (treatment.risk_id.clone(), treatment.treatment_id.clone());
        let mut guard = self.write()?;
        if guard.treatments.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                collection: "treatment",
                key: treatment.treatment_id.clone(),
            });
        }
        guard.treatments.insert(key, treatment.clone());
        Ok(())
    }

    fn modify_treatment(
        &self,
        risk_id: &str,
        treatment_id: &str,
        mutate: Mutation<'_, Treatment>,
    ) -> StoreResult<Option<Treatment>> {
        let key = (risk_id.to_string(), treatment_id.to_string());
        let mut guard = self.write()?;
        Ok(modify_entry(guard.treatments.get_mut(&key), mutate))
    }

    fn delete_treatment(&self, risk_id: &str, treatment_id: &str) -> StoreResult<bool> {
        let key = (risk_id.to_string(), treatment_id.to_string());
        Ok(self.write()?.treatments.remove(&key).is_some())
    }

    fn get_workshop(&self, id: &str) -> StoreResult<Option<Workshop>> {
        Ok(self.read()?.workshops.get(id).cloned())
    }

    fn list_workshops(&self) -> StoreResult<Vec<Workshop>> {
        let mut workshops: Vec<Workshop> = self.read()?.workshops.values().cloned().collect();
        workshops.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(workshops)
    }

    fn insert_workshop(&self, workshop: &Workshop) -> StoreResult<()> {
        let mut guard = self.write()?;
        if guard.workshops.contains_key(&workshop.id) {
            return Err(StoreError::AlreadyExists {
                collection: "workshop",
                key: workshop.id.clone(),
            });
        }
        guard.workshops.insert(workshop.id.clone(), workshop.clone());
        Ok(())
    }

    fn modify_workshop(
        &self,
        id: &str,
        mutate: Mutation<'_, Workshop>,
    ) -> StoreResult<Option<Workshop>> {
        let mut guard = self.write()?;
        Ok(modify_entry(guard.workshops.get_mut(id), mutate))
    }

    fn delete_workshop(&self, id: &str) -> StoreResult<bool> {
        Ok(self.write()?.workshops.remove(id).is_some())
    }
}
