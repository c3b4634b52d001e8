use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use super::{Advance, advance};
use crate::api::ClinicApi;
use crate::api::models::{NewPatient, PatientRecord};
use crate::error::{ClinicError, Result};

/// The dashboard's cached copy of the patient list.
///
/// Entries only change when the server confirms a change; the record the server
/// returns replaces the cached one as is.
#[derive(Debug, Default)]
pub struct PatientBoard {
    patients: Mutex<Vec<PatientRecord>>,
    // Patients with an advance on the wire.
    in_flight: Mutex<HashSet<i64>>,
}

impl PatientBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patients(&self) -> Vec<PatientRecord> {
        self.patients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, patient_id: i64) -> Option<PatientRecord> {
        self.patients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == patient_id)
            .cloned()
    }

    /// Refreshes the cache from the server. On failure the previous list stays.
    pub async fn load<A>(&self, api: &A, bearer: Option<&str>) -> Result<usize>
    where
        A: ClinicApi + ?Sized,
    {
        let fetched = api.list_patients(bearer).await?;
        let count = fetched.len();
        *self.patients.lock().unwrap_or_else(PoisonError::into_inner) = fetched;
        info!(count, "loaded patients");
        Ok(count)
    }

    /// Advances the cached patient `patient_id` one stage.
    pub async fn advance<A>(&self, api: &A, bearer: Option<&str>, patient_id: i64) -> Result<Advance>
    where
        A: ClinicApi + ?Sized,
    {
        let patient = self
            .get(patient_id)
            .ok_or(ClinicError::UnknownPatient(patient_id))?;

        let Some(_claim) = InFlight::claim(&self.in_flight, patient_id) else {
            warn!(patient_id, "advance already in flight, ignoring");
            return Ok(Advance::Pending);
        };

        let outcome = advance(api, bearer, &patient).await?;
        if let Advance::Advanced(updated) = &outcome {
            self.replace(patient_id, updated.clone());
        }

        Ok(outcome)
    }

    /// Registers a new patient and adds the server's record to the board.
    pub async fn admit<A>(
        &self,
        api: &A,
        bearer: Option<&str>,
        patient: &NewPatient,
    ) -> Result<PatientRecord>
    where
        A: ClinicApi + ?Sized,
    {
        let created = api.create_patient(bearer, patient).await?;
        info!(patient_id = created.id, "registered patient");
        self.patients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(created.clone());
        Ok(created)
    }

    fn replace(&self, patient_id: i64, updated: PatientRecord) {
        let mut patients = self.patients.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in patients.iter_mut().filter(|p| p.id == patient_id) {
            *entry = updated.clone();
        }
    }
}

/// Marks a patient as having an advance in flight until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i64>>,
    patient_id: i64,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<i64>>, patient_id: i64) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(patient_id);
        // Built only when inserted: dropping a guard releases the entry.
        inserted.then(|| Self { set, patient_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.patient_id);
    }
}
