pub mod board;
pub mod status;

use tracing::info;

use crate::api::ClinicApi;
use crate::api::models::{PatientRecord, StatusPatch};
use crate::error::Result;
use status::next_status;

pub use board::PatientBoard;
pub use status::{STATUS_ORDER, Status};

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The server accepted the move; this is its copy of the patient.
    Advanced(PatientRecord),
    /// The patient is already at the last stage. Nothing was sent.
    AlreadyFinal,
    /// Another advance for this patient has not come back yet. Nothing was sent.
    Pending,
}

/// Moves `patient` one stage forward through the API.
pub async fn advance<A>(api: &A, bearer: Option<&str>, patient: &PatientRecord) -> Result<Advance>
where
    A: ClinicApi + ?Sized,
{
    let Some(next) = next_status(patient.status.as_ref()) else {
        return Ok(Advance::AlreadyFinal);
    };

    let patch = StatusPatch { status: next };
    let updated = api.update_patient(bearer, patient.id, &patch).await?;
    info!(patient_id = patient.id, status = %patch.status, "advanced patient");

    Ok(Advance::Advanced(updated))
}
