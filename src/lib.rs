//! Client core for the AfyaAccess clinic workflow API: the signed-in session,
//! the route guard, and the patient status workflow.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod workflow;

pub use error::{ClinicError, Result};
