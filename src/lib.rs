//! tfgate - Terraform configuration checks
//!
//! Drives the Terraform CLI against an App Service configuration and asserts
//! on the resulting plan.

pub mod checks;
pub mod layout;
pub mod report;
pub mod terraform;

mod error;

pub use checks::{Case, CheckError, CheckOutcome};
pub use error::{Result, TfGateError};
pub use terraform::{Options, PlanStruct, Terraform};
