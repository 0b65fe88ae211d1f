use thiserror::Error;

use crate::error::TfGateError;

/// Why a single check failed. Messages are meant to be read in test output.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no {resource_type} resource in plan")]
    ResourceMissing { resource_type: String },

    #[error("expected exactly one {resource_type} resource, found {count}")]
    DuplicateResource { resource_type: String, count: usize },

    #[error("{address}: attribute `{attribute}` is missing or empty")]
    AttributeMissing { address: String, attribute: String },

    #[error("{address}: `{attribute}` is {actual}, expected {expected}")]
    AttributeMismatch {
        address: String,
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("{address}: `{attribute}` is {actual}, allowed: {}", .allowed.join(", "))]
    NotAllowed {
        address: String,
        attribute: String,
        actual: String,
        allowed: Vec<String>,
    },

    #[error("terraform files are not formatted: {}", .files.join(", "))]
    Unformatted { files: Vec<String> },

    #[error("terraform init failed: {0}")]
    InitFailed(String),

    #[error("check aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Terraform(#[from] TfGateError),
}
