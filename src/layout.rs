use std::path::{Path, PathBuf};

use crate::error::{Result, TfGateError};

pub const TERRAFORM_DIR_ENV: &str = "TFGATE_TERRAFORM_DIR";
pub const TERRAFORM_SUBDIR: &str = "terraform";

/// Path of the Terraform configuration relative to a test working directory.
///
/// The suite lives at `tests/terraform` in the application repository, so the
/// configuration sits two levels up.
pub fn terraform_dir_from(cwd: &Path) -> PathBuf {
    cwd.join("..").join("..").join(TERRAFORM_SUBDIR)
}

/// Resolves the configuration directory for the current process.
///
/// `TFGATE_TERRAFORM_DIR` wins when set to a non-empty value.
pub fn terraform_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(TERRAFORM_DIR_ENV).filter(|d| !d.is_empty()) {
        tracing::debug!(dir = ?dir, "using terraform dir from environment");
        return Ok(PathBuf::from(dir));
    }

    let cwd = std::env::current_dir().map_err(TfGateError::WorkingDir)?;
    Ok(terraform_dir_from(&cwd))
}
