// src/unit/name.rs

use crate::errors::{Result, UnitJobError};

/// Suffix appended to every job name to form its unit name.
pub const SERVICE_SUFFIX: &str = ".service";

/// Derive the unit name for a job.
///
/// Only the checks the manager cannot report usefully are done here (empty
/// names, path separators, NUL). Anything else systemd dislikes comes back
/// from the manager as a `JobCreation` error.
pub fn unit_name_for(job_name: &str) -> Result<String> {
    if job_name.is_empty() {
        return Err(UnitJobError::InvalidJob(
            "job name must not be empty".to_string(),
        ));
    }
    if job_name.contains('/') {
        return Err(UnitJobError::InvalidJob(format!(
            "job name '{job_name}' must not contain '/'"
        )));
    }
    if job_name.contains('\0') {
        return Err(UnitJobError::InvalidJob(
            "job name must not contain NUL".to_string(),
        ));
    }

    Ok(format!("{job_name}{SERVICE_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_service_suffix() {
        assert_eq!(unit_name_for("test-23").unwrap(), "test-23.service");
    }

    #[test]
    fn suffix_is_appended_even_if_already_present() {
        assert_eq!(unit_name_for("a.service").unwrap(), "a.service.service");
    }

    #[test]
    fn rejects_empty_and_path_like_names() {
        assert!(matches!(unit_name_for(""), Err(UnitJobError::InvalidJob(_))));
        assert!(matches!(unit_name_for("a/b"), Err(UnitJobError::InvalidJob(_))));
        assert!(matches!(unit_name_for("a\0b"), Err(UnitJobError::InvalidJob(_))));
    }
}
