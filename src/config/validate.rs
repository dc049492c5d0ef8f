// src/config/validate.rs

use crate::config::model::{ConfigFile, JournalSection, RawConfigFile};
use crate::errors::{Result, UnitJobError};
use crate::job::POLICY_PROPERTIES;
use crate::unit::UnitProperty;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = UnitJobError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_journal(&raw.journal)?;
        let properties = validate_properties(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.manager, raw.journal, properties))
    }
}

fn validate_journal(journal: &JournalSection) -> Result<()> {
    if journal.program.trim().is_empty() {
        return Err(UnitJobError::ConfigError(
            "[journal].program must not be empty".to_string(),
        ));
    }

    if journal.buffer == 0 {
        return Err(UnitJobError::ConfigError(
            "[journal].buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

/// Coerce `[properties]` against the property table. Unknown names surface as
/// `UnsupportedProperty`, exactly as they would at launch time.
fn validate_properties(cfg: &RawConfigFile) -> Result<Vec<UnitProperty>> {
    let mut properties = Vec::with_capacity(cfg.properties.len());

    for (name, raw) in cfg.properties.iter() {
        let property = UnitProperty::from_raw(name, raw.clone())?;
        if POLICY_PROPERTIES.contains(&property.name()) {
            return Err(UnitJobError::ConfigError(format!(
                "[properties].{name} is set per job and cannot be configured"
            )));
        }
        properties.push(property);
    }

    Ok(properties)
}
