use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::campaigns::TestAccount;
use crate::products::InstitutionInfo;
use crate::records::Recipient;
use crate::ConfigError;

/// Contents of a directory seed file (`config/institutions.yaml`).
#[derive(Debug, Deserialize)]
pub struct DirectorySeed {
    pub institutions: Vec<InstitutionInfo>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub test_accounts: Vec<TestAccount>,
}

/// Load and validate a directory seed from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_directory_seed(path: &Path) -> Result<DirectorySeed, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let seed: DirectorySeed =
        serde_yaml::from_str(&content).map_err(ConfigError::SeedFileParse)?;

    validate_seed(&seed)?;

    Ok(seed)
}

/// An institution code is a run of ASCII letters; SKUs can only ever
/// yield codes of that shape.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphabetic())
}

fn validate_seed(seed: &DirectorySeed) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_codes = HashSet::new();

    for info in &seed.institutions {
        if info.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "institution '{}' has an empty name",
                info.code
            )));
        }

        if !is_valid_code(&info.code) {
            return Err(ConfigError::Validation(format!(
                "institution '{}' has invalid code '{}'; codes are ASCII letters only",
                info.name, info.code
            )));
        }

        if !seen_names.insert(info.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate institution name: '{}'",
                info.name
            )));
        }

        if !seen_codes.insert(info.code.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate institution code: '{}' (from '{}')",
                info.code, info.name
            )));
        }
    }

    for recipient in &seed.recipients {
        if !recipient.email.contains('@') {
            return Err(ConfigError::Validation(format!(
                "recipient '{}' is not an email address",
                recipient.email
            )));
        }
    }

    Ok(())
}
