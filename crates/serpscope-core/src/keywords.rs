//! Keyword onboarding configuration.
//!
//! Tracked keywords are declared in a YAML file and seeded into the database
//! by the CLI. Deactivation happens through the `active` flag; keywords are
//! never removed from the database once history references them.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// The search term, unique per marketplace.
    pub text: String,
    #[serde(default = "default_marketplace")]
    pub marketplace: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_marketplace() -> String {
    "US".to_owned()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct KeywordsFile {
    pub keywords: Vec<KeywordConfig>,
}

/// Load and validate the keywords configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation (empty keyword text, or a duplicate (keyword, marketplace)
/// pair, compared case-insensitively).
pub fn load_keywords(path: &Path) -> Result<KeywordsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::KeywordsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let keywords_file: KeywordsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::KeywordsFileParse)?;

    validate_keywords(&keywords_file)?;

    Ok(keywords_file)
}

fn validate_keywords(keywords_file: &KeywordsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in &keywords_file.keywords {
        if entry.text.trim().is_empty() {
            return Err(ConfigError::Validation(
                "keyword text must be non-empty".to_owned(),
            ));
        }

        let key = (entry.text.to_lowercase(), entry.marketplace.to_uppercase());
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "duplicate keyword '{}' for marketplace '{}'",
                entry.text, entry.marketplace
            )));
        }
    }

    Ok(())
}
